//! Sample sources the monitor can acquire from.

#[cfg(feature = "rtlsdr")]
pub mod rtlsdr;
pub mod tuning;

use crate::generator::SyntheticSource;
use crate::workflow::config::MonitorConfig;
use clap::ValueEnum;
use powercore::SampleSource;
use serde::{Deserialize, Serialize};

pub type BoxedSource = Box<dyn SampleSource + Send>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Seeded signal generator, no hardware needed
    #[default]
    Synthetic,
    /// RTL2832U dongle (build with `--features rtlsdr`)
    Rtlsdr,
}

pub fn open_source(config: &MonitorConfig) -> anyhow::Result<BoxedSource> {
    match config.device {
        DeviceKind::Synthetic => Ok(Box::new(SyntheticSource::new(config.signal.clone()))),
        DeviceKind::Rtlsdr => open_rtlsdr(config),
    }
}

#[cfg(feature = "rtlsdr")]
fn open_rtlsdr(config: &MonitorConfig) -> anyhow::Result<BoxedSource> {
    use anyhow::Context;
    use std::time::Duration;

    let source = rtlsdr::RtlSdrSource::open(
        config.device_index,
        Duration::from_millis(config.read_timeout_ms),
    )
    .with_context(|| format!("opening RTL-SDR #{}", config.device_index))?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "rtlsdr"))]
fn open_rtlsdr(_config: &MonitorConfig) -> anyhow::Result<BoxedSource> {
    anyhow::bail!("this build has no RTL-SDR support; rebuild the monitor with `--features rtlsdr`")
}
