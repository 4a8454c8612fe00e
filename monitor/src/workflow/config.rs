use crate::device::DeviceKind;
use crate::generator::SignalConfig;
use anyhow::Context;
use powercore::prelude::{
    DeviceConfig, Gain, LoopConfig, DEFAULT_BATCH_SIZE, DEFAULT_CENTER_FREQ_HZ, DEFAULT_EPSILON,
    DEFAULT_GAIN_DB, DEFAULT_SAMPLE_RATE_HZ, DEFAULT_WINDOW_SIZE_S,
};
use powercore::processing::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// File-level configuration; every field is optional in YAML.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub device: DeviceKind,
    pub device_index: usize,
    pub center_freq_hz: f64,
    pub sample_rate_hz: f64,
    pub gain: Gain,
    pub freq_correction_ppm: Option<i32>,
    pub window_size_s: f64,
    pub tick_interval_ms: u64,
    pub read_timeout_ms: u64,
    pub batch_size: usize,
    pub retention: RetentionPolicy,
    pub epsilon: f64,
    pub signal: SignalConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device: DeviceKind::Synthetic,
            device_index: 0,
            center_freq_hz: DEFAULT_CENTER_FREQ_HZ,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            gain: Gain::Db(DEFAULT_GAIN_DB),
            freq_correction_ppm: None,
            window_size_s: DEFAULT_WINDOW_SIZE_S,
            tick_interval_ms: 50,
            read_timeout_ms: 1000,
            batch_size: DEFAULT_BATCH_SIZE,
            retention: RetentionPolicy::default(),
            epsilon: DEFAULT_EPSILON,
            signal: SignalConfig::default(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub device: Option<DeviceKind>,
    pub device_index: Option<usize>,
    pub center_freq_hz: Option<f64>,
    pub sample_rate_hz: Option<f64>,
    pub gain: Option<Gain>,
    pub freq_correction_ppm: Option<i32>,
    pub window_size_s: Option<f64>,
    pub tick_interval_ms: Option<u64>,
    pub batch_size: Option<usize>,
    pub seed: Option<u64>,
    pub fail_after_reads: Option<usize>,
}

impl MonitorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading monitor config {}", path_ref.display()))?;
        let config: MonitorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing monitor config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(value) = overrides.device {
            self.device = value;
        }
        if let Some(value) = overrides.device_index {
            self.device_index = value;
        }
        if let Some(value) = overrides.center_freq_hz {
            self.center_freq_hz = value;
        }
        if let Some(value) = overrides.sample_rate_hz {
            self.sample_rate_hz = value;
        }
        if let Some(value) = overrides.gain {
            self.gain = value;
        }
        if overrides.freq_correction_ppm.is_some() {
            self.freq_correction_ppm = overrides.freq_correction_ppm;
        }
        if let Some(value) = overrides.window_size_s {
            self.window_size_s = value;
        }
        if let Some(value) = overrides.tick_interval_ms {
            self.tick_interval_ms = value;
        }
        if let Some(value) = overrides.batch_size {
            self.batch_size = value;
        }
        if let Some(value) = overrides.seed {
            self.signal.seed = value;
        }
        if overrides.fail_after_reads.is_some() {
            self.signal.fail_after_reads = overrides.fail_after_reads;
        }
    }

    pub fn to_loop_config(&self) -> anyhow::Result<LoopConfig> {
        let config = LoopConfig {
            device: DeviceConfig {
                sample_rate_hz: self.sample_rate_hz,
                center_freq_hz: self.center_freq_hz,
                gain: self.gain,
                freq_correction_ppm: self.freq_correction_ppm,
            },
            batch_size: self.batch_size,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            window_size: self.window_size_s,
            retention: self.retention,
            epsilon: self.epsilon,
        };
        config.validate().context("validating monitor config")?;
        Ok(config)
    }
}
