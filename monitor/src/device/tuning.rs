#![cfg_attr(not(feature = "rtlsdr"), allow(dead_code))]

use powercore::prelude::{DeviceConfig, DeviceOperation, Gain, MonitorError};
use std::fmt::Display;

/// Values programmed into the tuner for one `DeviceConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunerSettings {
    pub frequency_hz: f64,
    pub sample_rate_hz: f64,
    pub agc: bool,
    pub gain_db: Option<f64>,
}

impl TunerSettings {
    /// The crystal error in `freq_correction_ppm` scales every synthesized
    /// frequency, so the requested values are divided by `1 + ppm * 1e-6`.
    pub fn from_config(config: &DeviceConfig) -> Self {
        let correction = 1.0 + f64::from(config.freq_correction_ppm.unwrap_or(0)) * 1e-6;
        let (agc, gain_db) = match config.gain {
            Gain::Auto => (true, None),
            Gain::Db(db) => (false, Some(db)),
        };
        Self {
            frequency_hz: config.center_freq_hz / correction,
            sample_rate_hz: config.sample_rate_hz / correction,
            agc,
            gain_db,
        }
    }
}

pub fn driver_args(index: usize) -> String {
    format!("driver=rtlsdr,index={index}")
}

pub fn driver_error(operation: DeviceOperation, err: impl Display) -> MonitorError {
    MonitorError::device(operation, format!("rtlsdr: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_gain_disables_agc() {
        let settings = TunerSettings::from_config(&DeviceConfig::default());
        assert!(!settings.agc);
        assert_eq!(settings.gain_db, Some(20.0));
        assert_eq!(settings.frequency_hz, 433.92e6);
        assert_eq!(settings.sample_rate_hz, 2.048e6);
    }

    #[test]
    fn auto_gain_enables_agc() {
        let settings = TunerSettings::from_config(&DeviceConfig {
            gain: Gain::Auto,
            ..Default::default()
        });
        assert!(settings.agc);
        assert_eq!(settings.gain_db, None);
    }

    #[test]
    fn ppm_correction_pulls_the_tuned_frequency() {
        let settings = TunerSettings::from_config(&DeviceConfig {
            center_freq_hz: 70e6,
            freq_correction_ppm: Some(60),
            ..Default::default()
        });
        // a crystal running 60 ppm fast needs a 4.2 kHz lower request at 70 MHz
        assert!((70e6 - settings.frequency_hz - 4199.75).abs() < 0.5);
        assert!(settings.sample_rate_hz < 2.048e6);
    }

    #[test]
    fn driver_failures_name_the_operation() {
        let err = driver_error(DeviceOperation::Read, "usb transfer timed out");
        assert!(err.is_device_error());
        assert_eq!(
            err.to_string(),
            "device error during read_samples: rtlsdr: usb transfer timed out"
        );
        assert_eq!(driver_args(1), "driver=rtlsdr,index=1");
    }
}
