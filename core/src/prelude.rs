use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use num_complex::Complex32;

use crate::processing::buffer::RetentionPolicy;

pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 2.048e6;
pub const DEFAULT_CENTER_FREQ_HZ: f64 = 433.92e6;
pub const DEFAULT_GAIN_DB: f64 = 20.0;
pub const DEFAULT_WINDOW_SIZE_S: f64 = 10.0;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_BATCH_SIZE: usize = 16 * 1024;
pub const DEFAULT_EPSILON: f64 = 1e-12;

/// Tuner gain: either the dongle's AGC or a fixed value in dB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GainRepr", into = "GainRepr")]
pub enum Gain {
    Auto,
    Db(f64),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum GainRepr {
    Db(f64),
    Mode(String),
}

impl TryFrom<GainRepr> for Gain {
    type Error = MonitorError;

    fn try_from(value: GainRepr) -> Result<Self, Self::Error> {
        match value {
            GainRepr::Db(db) => Ok(Gain::Db(db)),
            GainRepr::Mode(mode) => mode.parse(),
        }
    }
}

impl From<Gain> for GainRepr {
    fn from(value: Gain) -> Self {
        match value {
            Gain::Auto => GainRepr::Mode("auto".into()),
            Gain::Db(db) => GainRepr::Db(db),
        }
    }
}

impl FromStr for Gain {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Gain::Auto);
        }
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|db| db.is_finite())
            .map(Gain::Db)
            .ok_or_else(|| MonitorError::InvalidConfig(format!("unrecognised gain '{s}'")))
    }
}

impl fmt::Display for Gain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gain::Auto => write!(f, "auto"),
            Gain::Db(db) => write!(f, "{db} dB"),
        }
    }
}

/// Tuning parameters handed to the sample source when acquisition starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub sample_rate_hz: f64,
    pub center_freq_hz: f64,
    pub gain: Gain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq_correction_ppm: Option<i32>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            center_freq_hz: DEFAULT_CENTER_FREQ_HZ,
            gain: Gain::Db(DEFAULT_GAIN_DB),
            freq_correction_ppm: None,
        }
    }
}

/// Everything the acquisition loop needs to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    pub device: DeviceConfig,
    pub batch_size: usize,
    pub tick_interval: Duration,
    pub read_timeout: Duration,
    pub window_size: f64,
    pub retention: RetentionPolicy,
    pub epsilon: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            tick_interval: DEFAULT_TICK_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
            window_size: DEFAULT_WINDOW_SIZE_S,
            retention: RetentionPolicy::default(),
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> MonitorResult<()> {
        if !(self.device.sample_rate_hz.is_finite() && self.device.sample_rate_hz > 0.0) {
            return Err(MonitorError::InvalidConfig(
                "sample rate must be a positive number of Hz".into(),
            ));
        }
        if !self.batch_size.is_power_of_two() {
            return Err(MonitorError::InvalidConfig(format!(
                "batch size {} is not a power of two",
                self.batch_size
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "tick interval must be non-zero".into(),
            ));
        }
        if self.read_timeout.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "read timeout must be non-zero".into(),
            ));
        }
        if !(self.window_size.is_finite() && self.window_size > 0.0) {
            return Err(MonitorError::InvalidConfig(
                "window size must be a positive number of seconds".into(),
            ));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(MonitorError::InvalidConfig(
                "epsilon must be positive".into(),
            ));
        }
        self.retention.validate()
    }
}

/// One power estimate, stamped with seconds since acquisition started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerReading {
    pub elapsed_time: f64,
    pub power_db: f64,
}

impl PowerReading {
    pub fn new(elapsed_time: f64, power_db: f64) -> Self {
        Self {
            elapsed_time,
            power_db,
        }
    }
}

/// Time axis bounds the renderer should show.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibleRange {
    pub lo: f64,
    pub hi: f64,
}

impl VisibleRange {
    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    pub fn contains(&self, elapsed_time: f64) -> bool {
        elapsed_time >= self.lo && elapsed_time <= self.hi
    }
}

/// Payload published to the renderer once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibleFrame {
    pub points: Vec<PowerReading>,
    pub x_range: VisibleRange,
}

/// Device call that failed, reported alongside device errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOperation {
    Configure,
    Read,
}

impl fmt::Display for DeviceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceOperation::Configure => "configure",
            DeviceOperation::Read => "read_samples",
        };
        f.write_str(name)
    }
}

/// Common error type for the acquisition pipeline.
#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("out-of-order insertion: {attempted:.6}s is not after newest reading at {newest:.6}s")]
    OutOfOrderInsertion { newest: f64, attempted: f64 },
    #[error("device error during {operation}: {reason}")]
    Device {
        operation: DeviceOperation,
        reason: String,
    },
    #[error("render publish failed: {0}")]
    RenderPublish(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot {action} while acquisition is {state}")]
    InvalidState {
        action: &'static str,
        state: crate::processing::acquisition::LoopState,
    },
}

impl MonitorError {
    pub fn device(operation: DeviceOperation, reason: impl Into<String>) -> Self {
        MonitorError::Device {
            operation,
            reason: reason.into(),
        }
    }

    pub fn is_device_error(&self) -> bool {
        matches!(self, MonitorError::Device { .. })
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
