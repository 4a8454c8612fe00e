//! Acquisition core for the SDR power monitor.
//!
//! Drains IQ batches from a sample source at a fixed cadence, reduces each
//! batch to a power figure in dB, and keeps a bounded, time-ordered history
//! that renderers consume as a sliding window.

pub mod math;
pub mod prelude;
pub mod processing;
pub mod sdr_interface;
pub mod telemetry;

pub use prelude::{
    DeviceConfig, Gain, LoopConfig, MonitorError, MonitorResult, PowerReading, VisibleFrame,
    VisibleRange,
};
pub use processing::{AcquisitionLoop, LoopState, PowerEstimator, TimeSeriesBuffer};
pub use sdr_interface::{Renderer, SampleSource};
