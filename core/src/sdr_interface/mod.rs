pub mod render;
pub mod source;
pub mod watchdog;

pub use render::{NullRenderer, Renderer};
#[cfg(test)]
pub use source::ReplaySource;
pub use source::{DeviceHandle, SampleSource};
pub use watchdog::WatchdogSource;
