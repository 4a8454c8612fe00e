#[cfg(test)]
use std::collections::VecDeque;

use crate::prelude::{Complex32, DeviceConfig, DeviceOperation, MonitorError, MonitorResult};
use crate::telemetry::log::LogManager;

/// Front end that yields IQ samples on demand.
///
/// `read_samples` may block; `close` must tolerate repeated calls.
pub trait SampleSource {
    fn configure(&mut self, config: &DeviceConfig) -> MonitorResult<()>;
    fn read_samples(&mut self, count: usize) -> MonitorResult<Vec<Complex32>>;
    fn close(&mut self);
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn configure(&mut self, config: &DeviceConfig) -> MonitorResult<()> {
        (**self).configure(config)
    }

    fn read_samples(&mut self, count: usize) -> MonitorResult<Vec<Complex32>> {
        (**self).read_samples(count)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Owns a sample source and closes it exactly once, either through
/// [`DeviceHandle::release`] or when dropped.
pub struct DeviceHandle<S: SampleSource> {
    source: S,
    released: bool,
    logger: LogManager,
}

impl<S: SampleSource> DeviceHandle<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            released: false,
            logger: LogManager::new("device"),
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn configure(&mut self, config: &DeviceConfig) -> MonitorResult<()> {
        self.ensure_open(DeviceOperation::Configure)?;
        self.source.configure(config)
    }

    pub fn read(&mut self, count: usize) -> MonitorResult<Vec<Complex32>> {
        self.ensure_open(DeviceOperation::Read)?;
        self.source.read_samples(count)
    }

    /// Closes the underlying source; later calls are no-ops.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.source.close();
        self.logger.record("device handle released");
    }

    fn ensure_open(&self, operation: DeviceOperation) -> MonitorResult<()> {
        if self.released {
            Err(MonitorError::device(operation, "device handle already released"))
        } else {
            Ok(())
        }
    }
}

impl<S: SampleSource> Drop for DeviceHandle<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Plays back pre-recorded batches, then reports a disconnect.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ReplaySource {
    batches: VecDeque<Vec<Complex32>>,
    configured: Option<DeviceConfig>,
    reads: usize,
    close_calls: usize,
}

#[cfg(test)]
impl ReplaySource {
    pub fn new(batches: impl IntoIterator<Item = Vec<Complex32>>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn configured(&self) -> Option<&DeviceConfig> {
        self.configured.as_ref()
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls
    }

    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

#[cfg(test)]
impl SampleSource for ReplaySource {
    fn configure(&mut self, config: &DeviceConfig) -> MonitorResult<()> {
        self.configured = Some(config.clone());
        Ok(())
    }

    fn read_samples(&mut self, count: usize) -> MonitorResult<Vec<Complex32>> {
        self.reads += 1;
        let mut batch = self
            .batches
            .pop_front()
            .ok_or_else(|| MonitorError::device(DeviceOperation::Read, "recording exhausted"))?;
        batch.truncate(count);
        Ok(batch)
    }

    fn close(&mut self) {
        self.close_calls += 1;
    }
}
