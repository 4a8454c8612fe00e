use std::sync::Mutex;

/// Counters collected by the acquisition loop.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

/// Point-in-time copy of the recorded counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub ticks: usize,
    pub eviction_batches: usize,
    pub evicted_readings: usize,
    pub render_errors: usize,
    pub faults: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_tick(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.ticks += 1;
        }
    }

    pub fn record_eviction(&self, evicted: usize) {
        if evicted == 0 {
            return;
        }
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.eviction_batches += 1;
            metrics.evicted_readings += evicted;
        }
    }

    pub fn record_render_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.render_errors += 1;
        }
    }

    pub fn record_fault(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.faults += 1;
        }
    }

    pub fn snapshot(&self) -> Metrics {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_evictions_are_not_counted() {
        let recorder = MetricsRecorder::new();
        recorder.record_eviction(0);
        recorder.record_eviction(501);
        recorder.record_tick();
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.eviction_batches, 1);
        assert_eq!(snapshot.evicted_readings, 501);
        assert_eq!(snapshot.ticks, 1);
        assert_eq!(snapshot.faults, 0);
    }
}
