use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::prelude::{
    Complex32, DeviceOperation, LoopConfig, MonitorError, MonitorResult, PowerReading,
};
use crate::processing::buffer::TimeSeriesBuffer;
use crate::processing::estimator::PowerEstimator;
use crate::sdr_interface::{DeviceHandle, Renderer, SampleSource};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{Metrics, MetricsRecorder};

/// Time source for elapsed timestamps and read-timeout checks.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
    Stopped,
    Faulted,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Idle => "idle",
            LoopState::Running => "running",
            LoopState::Stopping => "stopping",
            LoopState::Stopped => "stopped",
            LoopState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Published { reading: PowerReading, evicted: usize },
    Stopped,
}

/// Cloneable stop request, observed by the loop at its next tick.
#[derive(Debug, Clone)]
pub struct StopHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Single-owner acquisition pipeline: read, estimate, append, publish.
///
/// The loop does not schedule itself; call [`AcquisitionLoop::tick`] at the
/// configured cadence (see [`crate::processing::scheduler::drive`]).
pub struct AcquisitionLoop<S: SampleSource, R: Renderer, C: Clock = SystemClock> {
    config: LoopConfig,
    device: DeviceHandle<S>,
    renderer: R,
    estimator: PowerEstimator,
    buffer: TimeSeriesBuffer,
    clock: C,
    state: LoopState,
    started_at: Option<Instant>,
    stop_sender: Arc<watch::Sender<bool>>,
    stop_receiver: watch::Receiver<bool>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl<S: SampleSource, R: Renderer> AcquisitionLoop<S, R, SystemClock> {
    pub fn new(source: S, renderer: R, config: LoopConfig) -> MonitorResult<Self> {
        Self::with_clock(source, renderer, config, SystemClock)
    }
}

impl<S: SampleSource, R: Renderer, C: Clock> AcquisitionLoop<S, R, C> {
    pub fn with_clock(source: S, renderer: R, config: LoopConfig, clock: C) -> MonitorResult<Self> {
        // owning the source first means a rejected config still closes it
        let device = DeviceHandle::new(source);
        config.validate()?;
        let estimator = PowerEstimator::new(config.epsilon)?;
        let buffer = TimeSeriesBuffer::new(config.window_size, config.retention)?;
        let (stop_sender, stop_receiver) = watch::channel(false);

        Ok(Self {
            config,
            device,
            renderer,
            estimator,
            buffer,
            clock,
            state: LoopState::Idle,
            started_at: None,
            stop_sender: Arc::new(stop_sender),
            stop_receiver,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("acquisition"),
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn window_size(&self) -> f64 {
        self.config.window_size
    }

    pub fn buffer(&self) -> &TimeSeriesBuffer {
        &self.buffer
    }

    pub fn source(&self) -> &S {
        self.device.get_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            sender: self.stop_sender.clone(),
        }
    }

    /// Configures the device and starts the elapsed-time clock.
    pub fn start(&mut self) -> MonitorResult<()> {
        if self.state != LoopState::Idle {
            return Err(MonitorError::InvalidState {
                action: "start",
                state: self.state,
            });
        }
        let device = &self.config.device;
        self.logger.record(&format!(
            "configuring device: {:.3} MHz, {:.3} MS/s, gain {}, correction {:?} ppm",
            device.center_freq_hz / 1e6,
            device.sample_rate_hz / 1e6,
            device.gain,
            device.freq_correction_ppm
        ));
        if let Err(err) = self.device.configure(&self.config.device) {
            return Err(self.fault(err));
        }
        self.started_at = Some(self.clock.now());
        self.state = LoopState::Running;
        self.logger.record(&format!(
            "acquisition running: {} samples every {:?}, {:.1}s window",
            self.config.batch_size, self.config.tick_interval, self.config.window_size
        ));
        Ok(())
    }

    /// Runs one acquisition cycle, or stops if a stop was requested.
    ///
    /// Any cycle error faults the loop and releases the device before it is
    /// returned. Ticking a loop that is not running touches nothing.
    pub fn tick(&mut self) -> MonitorResult<TickOutcome> {
        if self.state != LoopState::Running {
            return Err(MonitorError::InvalidState {
                action: "tick",
                state: self.state,
            });
        }
        if *self.stop_receiver.borrow() {
            self.stop();
            return Ok(TickOutcome::Stopped);
        }
        match self.cycle() {
            Ok(outcome) => {
                self.metrics.record_tick();
                Ok(outcome)
            }
            Err(err) => Err(self.fault(err)),
        }
    }

    /// Releases the device and discards the history.
    pub fn stop(&mut self) {
        match self.state {
            LoopState::Running => {
                self.state = LoopState::Stopping;
                self.device.release();
                self.buffer.clear();
                self.state = LoopState::Stopped;
                let metrics = self.metrics.snapshot();
                self.logger.record(&format!(
                    "acquisition stopped after {} ticks ({} readings evicted in {} batches)",
                    metrics.ticks, metrics.evicted_readings, metrics.eviction_batches
                ));
            }
            LoopState::Idle => {
                self.device.release();
                self.state = LoopState::Stopped;
            }
            LoopState::Stopping | LoopState::Stopped | LoopState::Faulted => {}
        }
    }

    fn cycle(&mut self) -> MonitorResult<TickOutcome> {
        let batch = self.read_batch()?;
        let power_db = self.estimator.estimate(&batch)?;
        let reading = PowerReading::new(self.elapsed_seconds(), power_db);

        let evicted = self.buffer.append(reading)?;
        self.metrics.record_eviction(evicted);

        let frame = self.buffer.visible_frame(self.config.window_size);
        if let Err(err) = self.renderer.render(&frame) {
            self.metrics.record_render_error();
            self.logger.warn(&format!("renderer rejected frame: {err}"));
        }

        self.logger.debug(&format!(
            "t={:.3}s power={:.2} dB buffered={}",
            reading.elapsed_time,
            reading.power_db,
            self.buffer.len()
        ));
        Ok(TickOutcome::Published { reading, evicted })
    }

    fn read_batch(&mut self) -> MonitorResult<Vec<Complex32>> {
        let requested = self.config.batch_size;
        let began = self.clock.now();
        let batch = self.device.read(requested)?;
        let took = self.clock.now().saturating_duration_since(began);

        if took > self.config.read_timeout {
            return Err(MonitorError::device(
                DeviceOperation::Read,
                format!(
                    "read of {requested} samples took {took:?}, exceeding the {:?} timeout",
                    self.config.read_timeout
                ),
            ));
        }
        if batch.is_empty() {
            return Err(MonitorError::device(
                DeviceOperation::Read,
                "device returned no samples",
            ));
        }
        if batch.len() < requested {
            self.logger.debug(&format!(
                "short read: {} of {} samples",
                batch.len(),
                requested
            ));
        }
        Ok(batch)
    }

    fn elapsed_seconds(&self) -> f64 {
        self.started_at
            .map(|started| {
                self.clock
                    .now()
                    .saturating_duration_since(started)
                    .as_secs_f64()
            })
            .unwrap_or(0.0)
    }

    fn fault(&mut self, err: MonitorError) -> MonitorError {
        self.state = LoopState::Faulted;
        self.device.release();
        self.metrics.record_fault();
        self.logger.error(&format!("acquisition faulted: {err}"));
        err
    }
}
