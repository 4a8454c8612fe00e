use crate::device;
use crate::workflow::config::MonitorConfig;
use anyhow::Context;
use log::info;
use powercore::processing::{drive, AcquisitionLoop, LoopState, StopHandle};
use powercore::sdr_interface::WatchdogSource;
use powercore::telemetry::Metrics;
use powercore::Renderer;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub published: usize,
    pub final_state: LoopState,
    pub metrics: Metrics,
}

#[derive(Clone)]
pub struct Runner {
    config: MonitorConfig,
}

impl Runner {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn prepare<R: Renderer>(
        &self,
        renderer: R,
    ) -> anyhow::Result<AcquisitionLoop<WatchdogSource, R>> {
        let loop_config = self.config.to_loop_config()?;
        let source = device::open_source(&self.config)?;
        let source = WatchdogSource::spawn(source, loop_config.read_timeout)
            .context("starting the sample reader")?;
        AcquisitionLoop::new(source, renderer, loop_config).context("building acquisition loop")
    }

    /// Drives the loop until it is stopped, faults, or `limit` elapses.
    pub async fn execute<R: Renderer>(
        &self,
        acquisition: &mut AcquisitionLoop<WatchdogSource, R>,
        limit: Option<Duration>,
    ) -> anyhow::Result<RunSummary> {
        let timer = limit.map(|limit| stop_after(acquisition.stop_handle(), limit));

        let result = drive(acquisition).await;
        if let Some(timer) = timer {
            timer.abort();
        }

        let metrics = acquisition.metrics();
        let final_state = acquisition.state();
        info!(
            "acquisition finished in state {final_state}: {} ticks, {} eviction batches, {} render errors",
            metrics.ticks, metrics.eviction_batches, metrics.render_errors
        );
        let published = result.context("acquisition loop failed")?;
        Ok(RunSummary {
            published,
            final_state,
            metrics,
        })
    }
}

/// One-line outcome shown to the visualizer once acquisition ends.
pub fn outcome_status(outcome: &anyhow::Result<RunSummary>) -> String {
    match outcome {
        Ok(summary) => format!(
            "Acquisition {} after {} readings",
            summary.final_state, summary.published
        ),
        Err(err) => format!("Acquisition halted: {}", err.root_cause()),
    }
}

fn stop_after(stop: StopHandle, limit: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(limit).await;
        info!("run limit of {limit:?} reached, stopping");
        stop.request_stop();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use powercore::sdr_interface::NullRenderer;

    fn fast_config() -> MonitorConfig {
        MonitorConfig {
            batch_size: 256,
            tick_interval_ms: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn runner_stops_after_limit() {
        let runner = Runner::new(fast_config());
        let mut acquisition = runner.prepare(NullRenderer).unwrap();
        let summary = runner
            .execute(&mut acquisition, Some(Duration::from_millis(40)))
            .await
            .unwrap();

        assert_eq!(summary.final_state, LoopState::Stopped);
        assert!(summary.published > 0);
        let status = outcome_status(&Ok(summary.clone()));
        assert!(status.starts_with("Acquisition stopped after"), "{status}");
        assert_eq!(summary.metrics.ticks, summary.published);
        assert!(acquisition.source().is_closed());
    }

    #[tokio::test]
    async fn runner_surfaces_simulated_disconnect() {
        let mut config = fast_config();
        config.signal.fail_after_reads = Some(3);
        let runner = Runner::new(config);
        let mut acquisition = runner.prepare(NullRenderer).unwrap();

        let outcome = runner.execute(&mut acquisition, None).await;
        assert_eq!(
            outcome_status(&outcome),
            "Acquisition halted: device error during read_samples: simulated disconnect after 3 reads"
        );
        let err = outcome.err().unwrap();
        assert!(format!("{err:#}").contains("simulated disconnect"));
        assert_eq!(acquisition.state(), LoopState::Faulted);
        assert_eq!(acquisition.metrics().ticks, 3);
        assert!(acquisition.source().is_closed());
    }

    #[test]
    fn prepare_rejects_invalid_config() {
        let runner = Runner::new(MonitorConfig {
            window_size_s: -1.0,
            ..Default::default()
        });
        assert!(runner.prepare(NullRenderer).is_err());
    }
}
