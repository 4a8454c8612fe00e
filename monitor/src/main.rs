use anyhow::Context;
use clap::Parser;
use device::DeviceKind;
use gui_bridge::{gui_bind_address, ConsoleRenderer, GuiBridge};
use log::{error, info};
use powercore::prelude::Gain;
use powercore::processing::StopHandle;
use powercore::Renderer;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::{MonitorConfig, Overrides};
use workflow::runner::{outcome_status, RunSummary, Runner};

mod device;
mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Real-time received power monitor for an SDR front end")]
struct Args {
    /// Load monitor settings from YAML; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Sample source to acquire from
    #[arg(long, value_enum)]
    device: Option<DeviceKind>,
    /// Index of the RTL-SDR dongle when several are attached
    #[arg(long)]
    device_index: Option<usize>,
    /// Center frequency in Hz
    #[arg(long)]
    center_freq: Option<f64>,
    /// Sample rate in Hz
    #[arg(long)]
    sample_rate: Option<f64>,
    /// Tuner gain in dB, or "auto"
    #[arg(long)]
    gain: Option<Gain>,
    /// Frequency correction in ppm
    #[arg(long, allow_negative_numbers = true)]
    freq_correction: Option<i32>,
    /// Seconds of history shown on screen
    #[arg(long)]
    window_size: Option<f64>,
    /// Acquisition cadence in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Samples read per tick (power of two)
    #[arg(long)]
    batch_size: Option<usize>,
    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(long)]
    duration: Option<f64>,
    /// Serve the visible window over HTTP for the visualizer
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Seed for the synthetic sample source
    #[arg(long)]
    seed: Option<u64>,
    /// Simulate a device disconnect after this many reads
    #[arg(long)]
    fail_after: Option<usize>,
    /// Log every Nth frame when not serving
    #[arg(long, default_value_t = 20)]
    log_every: u64,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            device: self.device,
            device_index: self.device_index,
            center_freq_hz: self.center_freq,
            sample_rate_hz: self.sample_rate,
            gain: self.gain,
            freq_correction_ppm: self.freq_correction,
            window_size_s: self.window_size,
            tick_interval_ms: self.tick_ms,
            batch_size: self.batch_size,
            seed: self.seed,
            fail_after_reads: self.fail_after,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = &args.config {
        MonitorConfig::load(path)?
    } else {
        MonitorConfig::default()
    };
    config.apply(&args.overrides());

    let limit = match args.duration {
        Some(seconds) if seconds.is_finite() && seconds > 0.0 => {
            Some(Duration::from_secs_f64(seconds))
        }
        Some(seconds) => anyhow::bail!("duration must be a positive number of seconds, got {seconds}"),
        None => None,
    };

    // the loop blocks its thread for up to one read timeout per tick; signal
    // handling and the run limit live on the worker threads
    let runtime = TokioBuilder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("creating runtime for the acquisition loop")?;

    let runner = Runner::new(config);
    let bridge = if args.serve {
        let bridge = GuiBridge::new(runner.config().center_freq_hz, runner.config().window_size_s);
        bridge.serve(gui_bind_address())?;
        bridge.publish_status("Acquisition starting (Ctrl+C to stop)...");
        Some(bridge)
    } else {
        None
    };
    let renderer: Box<dyn Renderer> = match &bridge {
        Some(bridge) => Box::new(bridge.clone()),
        None => Box::new(ConsoleRenderer::new(args.log_every)),
    };

    let mut acquisition = match runner.prepare(renderer) {
        Ok(acquisition) => acquisition,
        Err(err) => {
            report_outcome(bridge.as_ref(), &Err(anyhow::anyhow!("{err:#}")));
            return Err(err);
        }
    };
    let stop = acquisition.stop_handle();

    let outcome = runtime.block_on(async {
        let ctrl_c = tokio::spawn(stop_on_ctrl_c(stop));
        let outcome = runner.execute(&mut acquisition, limit).await;
        ctrl_c.abort();
        outcome
    });

    report_outcome(bridge.as_ref(), &outcome);
    match outcome {
        Ok(summary) => {
            info!(
                "monitor stopped cleanly: {} readings published, {} evicted",
                summary.published, summary.metrics.evicted_readings
            );
            Ok(())
        }
        Err(err) => {
            error!("monitor halted: {err:#}");
            Err(err)
        }
    }
}

/// How long the bridge keeps serving the final status before exit.
const BRIDGE_LINGER: Duration = Duration::from_secs(2);

fn report_outcome(bridge: Option<&GuiBridge>, outcome: &anyhow::Result<RunSummary>) {
    if let Some(bridge) = bridge {
        bridge.publish_status(&outcome_status(outcome));
        thread::sleep(BRIDGE_LINGER);
    }
}

async fn stop_on_ctrl_c(stop: StopHandle) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Ctrl+C received, stopping at the next tick");
            stop.request_stop();
        }
        Err(err) => error!("unable to listen for Ctrl+C: {err}"),
    }
}
