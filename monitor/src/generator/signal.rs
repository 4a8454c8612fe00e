use powercore::prelude::{
    Complex32, DeviceConfig, DeviceOperation, Gain, MonitorError, MonitorResult,
};
use powercore::sdr_interface::SampleSource;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Tuning range of the R820T front end found on common RTL-SDR dongles.
pub const TUNER_MIN_HZ: f64 = 24e6;
pub const TUNER_MAX_HZ: f64 = 1.766e9;

/// Shape of the synthetic signal: a noise floor plus an on/off keyed
/// carrier, like a remote-control fob transmitting near the tuned frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub noise_amplitude: f32,
    pub tone_amplitude: f32,
    pub tone_offset_hz: f64,
    pub burst_period_s: f64,
    pub burst_duty: f64,
    pub seed: u64,
    /// Simulate a disconnect after this many successful reads.
    pub fail_after_reads: Option<usize>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            noise_amplitude: 0.02,
            tone_amplitude: 0.4,
            tone_offset_hz: 25e3,
            burst_period_s: 0.5,
            burst_duty: 0.3,
            seed: 0,
            fail_after_reads: None,
        }
    }
}

/// Deterministic stand-in for an RTL-SDR dongle.
///
/// Time advances by the samples actually delivered, so the burst pattern
/// is a function of the read sequence and the seed only.
pub struct SyntheticSource {
    config: SignalConfig,
    rng: StdRng,
    sample_rate_hz: f64,
    tuned: Option<DeviceConfig>,
    samples_emitted: u64,
    reads: usize,
    closed: bool,
}

impl SyntheticSource {
    pub fn new(config: SignalConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            sample_rate_hz: 0.0,
            tuned: None,
            samples_emitted: 0,
            reads: 0,
            closed: false,
        }
    }

    #[cfg(test)]
    pub fn tuned(&self) -> Option<&DeviceConfig> {
        self.tuned.as_ref()
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn burst_active(&self, t: f64) -> bool {
        if self.config.burst_period_s <= 0.0 {
            return true;
        }
        let phase = t.rem_euclid(self.config.burst_period_s) / self.config.burst_period_s;
        phase < self.config.burst_duty
    }

    fn gain_scale(gain: Gain) -> f32 {
        match gain {
            Gain::Auto => 1.0,
            // relative to the 20 dB default so the default config is unity
            Gain::Db(db) => 10f64.powf((db - 20.0) / 20.0) as f32,
        }
    }

    fn noise(&mut self) -> f32 {
        let amplitude = self.config.noise_amplitude;
        if amplitude > 0.0 {
            self.rng.gen_range(-amplitude..amplitude)
        } else {
            0.0
        }
    }
}

impl SampleSource for SyntheticSource {
    fn configure(&mut self, config: &DeviceConfig) -> MonitorResult<()> {
        if self.closed {
            return Err(MonitorError::device(
                DeviceOperation::Configure,
                "device already closed",
            ));
        }
        if !(TUNER_MIN_HZ..=TUNER_MAX_HZ).contains(&config.center_freq_hz) {
            return Err(MonitorError::device(
                DeviceOperation::Configure,
                format!(
                    "center frequency {:.3} MHz is outside the tuner range {:.0}-{:.0} MHz",
                    config.center_freq_hz / 1e6,
                    TUNER_MIN_HZ / 1e6,
                    TUNER_MAX_HZ / 1e6
                ),
            ));
        }
        if !(config.sample_rate_hz.is_finite() && config.sample_rate_hz > 0.0) {
            return Err(MonitorError::device(
                DeviceOperation::Configure,
                format!("unsupported sample rate {} Hz", config.sample_rate_hz),
            ));
        }
        self.sample_rate_hz = config.sample_rate_hz;
        self.tuned = Some(config.clone());
        Ok(())
    }

    fn read_samples(&mut self, count: usize) -> MonitorResult<Vec<Complex32>> {
        if self.closed {
            return Err(MonitorError::device(
                DeviceOperation::Read,
                "device already closed",
            ));
        }
        let gain = match &self.tuned {
            Some(tuned) => Self::gain_scale(tuned.gain),
            None => {
                return Err(MonitorError::device(
                    DeviceOperation::Read,
                    "device not configured",
                ))
            }
        };
        if let Some(limit) = self.config.fail_after_reads {
            if self.reads >= limit {
                return Err(MonitorError::device(
                    DeviceOperation::Read,
                    format!("simulated disconnect after {limit} reads"),
                ));
            }
        }

        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            let t = self.samples_emitted as f64 / self.sample_rate_hz;
            let mut re = self.noise();
            let mut im = self.noise();
            if self.burst_active(t) {
                let phase = TAU * self.config.tone_offset_hz * t;
                re += self.config.tone_amplitude * phase.cos() as f32;
                im += self.config.tone_amplitude * phase.sin() as f32;
            }
            samples.push(Complex32::new(re * gain, im * gain));
            self.samples_emitted += 1;
        }
        self.reads += 1;
        Ok(samples)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            log::info!(
                "[synthetic] closed after {} reads ({} samples)",
                self.reads,
                self.samples_emitted
            );
        }
    }
}
