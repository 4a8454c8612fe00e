use crate::math::stats::StatsHelper;
use crate::prelude::{Complex32, MonitorError, MonitorResult, DEFAULT_EPSILON};

/// Turns one batch of IQ samples into a relative power figure in dB.
#[derive(Debug, Clone, Copy)]
pub struct PowerEstimator {
    epsilon: f64,
}

impl PowerEstimator {
    pub fn new(epsilon: f64) -> MonitorResult<Self> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(MonitorError::InvalidConfig(format!(
                "epsilon must be positive and finite, got {epsilon}"
            )));
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Power reported for a silent batch.
    pub fn floor_db(&self) -> f64 {
        10.0 * self.epsilon.log10()
    }

    /// `10 * log10(var(batch) + epsilon)`.
    pub fn estimate(&self, batch: &[Complex32]) -> MonitorResult<f64> {
        let variance = StatsHelper::complex_variance(batch)
            .ok_or_else(|| MonitorError::InvalidInput("empty sample batch".into()))?;
        Ok(10.0 * (variance + self.epsilon).log10())
    }
}

impl Default for PowerEstimator {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}
