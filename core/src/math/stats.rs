use num_complex::Complex32;

pub struct StatsHelper;

impl StatsHelper {
    /// Mean of `|z - mean|²` over the batch, accumulated in f64.
    ///
    /// Two passes: the first finds the complex mean, the second sums squared
    /// magnitudes of the deviations. Returns `None` for an empty batch.
    pub fn complex_variance(samples: &[Complex32]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        let count = samples.len() as f64;
        let (sum_re, sum_im) = samples.iter().fold((0.0f64, 0.0f64), |(re, im), z| {
            (re + f64::from(z.re), im + f64::from(z.im))
        });
        let mean_re = sum_re / count;
        let mean_im = sum_im / count;

        let sum_sq: f64 = samples
            .iter()
            .map(|z| {
                let d_re = f64::from(z.re) - mean_re;
                let d_im = f64::from(z.im) - mean_im;
                d_re * d_re + d_im * d_im
            })
            .sum();
        Some(sum_sq / count)
    }
}
