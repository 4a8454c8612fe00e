use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::prelude::{
    MonitorError, MonitorResult, PowerReading, VisibleFrame, VisibleRange,
};
use crate::telemetry::log::LogManager;

/// When and how far the buffer trims its oldest readings.
///
/// Once the retained span exceeds the window and more than `trigger_len`
/// readings are held, the front is cut back to `retain_len` in one batch.
/// `max_points` is a hard cap enforced regardless of span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub trigger_len: usize,
    pub retain_len: usize,
    pub max_points: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            trigger_len: 1000,
            retain_len: 500,
            max_points: 2000,
        }
    }
}

impl RetentionPolicy {
    pub fn validate(&self) -> MonitorResult<()> {
        if self.retain_len == 0 {
            return Err(MonitorError::InvalidConfig(
                "retention target must keep at least one reading".into(),
            ));
        }
        if self.retain_len >= self.trigger_len {
            return Err(MonitorError::InvalidConfig(format!(
                "retention target {} must be below the trigger length {}",
                self.retain_len, self.trigger_len
            )));
        }
        if self.trigger_len > self.max_points {
            return Err(MonitorError::InvalidConfig(format!(
                "trigger length {} exceeds the hard cap {}",
                self.trigger_len, self.max_points
            )));
        }
        Ok(())
    }
}

/// Time-ordered history of power readings with bulk eviction from the front.
pub struct TimeSeriesBuffer {
    readings: VecDeque<PowerReading>,
    window_size: f64,
    policy: RetentionPolicy,
    logger: LogManager,
}

impl TimeSeriesBuffer {
    pub fn new(window_size: f64, policy: RetentionPolicy) -> MonitorResult<Self> {
        if !(window_size.is_finite() && window_size > 0.0) {
            return Err(MonitorError::InvalidConfig(format!(
                "window size must be positive, got {window_size}"
            )));
        }
        policy.validate()?;
        Ok(Self {
            readings: VecDeque::with_capacity(policy.trigger_len + 1),
            window_size,
            policy,
            logger: LogManager::new("buffer"),
        })
    }

    pub fn window_size(&self) -> f64 {
        self.window_size
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn newest(&self) -> Option<&PowerReading> {
        self.readings.back()
    }

    pub fn oldest(&self) -> Option<&PowerReading> {
        self.readings.front()
    }

    /// Seconds between the oldest and newest retained readings.
    pub fn span(&self) -> f64 {
        match (self.readings.front(), self.readings.back()) {
            (Some(oldest), Some(newest)) => newest.elapsed_time - oldest.elapsed_time,
            _ => 0.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PowerReading> + '_ {
        self.readings.iter()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    /// Appends at the back and evicts if the policy calls for it.
    ///
    /// Returns how many readings were evicted by this call. A reading that is
    /// not strictly newer than the current newest is rejected and the buffer
    /// is left untouched.
    pub fn append(&mut self, reading: PowerReading) -> MonitorResult<usize> {
        if !(reading.elapsed_time.is_finite() && reading.elapsed_time >= 0.0) {
            return Err(MonitorError::InvalidInput(format!(
                "elapsed time {} is not a non-negative number of seconds",
                reading.elapsed_time
            )));
        }
        if let Some(newest) = self.readings.back() {
            if reading.elapsed_time <= newest.elapsed_time {
                return Err(MonitorError::OutOfOrderInsertion {
                    newest: newest.elapsed_time,
                    attempted: reading.elapsed_time,
                });
            }
        }

        self.readings.push_back(reading);
        let mut evicted = self.evict_if_needed();

        if self.readings.len() > self.policy.max_points {
            let excess = self.trim_front_to(self.policy.retain_len);
            self.logger.warn(&format!(
                "hard cap of {} readings reached within a {:.1}s span, dropped {} oldest",
                self.policy.max_points,
                self.span(),
                excess
            ));
            evicted += excess;
        }
        Ok(evicted)
    }

    /// Trims the front back to the retention target once the window has
    /// scrolled and the trigger length is exceeded. Returns the number of
    /// readings removed; zero when nothing needed trimming.
    pub fn evict_if_needed(&mut self) -> usize {
        if self.span() > self.window_size && self.readings.len() > self.policy.trigger_len {
            self.trim_front_to(self.policy.retain_len)
        } else {
            0
        }
    }

    /// Contiguous suffix of readings inside the last `window` seconds.
    pub fn visible_slice(&self, window: f64) -> Vec<PowerReading> {
        let start = self.visible_start(window);
        self.readings.range(start..).copied().collect()
    }

    /// X-axis bounds: `[0, window]` until the newest reading passes
    /// `window`, then the trailing `window` seconds.
    pub fn visible_range(&self, window: f64) -> VisibleRange {
        let newest = self.newest().map_or(0.0, |r| r.elapsed_time);
        let hi = newest.max(window);
        VisibleRange {
            lo: hi - window,
            hi,
        }
    }

    pub fn visible_frame(&self, window: f64) -> VisibleFrame {
        VisibleFrame {
            points: self.visible_slice(window),
            x_range: self.visible_range(window),
        }
    }

    fn visible_start(&self, window: f64) -> usize {
        let Some(newest) = self.readings.back() else {
            return 0;
        };
        if newest.elapsed_time <= window {
            return 0;
        }
        let cutoff = newest.elapsed_time - window;
        self.readings
            .partition_point(|reading| reading.elapsed_time < cutoff)
    }

    fn trim_front_to(&mut self, target: usize) -> usize {
        let excess = self.readings.len().saturating_sub(target);
        if excess > 0 {
            self.readings.drain(..excess);
            self.logger.debug(&format!(
                "evicted {} readings, {} retained",
                excess,
                self.readings.len()
            ));
        }
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> TimeSeriesBuffer {
        TimeSeriesBuffer::new(10.0, RetentionPolicy::default()).unwrap()
    }

    fn fill(buffer: &mut TimeSeriesBuffer, count: usize, step: f64) -> Vec<usize> {
        (0..count)
            .map(|i| {
                buffer
                    .append(PowerReading::new(step * i as f64, -40.0 + i as f64 * 0.01))
                    .unwrap()
            })
            .collect()
    }

    fn is_sorted(buffer: &TimeSeriesBuffer) -> bool {
        buffer
            .iter()
            .zip(buffer.iter().skip(1))
            .all(|(a, b)| a.elapsed_time < b.elapsed_time)
    }

    #[test]
    fn retention_policy_validation() {
        RetentionPolicy::default().validate().unwrap();
        let inverted = RetentionPolicy {
            trigger_len: 500,
            retain_len: 1000,
            max_points: 2000,
        };
        assert!(inverted.validate().is_err());
        let capped_below_trigger = RetentionPolicy {
            trigger_len: 1000,
            retain_len: 500,
            max_points: 800,
        };
        assert!(capped_below_trigger.validate().is_err());
        let empty = RetentionPolicy {
            trigger_len: 10,
            retain_len: 0,
            max_points: 10,
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn sliding_window_scenario_evicts_in_one_batch() {
        let mut buffer = buffer();
        let evictions = fill(&mut buffer, 1200, 0.05);

        // the 1001st append (index 1000, t = 50s) is the only one that trims
        assert_eq!(evictions[1000], 501);
        assert_eq!(evictions.iter().filter(|&&n| n > 0).count(), 1);
        assert_eq!(evictions.iter().sum::<usize>(), 501);

        assert_eq!(buffer.len(), 699);
        assert!((buffer.newest().unwrap().elapsed_time - 0.05 * 1199.0).abs() < 1e-9);
        assert!((buffer.oldest().unwrap().elapsed_time - 0.05 * 501.0).abs() < 1e-9);
        assert!(is_sorted(&buffer));
    }

    #[test]
    fn length_drops_to_retention_target_after_trigger() {
        let mut buffer = buffer();
        fill(&mut buffer, 1000, 0.05);
        assert_eq!(buffer.len(), 1000);
        buffer
            .append(PowerReading::new(0.05 * 1000.0, -30.0))
            .unwrap();
        assert_eq!(buffer.len(), 500);
    }

    #[test]
    fn no_eviction_while_span_inside_window() {
        // 1500 readings packed into 7.5s never scroll past a 10s window,
        // but the hard cap of 2000 is not reached either
        let mut buffer = buffer();
        let evictions = fill(&mut buffer, 1500, 0.005);
        assert!(evictions.iter().all(|&n| n == 0));
        assert_eq!(buffer.len(), 1500);
    }

    #[test]
    fn hard_cap_is_never_exceeded() {
        let policy = RetentionPolicy {
            trigger_len: 100,
            retain_len: 50,
            max_points: 120,
        };
        let mut buffer = TimeSeriesBuffer::new(10.0, policy).unwrap();
        // span stays under the window, so only the cap can trim
        for i in 0..1000 {
            buffer
                .append(PowerReading::new(i as f64 * 0.001, 0.0))
                .unwrap();
            assert!(buffer.len() <= 120);
        }
        assert!(is_sorted(&buffer));
        assert!((buffer.newest().unwrap().elapsed_time - 0.999).abs() < 1e-9);
    }

    #[test]
    fn evict_if_needed_is_idempotent() {
        let mut buffer = buffer();
        fill(&mut buffer, 1001, 0.05);
        assert_eq!(buffer.len(), 500);
        assert_eq!(buffer.evict_if_needed(), 0);
        assert_eq!(buffer.evict_if_needed(), 0);
        assert_eq!(buffer.len(), 500);

        let mut empty = self::buffer();
        assert_eq!(empty.evict_if_needed(), 0);
    }

    #[test]
    fn out_of_order_append_is_rejected() {
        let mut buffer = buffer();
        fill(&mut buffer, 5, 1.0);
        let before: Vec<_> = buffer.iter().copied().collect();

        let duplicate = buffer.append(PowerReading::new(4.0, 0.0));
        assert!(matches!(
            duplicate,
            Err(MonitorError::OutOfOrderInsertion { newest, attempted })
                if newest == 4.0 && attempted == 4.0
        ));
        let earlier = buffer.append(PowerReading::new(1.5, 0.0));
        assert!(matches!(
            earlier,
            Err(MonitorError::OutOfOrderInsertion { .. })
        ));

        let after: Vec<_> = buffer.iter().copied().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn non_finite_timestamps_are_rejected() {
        let mut buffer = buffer();
        assert!(matches!(
            buffer.append(PowerReading::new(f64::NAN, 0.0)),
            Err(MonitorError::InvalidInput(_))
        ));
        assert!(buffer.append(PowerReading::new(-1.0, 0.0)).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn visible_slice_returns_everything_before_scrolling() {
        let mut buffer = buffer();
        fill(&mut buffer, 200, 0.05);
        assert!(buffer.newest().unwrap().elapsed_time <= 10.0);
        assert_eq!(buffer.visible_slice(10.0).len(), 200);
        assert_eq!(
            buffer.visible_range(10.0),
            VisibleRange { lo: 0.0, hi: 10.0 }
        );
    }

    #[test]
    fn visible_slice_is_a_suffix_within_the_window() {
        let mut buffer = buffer();
        fill(&mut buffer, 400, 0.05);
        let newest = buffer.newest().unwrap().elapsed_time;

        for window in [0.5, 2.0, 10.0, 19.95, 50.0] {
            let slice = buffer.visible_slice(window);
            let all: Vec<_> = buffer.iter().copied().collect();
            assert!(all.ends_with(&slice));
            assert_eq!(slice.last().unwrap().elapsed_time, newest);
            let span = newest - slice[0].elapsed_time;
            assert!(span <= window + 1e-9, "window {window}: span {span}");
            if slice.len() < all.len() {
                // the reading just before the slice must be outside the window
                let excluded = all[all.len() - slice.len() - 1];
                assert!(excluded.elapsed_time < newest - window);
            }
        }
    }

    #[test]
    fn visible_range_scrolls_with_newest_reading() {
        let mut buffer = buffer();
        fill(&mut buffer, 300, 0.05);
        let range = buffer.visible_range(10.0);
        assert!((range.hi - 14.95).abs() < 1e-9);
        assert!((range.width() - 10.0).abs() < 1e-9);
        let frame = buffer.visible_frame(10.0);
        assert!(frame.points.iter().all(|r| range.contains(r.elapsed_time)));
    }

    #[test]
    fn empty_buffer_has_fixed_axis() {
        let buffer = buffer();
        assert!(buffer.visible_slice(10.0).is_empty());
        assert_eq!(
            buffer.visible_range(10.0),
            VisibleRange { lo: 0.0, hi: 10.0 }
        );
        assert_eq!(buffer.span(), 0.0);
    }
}
