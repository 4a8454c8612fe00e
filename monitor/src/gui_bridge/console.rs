use log::info;
use powercore::prelude::{MonitorResult, VisibleFrame};
use powercore::Renderer;

/// Logs a one-line summary of every `every`-th frame.
pub struct ConsoleRenderer {
    every: u64,
    frames: u64,
}

impl ConsoleRenderer {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
        }
    }

    #[cfg(test)]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn summary(frame: &VisibleFrame) -> Option<String> {
        let latest = frame.points.last()?;
        let peak = frame
            .points
            .iter()
            .map(|reading| reading.power_db)
            .fold(f64::NEG_INFINITY, f64::max);
        Some(format!(
            "t={:>7.2}s power={:>7.2} dB peak={:>7.2} dB points={:>4} x=[{:.2}, {:.2}]",
            latest.elapsed_time,
            latest.power_db,
            peak,
            frame.points.len(),
            frame.x_range.lo,
            frame.x_range.hi
        ))
    }
}

impl Renderer for ConsoleRenderer {
    fn render(&mut self, frame: &VisibleFrame) -> MonitorResult<()> {
        self.frames += 1;
        if self.frames % self.every == 0 {
            if let Some(line) = Self::summary(frame) {
                info!("[console] {line}");
            }
        }
        Ok(())
    }
}
