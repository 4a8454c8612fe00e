use powercore::prelude::{PowerReading, VisibleFrame, VisibleRange};
use serde::{Deserialize, Serialize};

/// Latest visible window as served to the visualizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationModel {
    pub points: Vec<PowerReading>,
    pub x_range: VisibleRange,
    pub window_size_s: f64,
    pub center_freq_hz: f64,
    pub frames: u64,
    pub status: String,
}

impl VisualizationModel {
    pub fn new(center_freq_hz: f64, window_size_s: f64) -> Self {
        Self {
            points: Vec::new(),
            x_range: VisibleRange {
                lo: 0.0,
                hi: window_size_s,
            },
            window_size_s,
            center_freq_hz,
            frames: 0,
            status: "Waiting for samples...".into(),
        }
    }

    pub fn apply(&mut self, frame: &VisibleFrame) {
        self.points.clone_from(&frame.points);
        self.x_range = frame.x_range;
        self.frames += 1;
    }

    #[cfg(test)]
    pub fn latest(&self) -> Option<&PowerReading> {
        self.points.last()
    }
}
