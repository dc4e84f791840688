use serde::{Deserialize, Serialize};

/// Number of colour channels after forcing RGB decode.
pub const CHANNELS: usize = 3;

/// A decoded, transformed image and its label.
/// Pixels are stored channel-first (CHW) as f32.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSample {
    pub pixels: Vec<f32>,
    pub height: usize,
    pub width:  usize,
    pub label:  usize,
}

impl ImageSample {
    pub fn pixel_count(&self) -> usize {
        self.height * self.width
    }

    /// Slice of one channel plane.
    pub fn channel(&self, c: usize) -> &[f32] {
        let plane = self.pixel_count();
        &self.pixels[c * plane..(c + 1) * plane]
    }
}
