// ============================================================
// Layer 4 — Image Transforms
// ============================================================
// A small, ordered pipeline applied to every decoded RGB image:
//
//   RgbImage ──► [Resize] ──► [RandomHorizontalFlip] ──► CHW f32 in [0,1] ──► [Normalize]
//
// Image-space steps run in the order they were added. The
// conversion to channel-first floats always happens last,
// followed by the optional per-channel normalisation
// (x - mean) / std.
//
// Evaluation pipelines are deterministic; a training pipeline
// may add a random horizontal flip.

use image::{imageops, imageops::FilterType, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::sample::{ImageSample, CHANNELS};

/// Per-channel normalisation constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalize {
    pub mean: [f32; CHANNELS],
    pub std:  [f32; CHANNELS],
}

impl Normalize {
    pub fn new(mean: [f32; CHANNELS], std: [f32; CHANNELS]) -> Self {
        Self { mean, std }
    }

    /// Statistics the torchvision ResNet weights were trained with.
    pub fn imagenet() -> Self {
        Self::new([0.485, 0.456, 0.406], [0.229, 0.224, 0.225])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Resize { width: u32, height: u32 },
    RandomHorizontalFlip { probability: f64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transform {
    steps:     Vec<Step>,
    normalize: Option<Normalize>,
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize + optional normalisation, no randomness.
    pub fn evaluation(size: u32, normalize: Option<Normalize>) -> Self {
        let t = Self::new().resize(size, size);
        match normalize {
            Some(n) => t.normalize(n),
            None    => t,
        }
    }

    /// Evaluation pipeline plus a random horizontal flip.
    pub fn training(size: u32, normalize: Option<Normalize>) -> Self {
        let mut t = Self::evaluation(size, normalize);
        t.steps.push(Step::RandomHorizontalFlip { probability: 0.5 });
        t
    }

    pub fn resize(mut self, width: u32, height: u32) -> Self {
        self.steps.push(Step::Resize { width, height });
        self
    }

    pub fn random_horizontal_flip(mut self, probability: f64) -> Self {
        self.steps.push(Step::RandomHorizontalFlip { probability });
        self
    }

    pub fn normalize(mut self, normalize: Normalize) -> Self {
        self.normalize = Some(normalize);
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run the image-space steps in order.
    pub fn apply_image(&self, mut image: RgbImage) -> RgbImage {
        let mut rng = rand::thread_rng();
        for step in &self.steps {
            image = match *step {
                Step::Resize { width, height } => {
                    if image.dimensions() == (width, height) {
                        image
                    } else {
                        imageops::resize(&image, width, height, FilterType::Triangle)
                    }
                }
                Step::RandomHorizontalFlip { probability } => {
                    if rng.gen_bool(probability.clamp(0.0, 1.0)) {
                        imageops::flip_horizontal(&image)
                    } else {
                        image
                    }
                }
            };
        }
        image
    }

    /// Convert to channel-first floats in [0,1], then normalise.
    pub fn to_chw(&self, image: &RgbImage) -> Vec<f32> {
        let (width, height) = image.dimensions();
        let plane = (width * height) as usize;
        let mut pixels = vec![0.0f32; plane * CHANNELS];

        for (x, y, pixel) in image.enumerate_pixels() {
            let offset = (y * width + x) as usize;
            for c in 0..CHANNELS {
                pixels[c * plane + offset] = pixel.0[c] as f32 / 255.0;
            }
        }

        if let Some(n) = &self.normalize {
            for c in 0..CHANNELS {
                for v in &mut pixels[c * plane..(c + 1) * plane] {
                    *v = (*v - n.mean[c]) / n.std[c];
                }
            }
        }
        pixels
    }

    /// Full pipeline: image steps, tensor conversion, label attachment.
    pub fn run(&self, image: RgbImage, label: usize) -> ImageSample {
        let image = self.apply_image(image);
        let (width, height) = image.dimensions();
        ImageSample {
            pixels: self.to_chw(&image),
            height: height as usize,
            width:  width as usize,
            label,
        }
    }
}
