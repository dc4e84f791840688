// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to stack decoded samples into
// device tensors:
//
//   Input:  Vec of N samples, each CHW with the same H and W
//   Output: images [N, 3, H, W] (float), labels [N] (int)
//
// A sample that failed to load poisons the whole batch: the
// error is passed through so the training loop aborts instead
// of training on a silently shortened batch.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::SampleResult;
use crate::domain::error::VmmrError;
use crate::domain::sample::{ImageSample, CHANNELS};

/// A batch of images ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// [batch_size] dense label ids
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    pub fn len(&self) -> usize {
        self.labels.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type BatchResult<B> = Result<ImageBatch<B>, VmmrError>;

/// Holds the target device so tensors are created on the right
/// GPU/CPU.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack already-decoded samples.
    pub fn stack(&self, samples: Vec<ImageSample>) -> BatchResult<B> {
        let batch_size = samples.len();
        let (height, width) = samples
            .first()
            .map(|s| (s.height, s.width))
            .unwrap_or((0, 0));

        if let Some(bad) = samples.iter().find(|s| s.height != height || s.width != width) {
            return Err(VmmrError::schema(
                "batch",
                format!(
                    "sample shape mismatch: expected {height}x{width}, got {}x{}",
                    bad.height, bad.width
                ),
            ));
        }

        let mut pixels = Vec::with_capacity(batch_size * CHANNELS * height * width);
        let mut labels = Vec::with_capacity(batch_size);
        for sample in samples {
            pixels.extend_from_slice(&sample.pixels);
            labels.push(sample.label as i32);
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, CHANNELS, height, width]),
            &self.device,
        );
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        Ok(ImageBatch { images, labels })
    }
}

impl<B: Backend> Batcher<SampleResult, BatchResult<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<SampleResult>) -> BatchResult<B> {
        let samples = items.into_iter().collect::<Result<Vec<_>, _>>()?;
        self.stack(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn sample(value: f32, label: usize, size: usize) -> ImageSample {
        ImageSample {
            pixels: vec![value; CHANNELS * size * size],
            height: size,
            width:  size,
            label,
        }
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = ImageBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher
            .batch(vec![Ok(sample(0.1, 0, 4)), Ok(sample(0.2, 2, 4)), Ok(sample(0.3, 1, 4))])
            .unwrap();

        assert_eq!(batch.images.dims(), [3, 3, 4, 4]);
        assert_eq!(batch.len(), 3);
        let labels = batch.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![0, 2, 1]);
    }

    #[test]
    fn test_failed_sample_fails_batch() {
        let batcher = ImageBatcher::<TestBackend>::new(Default::default());
        let result  = batcher.batch(vec![
            Ok(sample(0.1, 0, 4)),
            Err(VmmrError::decode("bad.jpg", "truncated")),
        ]);
        assert!(matches!(result, Err(VmmrError::Decode { .. })));
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let batcher = ImageBatcher::<TestBackend>::new(Default::default());
        let result  = batcher.batch(vec![Ok(sample(0.1, 0, 4)), Ok(sample(0.1, 0, 5))]);
        assert!(result.is_err());
    }
}
