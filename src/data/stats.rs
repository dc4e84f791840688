// ============================================================
// Layer 4 — Dataset Channel Statistics
// ============================================================
// Estimates per-channel mean and standard deviation used to
// normalise inputs.
//
// For every batch of images [B, 3, H, W]:
//   1. flatten spatial dims     → [B, 3, H*W]
//   2. per image, per channel   → mean and (unbiased) std
//   3. sum over the batch       → running totals [3]
// Finally divide both totals by the number of images.
//
// This is a mean of per-image means and a mean of per-image
// standard deviations, NOT the global pixel statistics. With
// equally sized images the mean matches the global mean; the
// std is an approximation and is kept that way on purpose.

use burn::{data::dataloader::DataLoaderBuilder, prelude::*};
use serde::{Deserialize, Serialize};

use crate::data::{batcher::ImageBatcher, dataset::ImageDataset, transform::Normalize};
use crate::domain::error::{VmmrError, VmmrResult};
use crate::domain::sample::CHANNELS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: [f32; CHANNELS],
    pub std:  [f32; CHANNELS],
}

impl From<ChannelStats> for Normalize {
    fn from(s: ChannelStats) -> Self {
        Normalize::new(s.mean, s.std)
    }
}

/// Accumulate channel statistics over every image in `dataset`.
pub fn compute_mean_std<B: Backend>(
    dataset:    ImageDataset,
    batch_size: usize,
    device:     &B::Device,
) -> VmmrResult<ChannelStats> {
    let loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(batch_size.max(1))
        .build(dataset);

    let mut images   = 0usize;
    let mut mean_sum = Tensor::<B, 1>::zeros([CHANNELS], device);
    let mut std_sum  = Tensor::<B, 1>::zeros([CHANNELS], device);

    for (batch_index, batch) in loader.iter().enumerate() {
        let batch = batch?;
        let [n, c, h, w] = batch.images.dims();

        // [B, C, H, W] → [B, C, H*W]
        let flat = batch.images.reshape([n, c, h * w]);
        images += n;

        mean_sum = mean_sum + flat.clone().mean_dim(2).sum_dim(0).reshape([c]);
        std_sum  = std_sum  + flat.var(2).sqrt().sum_dim(0).reshape([c]);

        tracing::debug!("Statistics batch {} ({} images so far)", batch_index, images);
    }

    if images == 0 {
        return Err(VmmrError::schema("manifest", "no rows to compute statistics over"));
    }

    let mean = to_channels((mean_sum / images as f32).into_data())?;
    let std  = to_channels((std_sum / images as f32).into_data())?;
    Ok(ChannelStats { mean, std })
}

fn to_channels(data: burn::tensor::TensorData) -> VmmrResult<[f32; CHANNELS]> {
    let values = data
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| VmmrError::Device(format!("{e:?}")))?;
    let mut out = [0.0f32; CHANNELS];
    out.copy_from_slice(&values[..CHANNELS]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::write_fixture;
    use crate::data::transform::Transform;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_constant_color_gives_color_mean_and_zero_std() {
        let tmp     = tempfile::tempdir().unwrap();
        let color   = [51u8, 102, 204];
        let records = write_fixture(tmp.path(), &["audi", "bmw", "ford"], 4, 10, color);
        let ds      = ImageDataset::new(records, Transform::new().resize(16, 16));

        let stats = compute_mean_std::<TestBackend>(ds, 5, &Default::default()).unwrap();

        for c in 0..CHANNELS {
            let expected = color[c] as f32 / 255.0;
            assert!((stats.mean[c] - expected).abs() < 1e-4, "mean[{c}] = {}", stats.mean[c]);
            assert!(stats.std[c].abs() < 1e-4, "std[{c}] = {}", stats.std[c]);
        }
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let ds = ImageDataset::new(Vec::new(), Transform::new());
        assert!(compute_mean_std::<TestBackend>(ds, 4, &Default::default()).is_err());
    }
}
