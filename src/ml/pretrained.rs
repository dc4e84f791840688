// ============================================================
// Layer 5 — Pretrained Backbone
// ============================================================
// Builds the transfer-learning model:
//
//   1. ResNet with the ImageNet head (1000 classes)
//   2. optionally load torchvision weights (.pth) into it
//   3. replace `fc` with a fresh Linear sized to our classes
//
// torchvision names the residual projection `downsample.0`
// (conv) and `downsample.1` (batch norm); our module names them
// `downsample.conv` / `downsample.bn`, so those keys are
// remapped on load. BatchNorm weight/bias → gamma/beta and the
// Linear transpose are handled by burn-import's adapter.
//
// Reference: burn-import (PyTorch records)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

use crate::domain::error::VmmrError;
use crate::ml::model::{ResNet, ResNetConfig, ResNetRecord, IMAGENET_CLASSES};

/// Load torchvision ResNet weights into a model with the ImageNet head.
pub fn load_torchvision<B: Backend>(
    model:  ResNet<B>,
    path:   &Path,
    device: &B::Device,
) -> Result<ResNet<B>> {
    if !path.exists() {
        return Err(VmmrError::fs(path, "pretrained weights not found").into());
    }

    let args = LoadArgs::new(PathBuf::from(path))
        .with_key_remap("downsample\\.0", "downsample.conv")
        .with_key_remap("downsample\\.1", "downsample.bn");

    let record: ResNetRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(args, device)
        .with_context(|| format!("Cannot load pretrained weights from '{}'", path.display()))?;

    tracing::info!("Loaded pretrained backbone from '{}'", path.display());
    Ok(model.load_record(record))
}

/// Pretrained backbone (when `weights` is given) with a new
/// classification layer sized to `num_classes`.
pub fn create_model<B: Backend>(
    depth:       usize,
    num_classes: usize,
    weights:     Option<&Path>,
    device:      &B::Device,
) -> Result<ResNet<B>> {
    let config = ResNetConfig::by_depth(depth, IMAGENET_CLASSES)
        .with_context(|| format!("Unsupported ResNet depth {depth} (expected 50, 101 or 152)"))?;

    let model = config.init::<B>(device);
    let model = match weights {
        Some(path) => load_torchvision(model, path, device)?,
        None => {
            tracing::warn!("No pretrained weights given, backbone starts from random init");
            model
        }
    };

    Ok(model.with_head(num_classes, device))
}
