// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Read train/test manifests   (Layer 4 - data)
//   Step 2: Count classes               (Layer 3 - domain)
//   Step 3: Build datasets + loaders    (Layer 4 - data, Layer 5 - ml)
//   Step 4: Save config                 (Layer 6 - infra)
//   Step 5: Build pretrained model      (Layer 5 - ml)
//   Step 6: Run training loop           (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use std::path::Path;

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::ImageDataset,
    manifest_io::read_manifest,
    transform::{Normalize, Transform},
};
use crate::domain::{error::VmmrError, manifest::num_classes};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    pretrained::create_model,
    trainer::{train_model, Loaders, TrainOutcome},
};

/// Rows read from each manifest unless lifted with `--all-rows`.
pub const DEFAULT_ROW_LIMIT: usize = 1200;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it is saved next to the checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_manifest:  String,
    /// Also used as the validation set.
    pub test_manifest:   String,
    pub checkpoint_path: String,
    pub num_epochs:      usize,
    pub batch_size:      usize,
    pub learning_rate:   f64,
    pub momentum:        f64,
    /// Epochs between learning-rate decays.
    pub step_size:       usize,
    pub gamma:           f64,
    /// 0 loads batches on the training thread.
    pub num_workers:     usize,
    pub image_size:      u32,
    /// ResNet depth: 50, 101 or 152.
    pub depth:           usize,
    /// torchvision `.pth` weights for the backbone.
    pub pretrained:      Option<String>,
    pub resume:          bool,
    pub cpu:             bool,
    /// `None` reads every manifest row.
    pub row_limit:       Option<usize>,
    /// Normalisation statistics; ImageNet values when unset.
    pub mean:            Option<[f32; 3]>,
    pub std:             Option<[f32; 3]>,
    /// Loader shuffle seed; random when unset.
    pub seed:            Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_manifest:  "data/train.csv".to_string(),
            test_manifest:   "data/test.csv".to_string(),
            checkpoint_path: "models/checkpoints/checkpoint".to_string(),
            num_epochs:      25,
            batch_size:      32,
            learning_rate:   1e-3,
            momentum:        0.9,
            step_size:       7,
            gamma:           0.1,
            num_workers:     0,
            image_size:      224,
            depth:           152,
            pretrained:      None,
            resume:          false,
            cpu:             false,
            row_limit:       Some(DEFAULT_ROW_LIMIT),
            mean:            None,
            std:             None,
            seed:            None,
        }
    }
}

impl TrainConfig {
    pub fn normalize(&self) -> Normalize {
        let imagenet = Normalize::imagenet();
        Normalize::new(self.mean.unwrap_or(imagenet.mean), self.std.unwrap_or(imagenet.std))
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Execute the full training pipeline end to end on `device`.
    pub fn execute<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainOutcome<B>> {
        let cfg = &self.config;

        // ── Step 1: Read manifests ────────────────────────────────────────────
        let train_rows = read_manifest(&cfg.train_manifest, cfg.row_limit)
            .with_context(|| format!("Cannot load train manifest '{}'", cfg.train_manifest))?;
        let test_rows = read_manifest(&cfg.test_manifest, cfg.row_limit)
            .with_context(|| format!("Cannot load test manifest '{}'", cfg.test_manifest))?;
        tracing::info!("Loaded {} train rows, {} test rows", train_rows.len(), test_rows.len());

        // ── Step 2: Class count ───────────────────────────────────────────────
        // Both partitions come from one factorization, so the largest
        // label in either gives the head size.
        let classes = num_classes(&train_rows).max(num_classes(&test_rows));
        if classes == 0 {
            return Err(VmmrError::schema(&cfg.train_manifest, "manifest has no rows").into());
        }
        tracing::info!("Training a {}-class head", classes);

        // ── Step 3: Datasets and loaders ──────────────────────────────────────
        let normalize  = cfg.normalize();
        let train_data = ImageDataset::new(train_rows, Transform::training(cfg.image_size, Some(normalize)));
        let val_data   = ImageDataset::new(test_rows, Transform::evaluation(cfg.image_size, Some(normalize)));

        let seed    = cfg.seed.unwrap_or_else(rand::random);
        let loaders = Loaders::<B>::new(train_data, val_data, cfg.batch_size, cfg.num_workers, seed, &device);

        // ── Step 4: Save config next to the checkpoint ────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_path);
        ckpt.save_config(cfg)?;

        // ── Step 5: Pretrained backbone, new head ─────────────────────────────
        let model = create_model::<B>(
            cfg.depth,
            classes,
            cfg.pretrained.as_deref().map(Path::new),
            &device,
        )?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        train_model(model, &loaders, cfg, &ckpt, &device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.train_manifest, "data/train.csv");
        assert_eq!(cfg.checkpoint_path, "models/checkpoints/checkpoint");
        assert_eq!(cfg.row_limit, Some(1200));
        assert_eq!((cfg.step_size, cfg.gamma), (7, 0.1));
    }

    #[test]
    fn test_normalize_falls_back_to_imagenet() {
        let mut cfg = TrainConfig::default();
        assert_eq!(cfg.normalize(), Normalize::imagenet());

        cfg.mean = Some([0.5, 0.5, 0.5]);
        let n = cfg.normalize();
        assert_eq!(n.mean, [0.5, 0.5, 0.5]);
        assert_eq!(n.std, Normalize::imagenet().std);
    }

    #[test]
    fn test_missing_manifest_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            train_manifest:  tmp.path().join("absent.csv").to_string_lossy().into_owned(),
            checkpoint_path: tmp.path().join("ckpt").to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg)
            .execute::<burn::backend::Autodiff<burn::backend::NdArray>>(Default::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("absent.csv"));
    }
}
