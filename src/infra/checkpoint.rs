// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists the training state at ONE fixed path, overwritten
// after every epoch.
//
// What gets saved per checkpoint:
//   1. Model weights (model.mpk.gz)     — the best-so-far snapshot
//   2. Optimizer state (optimizer.mpk.gz)
//   3. state.json                       — epoch, loss, accuracy
//
// The weights are the best snapshot while loss/accuracy are
// the most recent validation numbers, so the two can describe
// different epochs.
//
// Layout:
//   models/checkpoints/checkpoint/
//     model.mpk.gz
//     optimizer.mpk.gz
//     state.json
//     train_config.json   ← written once, before training
//
// Records go through Burn's NamedMpkGzFileRecorder at full
// precision (CompactRecorder would round weights to f16):
//   - Serialises records to MessagePack format
//   - Compresses with gzip
//   - Type-safe: loading fails if architecture doesn't match
//
// Loading is all-or-nothing: a missing file or mismatched
// record is an error, never a fresh start.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::VmmrError;

/// Gzipped MessagePack at full precision, so a reload is weight-for-weight.
type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const MODEL_FILE:     &str = "model";
const OPTIMIZER_FILE: &str = "optimizer";
const RECORD_EXT:     &str = "mpk.gz";
const STATE_FILE:     &str = "state.json";
const CONFIG_FILE:    &str = "train_config.json";

/// Scalar fields stored alongside the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Epochs completed by the run that wrote this checkpoint.
    pub epoch:    usize,
    /// Most recent validation loss.
    pub loss:     f64,
    /// Most recent validation accuracy.
    pub accuracy: f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{RECORD_EXT}"))
    }

    /// Overwrite the checkpoint with `model`, `optim` and `state`.
    pub fn save<B, M, O>(&self, state: &CheckpointState, model: &M, optim: &O) -> Result<()>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        fs::create_dir_all(&self.dir)
            .map_err(|e| VmmrError::fs(&self.dir, e))?;

        let recorder = CheckpointRecorder::new();
        Recorder::<B>::record(&recorder, model.clone().into_record(), self.dir.join(MODEL_FILE))
            .with_context(|| format!("Failed to save model weights to '{}'", self.dir.display()))?;
        Recorder::<B>::record(&recorder, optim.to_record(), self.dir.join(OPTIMIZER_FILE))
            .with_context(|| format!("Failed to save optimizer state to '{}'", self.dir.display()))?;

        let state_path = self.dir.join(STATE_FILE);
        fs::write(&state_path, serde_json::to_string_pretty(state)?)
            .map_err(|e| VmmrError::fs(&state_path, e))?;

        tracing::debug!("Saved checkpoint: epoch {} to '{}'", state.epoch, self.dir.display());
        Ok(())
    }

    /// Restore model and optimizer from the checkpoint.
    /// `model` and `optim` must have the architecture that was saved.
    pub fn load<B, M, O>(
        &self,
        model:  M,
        optim:  O,
        device: &B::Device,
    ) -> Result<(CheckpointState, M, O)>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let state = self.load_state()?;

        let recorder = CheckpointRecorder::new();

        let model_path = self.record_path(MODEL_FILE);
        if !model_path.exists() {
            return Err(VmmrError::fs(&model_path, "checkpoint model weights missing").into());
        }
        let record = Recorder::<B>::load(&recorder, self.dir.join(MODEL_FILE), device)
            .map_err(|e| VmmrError::schema(model_path.display().to_string(), e.to_string()))?;
        let model = model.load_record(record);

        let optim_path = self.record_path(OPTIMIZER_FILE);
        if !optim_path.exists() {
            return Err(VmmrError::fs(&optim_path, "checkpoint optimizer state missing").into());
        }
        let record = Recorder::<B>::load(&recorder, self.dir.join(OPTIMIZER_FILE), device)
            .map_err(|e| VmmrError::schema(optim_path.display().to_string(), e.to_string()))?;
        let optim = optim.load_record(record);

        tracing::info!("Loaded checkpoint from '{}' (epoch {})", self.dir.display(), state.epoch);
        Ok((state, model, optim))
    }

    /// Read only the scalar fields.
    pub fn load_state(&self) -> Result<CheckpointState> {
        let path = self.dir.join(STATE_FILE);
        let json = fs::read_to_string(&path).map_err(|e| VmmrError::fs(&path, e))?;
        let state = serde_json::from_str(&json)
            .map_err(|e| VmmrError::schema(path.display().to_string(), e.to_string()))?;
        Ok(state)
    }

    /// Save the training configuration next to the checkpoint.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| VmmrError::fs(&self.dir, e))?;
        let path = self.dir.join(CONFIG_FILE);

        // serde_json::to_string_pretty adds indentation for readability
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        nn::{Linear, LinearConfig},
        optim::{momentum::MomentumConfig, GradientsParams, SgdConfig},
        prelude::*,
    };

    type TestBackend = Autodiff<NdArray>;

    fn weights(model: &Linear<TestBackend>) -> Vec<f32> {
        model.weight.val().into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_round_trip_restores_state_and_weights() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(tmp.path().join("checkpoint"));

        let model: Linear<TestBackend> = LinearConfig::new(4, 3).init(&device);
        let mut optim = SgdConfig::new()
            .with_momentum(Some(MomentumConfig::new().with_momentum(0.9)))
            .init::<TestBackend, Linear<TestBackend>>();

        // One step so the optimizer has momentum state to save
        let x     = Tensor::<TestBackend, 2>::ones([2, 4], &device);
        let loss  = model.forward(x).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let model = optim.step(0.1, model, grads);

        let state = CheckpointState { epoch: 3, loss: 0.75, accuracy: 0.625 };
        ckpt.save::<TestBackend, _, _>(&state, &model, &optim).unwrap();
        assert!(ckpt.dir().join(STATE_FILE).exists());

        let fresh: Linear<TestBackend> = LinearConfig::new(4, 3).init(&device);
        let fresh_optim = SgdConfig::new()
            .with_momentum(Some(MomentumConfig::new().with_momentum(0.9)))
            .init::<TestBackend, Linear<TestBackend>>();
        assert_ne!(weights(&fresh), weights(&model));

        let (loaded_state, loaded, mut loaded_optim) =
            ckpt.load::<TestBackend, _, _>(fresh, fresh_optim, &device).unwrap();
        assert_eq!(loaded_state, state);
        assert_eq!(weights(&loaded), weights(&model));

        // Same weights, same gradient: the restored momentum must
        // produce the same update as the optimizer that was saved.
        let x = Tensor::<TestBackend, 2>::ones([2, 4], &device);

        let grads          = GradientsParams::from_grads(model.forward(x.clone()).sum().backward(), &model);
        let after_original = optim.step(0.1, model.clone(), grads);

        let grads          = GradientsParams::from_grads(loaded.forward(x.clone()).sum().backward(), &loaded);
        let after_restored = loaded_optim.step(0.1, loaded, grads);
        assert_eq!(weights(&after_restored), weights(&after_original));

        // Without the saved momentum the update differs
        let mut blank_optim = SgdConfig::new()
            .with_momentum(Some(MomentumConfig::new().with_momentum(0.9)))
            .init::<TestBackend, Linear<TestBackend>>();
        let grads       = GradientsParams::from_grads(model.forward(x).sum().backward(), &model);
        let after_blank = blank_optim.step(0.1, model, grads);
        assert_ne!(weights(&after_blank), weights(&after_original));
    }

    #[test]
    fn test_save_overwrites_previous_epoch() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(tmp.path().join("checkpoint"));
        let model: Linear<TestBackend> = LinearConfig::new(2, 2).init(&device);
        let optim = SgdConfig::new().init::<TestBackend, Linear<TestBackend>>();

        for epoch in 1..=3 {
            let state = CheckpointState { epoch, loss: 1.0 / epoch as f64, accuracy: 0.1 * epoch as f64 };
            ckpt.save::<TestBackend, _, _>(&state, &model, &optim).unwrap();
        }
        assert_eq!(ckpt.load_state().unwrap().epoch, 3);
    }

    #[test]
    fn test_missing_checkpoint_is_fatal() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(tmp.path().join("nothing_here"));
        let model: Linear<TestBackend> = LinearConfig::new(2, 2).init(&device);
        let optim = SgdConfig::new().init::<TestBackend, Linear<TestBackend>>();

        let err = match ckpt.load::<TestBackend, _, _>(model, optim, &device) {
            Ok(_)    => panic!("loading a missing checkpoint must fail"),
            Err(err) => err,
        };
        assert!(matches!(err.downcast_ref::<VmmrError>(), Some(VmmrError::FileSystem { .. })));
    }

    #[test]
    fn test_state_missing_field_is_schema_error() {
        let tmp  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());
        fs::write(tmp.path().join(STATE_FILE), r#"{"epoch": 2, "loss": 0.5}"#).unwrap();

        let err = ckpt.load_state().unwrap_err();
        assert!(matches!(err.downcast_ref::<VmmrError>(), Some(VmmrError::Schema { .. })));
    }

    #[test]
    fn test_config_round_trip() {
        let tmp  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());
        let cfg  = TrainConfig::default();
        ckpt.save_config(&cfg).unwrap();
        let json   = fs::read_to_string(tmp.path().join(CONFIG_FILE)).unwrap();
        let loaded: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.num_epochs, cfg.num_epochs);
        assert_eq!(loaded.train_manifest, cfg.train_manifest);
    }
}
