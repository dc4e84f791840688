// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fine-tunes the ResNet with SGD + momentum and a step-decay
// learning rate, one train phase and one val phase per epoch.
//
//   Initializing ─► TrainPhase ─► ValPhase ─► Checkpointing ─┐
//        ▲                                                   │
//        └──────────── next epoch ◄──────────────────────────┘
//                                  └► Finalizing (last epoch)
//
// Key Burn insight:
//   - Training uses B (Autodiff<..>) so BatchNorm uses batch
//     statistics and gradients are tracked
//   - model.valid() returns the model on B::InnerBackend:
//     BatchNorm switches to running statistics, no autograd
//   - Validation batcher must also use B::InnerBackend
//   - argmax(1) returns [batch,1] so we flatten before .equal()
//
// Epoch loss is Σ(batch mean loss × batch size) / dataset size,
// accuracy is Σ correct / dataset size.
//
// Reference: Burn Book §5, torchvision transfer-learning recipe

use std::{sync::Arc, time::Instant};

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{BatchResult, ImageBatcher},
    dataset::ImageDataset,
};
use crate::domain::error::VmmrError;
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointState},
    metrics::{EpochMetrics, LossHistory, MetricsLogger},
    plot::plot_loss_curves,
};
use crate::ml::{model::ResNet, scheduler::StepLr};

/// File name of the loss plot, written next to the checkpoint.
pub const LOSS_PLOT_FILE: &str = "loss_curve.svg";

// ─── Data loaders ─────────────────────────────────────────────────────────────

/// Train loader on the autodiff backend, val loader on its inner
/// backend, plus the dataset sizes the epoch metrics divide by.
pub struct Loaders<B: AutodiffBackend> {
    pub train:      Arc<dyn DataLoader<BatchResult<B>>>,
    pub val:        Arc<dyn DataLoader<BatchResult<B::InnerBackend>>>,
    pub train_size: usize,
    pub val_size:   usize,
}

impl<B: AutodiffBackend> Loaders<B> {
    /// Both loaders shuffle. `num_workers == 0` keeps loading on
    /// the training thread.
    pub fn new(
        train:       ImageDataset,
        val:         ImageDataset,
        batch_size:  usize,
        num_workers: usize,
        seed:        u64,
        device:      &B::Device,
    ) -> Self {
        let train_size = train.records().len();
        let val_size   = val.records().len();
        Self {
            train: build_loader::<B>(train, batch_size, num_workers, seed, device.clone()),
            val:   build_loader::<B::InnerBackend>(val, batch_size, num_workers, seed, device.clone()),
            train_size,
            val_size,
        }
    }
}

fn build_loader<BB: Backend>(
    dataset:     ImageDataset,
    batch_size:  usize,
    num_workers: usize,
    seed:        u64,
    device:      BB::Device,
) -> Arc<dyn DataLoader<BatchResult<BB>>> {
    let mut builder = DataLoaderBuilder::new(ImageBatcher::<BB>::new(device))
        .batch_size(batch_size.max(1))
        .shuffle(seed);
    if num_workers > 0 {
        builder = builder.num_workers(num_workers);
    }
    builder.build(dataset)
}

// ─── Best-weights snapshot ────────────────────────────────────────────────────

/// In-memory copy of the model with the best validation accuracy
/// seen so far. Starts at accuracy 0.0 with the initial weights.
#[derive(Debug, Clone)]
pub struct BestWeights<M> {
    model:    M,
    accuracy: f64,
    epoch:    Option<usize>,
}

impl<M: Clone> BestWeights<M> {
    pub fn new(model: M) -> Self {
        Self { model, accuracy: 0.0, epoch: None }
    }

    /// Replace the snapshot when `accuracy` is strictly greater than
    /// the best so far. Ties keep the earlier weights.
    pub fn observe(&mut self, epoch: usize, accuracy: f64, model: &M) -> bool {
        if accuracy > self.accuracy {
            self.model    = model.clone();
            self.accuracy = accuracy;
            self.epoch    = Some(epoch);
            true
        } else {
            false
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn epoch(&self) -> Option<usize> {
        self.epoch
    }

    pub fn into_model(self) -> M {
        self.model
    }
}

/// Epochs left to run after resuming from a checkpoint written at
/// `checkpoint_epoch`. The checkpoint stores the 0-based index of the
/// epoch that wrote it, so a finished 3-epoch run stores 2 and a
/// resume with 10 configured epochs runs 8 more.
pub fn remaining_epochs(num_epochs: usize, checkpoint_epoch: usize) -> usize {
    num_epochs.saturating_sub(checkpoint_epoch)
}

/// Number of rows whose argmax matches the label.
pub fn correct_count<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns shape [batch, 1] — squeeze to [batch]
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted.equal(labels).int().sum().into_scalar().elem::<i64>() as usize
}

// ─── Phase bookkeeping ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseMetrics {
    pub loss:     f64,
    pub accuracy: f64,
}

#[derive(Debug, Default)]
struct PhaseTotals {
    loss_sum: f64,
    correct:  usize,
}

impl PhaseTotals {
    fn add(&mut self, batch_loss: f64, batch_len: usize, correct: usize) {
        self.loss_sum += batch_loss * batch_len as f64;
        self.correct  += correct;
    }

    fn finish(&self, dataset_size: usize) -> PhaseMetrics {
        let n = dataset_size as f64;
        PhaseMetrics { loss: self.loss_sum / n, accuracy: self.correct as f64 / n }
    }
}

/// What a finished run hands back.
pub struct TrainOutcome<B: AutodiffBackend> {
    /// Weights of the best validation epoch.
    pub model:         ResNet<B>,
    pub history:       LossHistory,
    pub best_accuracy: f64,
    pub epochs_run:    usize,
}

// ─── Training loop ────────────────────────────────────────────────────────────

pub fn train_model<B: AutodiffBackend>(
    model:   ResNet<B>,
    loaders: &Loaders<B>,
    cfg:     &TrainConfig,
    ckpt:    &CheckpointManager,
    device:  &B::Device,
) -> Result<TrainOutcome<B>> {
    if loaders.train_size == 0 || loaders.val_size == 0 {
        return Err(VmmrError::schema(
            "manifest",
            format!("empty dataset (train {}, val {})", loaders.train_size, loaders.val_size),
        )
        .into());
    }

    let since = Instant::now();

    // ── Initializing ──────────────────────────────────────────────────────────
    // SGD with classic (undampened) momentum
    let optim_cfg = SgdConfig::new().with_momentum(Some(
        MomentumConfig::new().with_momentum(cfg.momentum).with_dampening(0.0),
    ));
    let mut optim     = optim_cfg.init::<B, ResNet<B>>();
    let mut scheduler = StepLr::new(cfg.learning_rate, cfg.step_size, cfg.gamma);
    let mut model     = model;

    // Snapshot taken before any checkpoint restore
    let mut best = BestWeights::new(model.clone());

    let mut num_epochs = cfg.num_epochs;
    if cfg.resume {
        let (state, restored_model, restored_optim) =
            ckpt.load::<B, _, _>(model, optim, device)?;
        model      = restored_model;
        optim      = restored_optim;
        num_epochs = remaining_epochs(cfg.num_epochs, state.epoch);
        tracing::info!(
            "Resumed from epoch {}, running {} more epoch(s)",
            state.epoch, num_epochs,
        );
    }

    let criterion       = CrossEntropyLossConfig::new().init::<B>(device);
    let valid_criterion = CrossEntropyLossConfig::new().init::<B::InnerBackend>(device);
    let metrics_logger  = MetricsLogger::new(ckpt.dir())?;
    let mut history     = LossHistory::new();

    for epoch in 0..num_epochs {
        let shown = epoch + 1;
        println!("Epoch {} / {}", shown, num_epochs);
        println!("{}", "-".repeat(10));

        // ── Training phase ────────────────────────────────────────────────────
        let lr         = scheduler.current();
        let mut totals = PhaseTotals::default();

        for batch in loaders.train.iter() {
            let batch  = batch?;
            let n      = batch.len();
            let logits = model.forward(batch.images);
            let loss   = criterion.forward(logits.clone(), batch.labels.clone());

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            totals.add(loss_val, n, correct_count(logits, batch.labels));

            // Backward pass + SGD update
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);
        }
        scheduler.step();

        let train = totals.finish(loaders.train_size);
        println!("Phase train Loss: {:.4}, Acc: {:.4}", train.loss, train.accuracy);

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → ResNet<B::InnerBackend>, running BN statistics
        let model_valid = model.valid();
        let mut totals  = PhaseTotals::default();

        for batch in loaders.val.iter() {
            let batch  = batch?;
            let n      = batch.len();
            let logits = model_valid.forward(batch.images);
            let loss   = valid_criterion.forward(logits.clone(), batch.labels.clone());

            let loss_val: f64 = loss.into_scalar().elem::<f64>();
            totals.add(loss_val, n, correct_count(logits, batch.labels));
        }

        let val = totals.finish(loaders.val_size);
        println!("Phase val Loss: {:.4}, Acc: {:.4}", val.loss, val.accuracy);

        if best.observe(shown, val.accuracy, &model) {
            tracing::info!("New best val accuracy {:.4} at epoch {}", val.accuracy, shown);
        }

        let metrics = EpochMetrics::new(shown, train.loss, val.loss, train.accuracy, val.accuracy);
        metrics_logger.log(&metrics)?;
        history.push(metrics);

        // ── Checkpointing ─────────────────────────────────────────────────────
        // Best weights, but the most recent val loss/accuracy.
        // `epoch` is the 0-based loop index.
        let state = CheckpointState { epoch, loss: val.loss, accuracy: val.accuracy };
        ckpt.save::<B, _, _>(&state, best.model(), &optim)?;
        println!("-------Saved Checkpoint---------\n\n");
    }

    // ── Finalizing ────────────────────────────────────────────────────────────
    let elapsed = since.elapsed().as_secs();
    println!("Training complete in {}m {}s", elapsed / 60, elapsed % 60);
    println!("Best val accuracy: {}", best.accuracy());

    let plot_path = ckpt.dir().join(LOSS_PLOT_FILE);
    plot_loss_curves(&plot_path, &history)?;
    if !history.is_empty() {
        println!("Loss curve written to {}", plot_path.display());
    }

    Ok(TrainOutcome {
        best_accuracy: best.accuracy(),
        model:         best.into_model(),
        epochs_run:    history.len(),
        history,
    })
}
