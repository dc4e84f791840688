// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles the cross-cutting persistence concerns of a run:
//
//   checkpoint.rs — Saving and loading training state
//                   Model and optimizer records through Burn's
//                   recorder, plus epoch/loss/accuracy as JSON,
//                   all at one fixed path overwritten per epoch.
//                   Also saves TrainConfig as JSON.
//
//   metrics.rs    — Training metrics logging
//                   Writes epoch-level metrics (loss, accuracy)
//                   to a CSV file and keeps the loss history.
//
//   plot.rs       — Renders the train/val loss curves to SVG.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger and loss history
pub mod metrics;

/// Loss curve rendering
pub mod plot;
