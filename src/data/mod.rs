// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from an image directory tree to device tensors.
//
//   root/<label_name>/<image_file>
//       │
//       ▼
//   DirectoryScanner  → one entry per file, label = directory name
//       │
//       ▼
//   factorize + split → labelled train/test manifest rows
//       │
//       ▼
//   manifest_io       → train.csv / test.csv on disk
//       │
//       ▼
//   ImageDataset      → decodes + transforms a row on demand
//       │
//       ▼
//   ImageBatcher      → stacks samples into [N, 3, H, W] batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Walks the class-per-directory dataset layout
pub mod scanner;

/// Shuffles and splits rows into train/test partitions
pub mod splitter;

/// Reads and writes manifest CSV files
pub mod manifest_io;

/// Resize / flip / normalise pipeline for decoded images
pub mod transform;

/// Implements Burn's Dataset trait over manifest rows
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Per-channel mean and std over a manifest
pub mod stats;
