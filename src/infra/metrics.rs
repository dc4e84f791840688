// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records per-epoch loss and accuracy for both phases to a CSV
// file so runs can be compared after the fact.
//
// Metrics recorded per epoch:
//   - epoch:      1-based index within the run
//   - train_loss: summed (loss × batch size) / train set size
//   - val_loss:   same for the validation set
//   - train_acc:  correct predictions / train set size
//   - val_acc:    correct predictions / validation set size
//
// Output file: <checkpoint dir>/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_loss,train_acc,val_acc
//   1,3.124500,3.089200,0.123000,0.118000
//   2,2.890100,2.854300,0.184000,0.172000
//
// Reference: csv crate documentation

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    pub val_loss:   f64,
    pub train_acc:  f64,
    pub val_acc:    f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, train_acc: f64, val_acc: f64) -> Self {
        Self { epoch, train_loss, val_loss, train_acc, val_acc }
    }
}

/// Per-epoch metrics of one run, in order.
#[derive(Debug, Clone, Default)]
pub struct LossHistory {
    epochs: Vec<EpochMetrics>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, m: EpochMetrics) {
        self.epochs.push(m);
    }

    pub fn epochs(&self) -> &[EpochMetrics] {
        &self.epochs
    }

    pub fn train_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|m| m.train_loss).collect()
    }

    pub fn val_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|m| m.val_loss).collect()
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}

/// Appends epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory, and the CSV with its header row if the
    /// file is new. Existing files are appended to across runs.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut w = csv::Writer::from_path(&csv_path)?;
            w.write_record(["epoch", "train_loss", "val_loss", "train_acc", "val_acc"])?;
            w.flush()?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.csv_path)?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        w.write_record([
            m.epoch.to_string(),
            format!("{:.6}", m.train_loss),
            format!("{:.6}", m.val_loss),
            format!("{:.6}", m.train_acc),
            format!("{:.6}", m.val_acc),
        ])?;
        w.flush()?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch, m.train_loss, m.val_loss,
        );
        Ok(())
    }

    pub fn log_all(&self, history: &LossHistory) -> Result<()> {
        history.epochs().iter().try_for_each(|m| self.log(m))
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_appends_rows() {
        let tmp    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(tmp.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 1.5, 1.25, 0.25, 0.5)).unwrap();
        logger.log(&EpochMetrics::new(2, 1.0, 1.125, 0.5, 0.75)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "epoch,train_loss,val_loss,train_acc,val_acc");
        assert_eq!(lines[2], "2,1.000000,1.125000,0.500000,0.750000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_history_series() {
        let mut h = LossHistory::new();
        h.push(EpochMetrics::new(1, 3.0, 2.0, 0.1, 0.2));
        h.push(EpochMetrics::new(2, 1.0, 1.5, 0.3, 0.4));
        assert_eq!(h.train_losses(), vec![3.0, 1.0]);
        assert_eq!(h.val_losses(), vec![2.0, 1.5]);
    }
}
