// ============================================================
// Layer 2 — Dataset Preprocessing
// ============================================================
// Offline steps run once before training:
//
//   count_classes     — list label directories under the root
//   build_manifest    — scan, factorize labels, split, write CSVs
//   compute_mean_std  — channel statistics over one manifest
//
// Input tree:  <root>/<label_name>/<image_file>

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::prelude::Backend;
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::DEFAULT_ROW_LIMIT;
use crate::data::{
    dataset::ImageDataset,
    manifest_io::write_manifest,
    scanner::DirectoryScanner,
    splitter::split_train_test,
    stats::{compute_mean_std, ChannelStats},
    transform::Transform,
};
use crate::domain::{
    manifest::{factorize, ManifestRecord},
    traits::ImageSource,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub dataset_root:     String,
    pub train_manifest:   String,
    pub test_manifest:    String,
    /// Fraction of rows placed in the test partition.
    pub test_split:       f64,
    /// Split seed; random when unset.
    pub seed:             Option<u64>,
    pub image_size:       u32,
    pub stats_batch_size: usize,
    pub row_limit:        Option<usize>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            dataset_root:     "data/VMMRdb".to_string(),
            train_manifest:   "data/train.csv".to_string(),
            test_manifest:    "data/test.csv".to_string(),
            test_split:       0.2,
            seed:             None,
            image_size:       224,
            stats_batch_size: 120,
            row_limit:        Some(DEFAULT_ROW_LIMIT),
        }
    }
}

/// Both partitions written by `build_manifest`.
#[derive(Debug, Clone)]
pub struct ManifestSplit {
    pub train:       Vec<ManifestRecord>,
    pub test:        Vec<ManifestRecord>,
    pub num_classes: usize,
}

pub struct DatasetPreprocessing {
    config:  PreprocessConfig,
    scanner: DirectoryScanner,
}

impl DatasetPreprocessing {
    pub fn new(config: PreprocessConfig) -> Self {
        let scanner = DirectoryScanner::new(&config.dataset_root);
        Self { config, scanner }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Names of the immediate subdirectories of the dataset root.
    pub fn count_classes(&self) -> Result<Vec<String>> {
        let classes = self
            .scanner
            .classes()
            .with_context(|| format!("Cannot list classes in '{}'", self.config.dataset_root))?;
        println!("Dataset has {} different classes.", classes.len());
        Ok(classes)
    }

    /// Scan the root, label every file, split and write both manifests.
    pub fn build_manifest(&self) -> Result<ManifestSplit> {
        let cfg = &self.config;

        let entries = self
            .scanner
            .entries()
            .with_context(|| format!("Cannot scan dataset root '{}'", cfg.dataset_root))?;
        tracing::info!("Found {} images under '{}'", entries.len(), cfg.dataset_root);

        let (records, labels) = factorize(entries);
        let (train, test)     = split_train_test(records, cfg.test_split, cfg.seed);

        write_manifest(&cfg.train_manifest, &train)?;
        write_manifest(&cfg.test_manifest, &test)?;
        tracing::info!(
            "Wrote {} train rows to '{}', {} test rows to '{}' ({} classes)",
            train.len(), cfg.train_manifest, test.len(), cfg.test_manifest, labels.len(),
        );

        Ok(ManifestSplit { train, test, num_classes: labels.len() })
    }

    /// Channel mean/std over at most `row_limit` rows of `manifest`.
    pub fn compute_mean_std<B: Backend>(
        &self,
        manifest: impl AsRef<Path>,
        device:   &B::Device,
    ) -> Result<ChannelStats> {
        let cfg      = &self.config;
        let manifest = manifest.as_ref();

        let dataset = ImageDataset::from_manifest(
            manifest,
            cfg.row_limit,
            Transform::evaluation(cfg.image_size, None),
        )
        .with_context(|| format!("Cannot load manifest '{}'", manifest.display()))?;
        tracing::info!("Computing statistics over {} images", dataset.records().len());

        let stats = compute_mean_std::<B>(dataset, cfg.stats_batch_size, device)?;
        println!(
            "The dataset mean is {:?} and the standard deviation: {:?}",
            stats.mean, stats.std,
        );
        Ok(stats)
    }

    pub fn train_manifest_path(&self) -> PathBuf {
        PathBuf::from(&self.config.train_manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{dataset::tests::write_fixture, manifest_io::read_manifest};
    use crate::domain::error::VmmrError;
    use burn::backend::NdArray;
    use std::collections::HashSet;
    use std::fs;

    fn config(root: &Path, out: &Path) -> PreprocessConfig {
        PreprocessConfig {
            dataset_root:   root.to_string_lossy().into_owned(),
            train_manifest: out.join("train.csv").to_string_lossy().into_owned(),
            test_manifest:  out.join("test.csv").to_string_lossy().into_owned(),
            seed:           Some(11),
            image_size:     8,
            ..PreprocessConfig::default()
        }
    }

    #[test]
    fn test_count_classes_lists_directories_only() {
        let tmp  = tempfile::tempdir().unwrap();
        let root = tmp.path().join("cars");
        write_fixture(&root, &["audi_a4_2010", "bmw_x5_2012", "ford_focus_2008"], 1, 4, [0, 0, 0]);
        fs::write(root.join("README.txt"), b"not a class").unwrap();

        let pre     = DatasetPreprocessing::new(config(&root, tmp.path()));
        let classes = pre.count_classes().unwrap();
        assert_eq!(classes.len(), 3);
        assert!(!classes.contains(&"README.txt".to_string()));
    }

    #[test]
    fn test_count_classes_missing_root_is_filesystem_error() {
        let tmp = tempfile::tempdir().unwrap();
        let pre = DatasetPreprocessing::new(config(&tmp.path().join("absent"), tmp.path()));
        let err = pre.count_classes().unwrap_err();
        assert!(matches!(err.downcast_ref::<VmmrError>(), Some(VmmrError::FileSystem { .. })));
    }

    #[test]
    fn test_build_manifest_writes_disjoint_partitions() {
        let tmp  = tempfile::tempdir().unwrap();
        let root = tmp.path().join("cars");
        write_fixture(&root, &["audi", "bmw", "ford"], 4, 4, [10, 20, 30]);
        fs::create_dir_all(root.join("empty_class")).unwrap();

        let out   = tmp.path().join("nested").join("manifests");
        let pre   = DatasetPreprocessing::new(config(&root, &out));
        let split = pre.build_manifest().unwrap();

        // 12 rows, ceil(0.2 * 12) = 3 in test; the empty class adds nothing
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 9);
        assert_eq!(split.num_classes, 3);

        let train = read_manifest(out.join("train.csv"), None).unwrap();
        let test  = read_manifest(out.join("test.csv"), None).unwrap();
        assert_eq!(train.len() + test.len(), 12);

        let train_paths: HashSet<_> = train.iter().map(|r| r.image_path.clone()).collect();
        assert!(test.iter().all(|r| !train_paths.contains(&r.image_path)));

        let labels: HashSet<_> = train.iter().chain(&test).map(|r| r.label).collect();
        assert_eq!(labels, (0..3).collect());
    }

    #[test]
    fn test_compute_mean_std_constant_color() {
        let tmp     = tempfile::tempdir().unwrap();
        let root    = tmp.path().join("cars");
        let records = write_fixture(&root, &["audi", "bmw"], 3, 8, [255, 0, 51]);
        let out     = tmp.path().join("manifests");
        write_manifest(out.join("train.csv"), &records).unwrap();

        let pre   = DatasetPreprocessing::new(config(&root, &out));
        let stats = pre
            .compute_mean_std::<NdArray>(pre.train_manifest_path(), &Default::default())
            .unwrap();

        let expected = [1.0, 0.0, 0.2];
        for c in 0..3 {
            assert!((stats.mean[c] - expected[c]).abs() < 1e-4);
            assert!(stats.std[c].abs() < 1e-4);
        }
    }
}
