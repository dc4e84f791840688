// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands: `classes`, `build-manifest`,
// `mean-std` and `train`, and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    preprocess_use_case::PreprocessConfig,
    train_use_case::{TrainConfig, DEFAULT_ROW_LIMIT},
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count the label directories under the dataset root
    Classes(ClassesArgs),

    /// Scan the dataset root and write train/test manifests
    BuildManifest(BuildManifestArgs),

    /// Compute per-channel mean and std over a manifest
    MeanStd(MeanStdArgs),

    /// Fine-tune a pretrained ResNet on the manifests
    Train(TrainArgs),
}

#[derive(Args, Debug)]
pub struct ClassesArgs {
    /// Directory with one subdirectory per label
    #[arg(long, default_value = "data/VMMRdb")]
    pub dataset_root: String,
}

impl From<ClassesArgs> for PreprocessConfig {
    fn from(a: ClassesArgs) -> Self {
        PreprocessConfig { dataset_root: a.dataset_root, ..PreprocessConfig::default() }
    }
}

#[derive(Args, Debug)]
pub struct BuildManifestArgs {
    /// Directory with one subdirectory per label
    #[arg(long, default_value = "data/VMMRdb")]
    pub dataset_root: String,

    #[arg(long, default_value = "data/train.csv")]
    pub train_manifest: String,

    #[arg(long, default_value = "data/test.csv")]
    pub test_manifest: String,

    /// Fraction of rows placed in the test manifest
    #[arg(long, default_value_t = 0.2)]
    pub test_split: f64,

    /// Seed for a reproducible split
    #[arg(long)]
    pub seed: Option<u64>,
}

impl From<BuildManifestArgs> for PreprocessConfig {
    fn from(a: BuildManifestArgs) -> Self {
        PreprocessConfig {
            dataset_root:   a.dataset_root,
            train_manifest: a.train_manifest,
            test_manifest:  a.test_manifest,
            test_split:     a.test_split,
            seed:           a.seed,
            ..PreprocessConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct MeanStdArgs {
    /// Manifest to compute statistics over
    #[arg(long, default_value = "data/train.csv")]
    pub manifest: String,

    /// Images are resized to a square of this side first
    #[arg(long, default_value_t = 224)]
    pub image_size: u32,

    #[arg(long, default_value_t = 120)]
    pub batch_size: usize,

    /// Maximum manifest rows to read
    #[arg(long, default_value_t = DEFAULT_ROW_LIMIT)]
    pub row_limit: usize,

    /// Read every manifest row
    #[arg(long)]
    pub all_rows: bool,

    /// Run on the CPU backend instead of the GPU
    #[arg(long)]
    pub cpu: bool,
}

impl From<MeanStdArgs> for PreprocessConfig {
    fn from(a: MeanStdArgs) -> Self {
        PreprocessConfig {
            train_manifest:   a.manifest,
            image_size:       a.image_size,
            stats_batch_size: a.batch_size,
            row_limit:        (!a.all_rows).then_some(a.row_limit),
            ..PreprocessConfig::default()
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[arg(long, default_value = "data/train.csv")]
    pub train_manifest: String,

    /// Manifest evaluated in the validation phase
    #[arg(long, default_value = "data/test.csv")]
    pub test_manifest: String,

    /// Checkpoint location, overwritten every epoch
    #[arg(long, default_value = "models/checkpoints/checkpoint")]
    pub checkpoint_path: String,

    #[arg(long, default_value_t = 25)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// Decay the learning rate every this many epochs
    #[arg(long, default_value_t = 7)]
    pub step_size: usize,

    /// Learning-rate decay factor
    #[arg(long, default_value_t = 0.1)]
    pub gamma: f64,

    /// Background loader threads; 0 loads on the training thread
    #[arg(long, default_value_t = 0)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 224)]
    pub image_size: u32,

    /// ResNet depth: 50, 101 or 152
    #[arg(long, default_value_t = 152)]
    pub depth: usize,

    /// torchvision ResNet weights (.pth) for the backbone
    #[arg(long)]
    pub pretrained: Option<String>,

    /// Continue from the checkpoint at --checkpoint-path
    #[arg(long)]
    pub resume: bool,

    /// Run on the CPU backend instead of the GPU
    #[arg(long)]
    pub cpu: bool,

    /// Maximum manifest rows to read
    #[arg(long, default_value_t = DEFAULT_ROW_LIMIT)]
    pub row_limit: usize,

    /// Read every manifest row
    #[arg(long)]
    pub all_rows: bool,

    /// Channel means for normalisation, e.g. --mean 0.47,0.46,0.45
    #[arg(long, value_parser = parse_channels)]
    pub mean: Option<[f32; 3]>,

    /// Channel standard deviations for normalisation
    #[arg(long, value_parser = parse_channels)]
    pub std: Option<[f32; 3]>,

    /// Loader shuffle seed
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Parse "r,g,b" into one value per channel.
fn parse_channels(s: &str) -> Result<[f32; 3], String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|e| format!("'{v}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    values
        .try_into()
        .map_err(|v: Vec<f32>| format!("expected 3 comma-separated values, got {}", v.len()))
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_manifest:  a.train_manifest,
            test_manifest:   a.test_manifest,
            checkpoint_path: a.checkpoint_path,
            num_epochs:      a.epochs,
            batch_size:      a.batch_size,
            learning_rate:   a.lr,
            momentum:        a.momentum,
            step_size:       a.step_size,
            gamma:           a.gamma,
            num_workers:     a.num_workers,
            image_size:      a.image_size,
            depth:           a.depth,
            pretrained:      a.pretrained,
            resume:          a.resume,
            cpu:             a.cpu,
            row_limit:       (!a.all_rows).then_some(a.row_limit),
            mean:            a.mean,
            std:             a.std,
            seed:            a.seed,
        }
    }
}
