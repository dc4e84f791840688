// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Commands:
//   1. `classes`        — count label directories
//   2. `build-manifest` — write train/test CSV manifests
//   3. `mean-std`       — channel statistics for normalisation
//   4. `train`          — fine-tune a pretrained ResNet
//
// The backend is picked here: WGPU by default, NdArray with --cpu.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use clap::Parser;
use commands::{BuildManifestArgs, ClassesArgs, Commands, MeanStdArgs, TrainArgs};

use crate::application::{
    preprocess_use_case::DatasetPreprocessing,
    train_use_case::{TrainConfig, TrainUseCase},
};

type GpuBackend = Autodiff<Wgpu>;
type CpuBackend = Autodiff<NdArray>;

#[derive(Parser, Debug)]
#[command(
    name = "vmmr-train",
    version = "0.1.0",
    about = "Build vehicle make/model manifests and fine-tune a ResNet classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Classes(args)       => run_classes(args),
            Commands::BuildManifest(args) => run_build_manifest(args),
            Commands::MeanStd(args)       => run_mean_std(args),
            Commands::Train(args)         => run_train(args),
        }
    }
}

fn run_classes(args: ClassesArgs) -> Result<()> {
    let pre     = DatasetPreprocessing::new(args.into());
    let classes = pre.count_classes()?;
    for name in &classes {
        tracing::debug!("class: {}", name);
    }
    Ok(())
}

fn run_build_manifest(args: BuildManifestArgs) -> Result<()> {
    tracing::info!("Building manifests from: {}", args.dataset_root);
    let pre   = DatasetPreprocessing::new(args.into());
    let split = pre.build_manifest()?;
    println!(
        "Wrote {} train and {} test rows across {} classes.",
        split.train.len(), split.test.len(), split.num_classes,
    );
    Ok(())
}

fn run_mean_std(args: MeanStdArgs) -> Result<()> {
    let cpu = args.cpu;
    let pre = DatasetPreprocessing::new(args.into());
    let manifest = pre.train_manifest_path();
    if cpu {
        pre.compute_mean_std::<NdArray>(&manifest, &NdArrayDevice::default())?;
    } else {
        let device = WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        pre.compute_mean_std::<Wgpu>(&manifest, &device)?;
    }
    Ok(())
}

/// Converts CLI args into a TrainConfig and hands off to Layer 2.
fn run_train(args: TrainArgs) -> Result<()> {
    let config: TrainConfig = args.into();
    tracing::info!("Starting training on manifest: {}", config.train_manifest);

    let use_case = TrainUseCase::new(config);
    let best_accuracy = if use_case.config().cpu {
        use_case.execute::<CpuBackend>(NdArrayDevice::default())?.best_accuracy
    } else {
        let device = WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        use_case.execute::<GpuBackend>(device)?.best_accuracy
    };

    println!(
        "Training complete. Best weights (val accuracy {:.4}) saved to {}",
        best_accuracy, use_case.config().checkpoint_path,
    );
    Ok(())
}
