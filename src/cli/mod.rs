// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses flags, picks the burn backend and hands a PipelineConfig
// to Layer 2. Usage:
//
//   bigru-kfold [--train <bool>] [--write-results <bool>] [paths …]

pub mod commands;

use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use clap::Parser;
use commands::{BackendKind, PipelineArgs};

use crate::application::pipeline::{Pipeline, PipelineReport};

#[derive(Parser, Debug)]
#[command(
    name = "bigru-kfold",
    version = "0.1.0",
    about = "Train a bidirectional GRU text classifier over k folds, then write fold-averaged test predictions."
)]
pub struct Cli {
    #[command(flatten)]
    pub args: PipelineArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let backend  = self.args.backend;
        let pipeline = Pipeline::new(self.args.into());

        let report = match backend {
            BackendKind::Wgpu => {
                pipeline.run::<Autodiff<Wgpu>>(WgpuDevice::default())?
            }
            BackendKind::Ndarray => {
                pipeline.run::<Autodiff<NdArray>>(NdArrayDevice::default())?
            }
        };

        print_summary(&report);
        Ok(())
    }
}

fn print_summary(report: &PipelineReport) {
    for fold in &report.folds {
        let auc = fold
            .last_val_auc
            .map(|a| format!("{a:.4}"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "Fold {:>2}: {} epoch(s), best val_loss={:.4}, val ROC-AUC={}",
            fold.fold + 1,
            fold.epochs_run,
            fold.best_val_loss,
            auc
        );
    }
    match &report.submission {
        Some(path) => println!("Done. Submission written to {}", path.display()),
        None => println!("Done. {} samples, {} classes.", report.samples, report.classes),
    }
}
