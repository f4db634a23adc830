// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per fold and epoch, so learning curves of
// every fold can be plotted after a run.
//
// Output file: checkpoints/metrics.csv
//
//   fold,epoch,train_loss,val_loss,val_auc,learning_rate
//   0,1,0.312400,0.201100,0.912345,0.001
//   0,2,0.190000,0.188000,,0.001       ← AUC skipped this epoch
//
// The header is written once; later runs append below it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use crate::ml::callbacks::EpochState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub fold:          usize,
    pub epoch:         usize,
    pub train_loss:    f64,
    pub val_loss:      f64,
    pub val_auc:       Option<f64>,
    pub learning_rate: f64,
}

impl From<&EpochState> for EpochMetrics {
    fn from(s: &EpochState) -> Self {
        Self {
            fold:          s.fold,
            epoch:         s.epoch,
            train_loss:    s.train_loss,
            val_loss:      s.val_loss,
            val_auc:       s.val_auc,
            learning_rate: s.learning_rate,
        }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut w = csv::Writer::from_path(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            w.write_record(["fold", "epoch", "train_loss", "val_loss", "val_auc", "learning_rate"])?;
            w.flush()?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        w.serialize(m)?;
        w.flush()?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
