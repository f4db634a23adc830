// ============================================================
// Layer 2 — ResultsUseCase
// ============================================================
// Scores the test set with every fold checkpoint and writes the
// elementwise mean into the submission template:
//
//   Step 1: Rebuild the architecture        (Layer 6 - infra)
//   Step 2: Tokenise the test CSV           (Layer 4 - data)
//   Step 3: Match template columns by name  (Layer 4 - data)
//   Step 4: Predict with each fold, average (Layer 5 - ml)
//   Step 5: Write the submission            (Layer 4 - data)
//
// The test text is padded to the sequence length saved with the
// checkpoints, not the one on the command line.

use anyhow::Result;
use burn::prelude::*;
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::application::train_use_case::PipelineConfig;
use crate::data::{
    loader::{load_test_data, CsvLoader},
    submission::SubmissionTemplate,
};
use crate::domain::{error::DataError, traits::FoldPredictor};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{inferencer::CheckpointPredictor, model::BATCH_SIZE};

/// Arithmetic mean of the `folds` per-fold predictions.
pub fn combine_fold_predictions<P: FoldPredictor + ?Sized>(
    predictor: &P,
    sequences: &[Vec<u32>],
    folds:     usize,
) -> Result<Vec<Vec<f32>>> {
    anyhow::ensure!(folds > 0, "cannot average predictions over zero folds");

    let mut sums: Option<Vec<Vec<f32>>> = None;
    for fold in 0..folds {
        tracing::info!("Predicting test set with fold {}/{}", fold + 1, folds);
        let predictions = predictor.predict_fold(fold, sequences)?;

        if predictions.len() != sequences.len() {
            return Err(DataError::RowCountMismatch {
                template: sequences.len(),
                test:     predictions.len(),
            }
            .into());
        }

        match sums.as_mut() {
            None => sums = Some(predictions),
            Some(acc) => {
                for (row, pred) in acc.iter_mut().zip(&predictions) {
                    anyhow::ensure!(
                        row.len() == pred.len(),
                        "fold {} predicted {} classes, expected {}",
                        fold,
                        pred.len(),
                        row.len()
                    );
                    for (a, p) in row.iter_mut().zip(pred) {
                        *a += p;
                    }
                }
            }
        }
    }

    let scale = folds as f32;
    Ok(sums
        .unwrap_or_default()
        .into_iter()
        .map(|row| row.into_iter().map(|v| v / scale).collect())
        .collect())
}

pub struct ResultsUseCase<'a> {
    config: &'a PipelineConfig,
}

impl<'a> ResultsUseCase<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Returns the path of the written submission.
    pub fn execute<B: Backend>(&self, tokenizer: &Tokenizer, device: &B::Device) -> Result<PathBuf> {
        let cfg = self.config;

        // ── Step 1: Architecture ─────────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir, cfg.model_name.as_str())?;
        let model_cfg   = checkpoints.load_config()?;
        let labels      = checkpoints.load_label_columns()?;

        // ── Step 2: Test sequences ───────────────────────────────────────────
        if cfg.sequence_length != model_cfg.sequence_length {
            tracing::warn!(
                "--sequence-length {} ignored; checkpoints were trained with {}",
                cfg.sequence_length,
                model_cfg.sequence_length
            );
        }
        let loader = CsvLoader::new(cfg.csv_schema());
        let test   = load_test_data(&loader, &cfg.test_path, tokenizer, model_cfg.sequence_length)?;

        // ── Step 3: Template ─────────────────────────────────────────────────
        let template = SubmissionTemplate::load(&cfg.submission_path)?;
        if template.row_count() != test.len() {
            return Err(DataError::RowCountMismatch {
                template: template.row_count(),
                test:     test.len(),
            }
            .into());
        }
        let order = template.column_order(&labels)?;
        tracing::info!(
            "Scoring {} test rows over {} folds ({} label columns)",
            test.len(),
            cfg.folds,
            template.label_columns().len()
        );

        // ── Step 4: Fold average ─────────────────────────────────────────────
        let predictor   = CheckpointPredictor::<B>::new(model_cfg, &checkpoints, device.clone(), BATCH_SIZE);
        let predictions = combine_fold_predictions(&predictor, &test, cfg.folds)?;
        let predictions = SubmissionTemplate::arrange(predictions, &order);

        // ── Step 5: Submission ───────────────────────────────────────────────
        template.write(&predictions, &cfg.output_path)?;

        Ok(cfg.output_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fold i predicts the constant (i + 1) / 4 for every class.
    struct ConstantPredictor;

    impl FoldPredictor for ConstantPredictor {
        fn predict_fold(&self, fold: usize, sequences: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
            let p = (fold + 1) as f32 / 4.0;
            Ok(sequences.iter().map(|_| vec![p, 1.0 - p]).collect())
        }
    }

    struct MissingCheckpoint;

    impl FoldPredictor for MissingCheckpoint {
        fn predict_fold(&self, fold: usize, _: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("no checkpoint for fold {fold}")
        }
    }

    #[test]
    fn combined_predictions_are_the_fold_mean() {
        let sequences = vec![vec![0, 1], vec![2, 3], vec![4, 5]];
        let combined  = combine_fold_predictions(&ConstantPredictor, &sequences, 3).unwrap();

        // (0.25 + 0.5 + 0.75) / 3 = 0.5
        assert_eq!(combined.len(), 3);
        for row in &combined {
            assert!((row[0] - 0.5).abs() < 1e-6);
            assert!((row[1] - 0.5).abs() < 1e-6);
            assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn single_fold_is_passed_through() {
        let combined = combine_fold_predictions(&ConstantPredictor, &[vec![1]], 1).unwrap();
        assert_eq!(combined, vec![vec![0.25, 0.75]]);
    }

    #[test]
    fn zero_folds_is_an_error() {
        assert!(combine_fold_predictions(&ConstantPredictor, &[vec![1]], 0).is_err());
    }

    #[test]
    fn predictor_errors_propagate() {
        let err = combine_fold_predictions(&MissingCheckpoint, &[vec![1]], 2).unwrap_err();
        assert!(err.to_string().contains("fold 0"));
    }
}
