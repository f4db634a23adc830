// ============================================================
// Layer 5 — Validation ROC-AUC
// ============================================================
// Scores the fold's validation split every `interval` epochs and
// reports the macro-averaged ROC-AUC over the label columns.
//
// The score is observational: it is logged and recorded in
// metrics.csv, but early stopping, learning-rate reduction and
// checkpointing all look at val_loss only.
//
// AUC is computed with the Mann–Whitney rank statistic:
//
//   AUC = (Σ ranks of positives − P(P+1)/2) / (P·N)
//
// Tied scores share the average of their ranks, so a column of
// identical predictions scores exactly 0.5.

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;

use crate::data::dataset::SequenceDataset;
use crate::ml::callbacks::{EpochCallback, EpochState, FoldModels, Signal};
use crate::ml::inferencer::predict_probabilities;

/// ROC-AUC of `scores` against binary `labels` (label > 0.5 is positive).
/// `None` when either class is absent.
pub fn roc_auc(scores: &[f32], labels: &[f32]) -> Option<f64> {
    if scores.len() != labels.len() {
        return None;
    }

    let positives = labels.iter().filter(|&&y| y > 0.5).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based average ranks
    let mut ranks = vec![0.0f64; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = avg_rank;
        }
        start = end;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(y, _)| **y > 0.5)
        .map(|(_, &r)| r)
        .sum();

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Mean ROC-AUC over label columns that contain both classes.
pub fn macro_roc_auc(predictions: &[Vec<f32>], targets: &[Vec<f32>]) -> Option<f64> {
    let num_classes = targets.first()?.len();

    let per_class: Vec<f64> = (0..num_classes)
        .filter_map(|c| {
            let scores: Vec<f32> = predictions.iter().map(|row| row[c]).collect();
            let labels: Vec<f32> = targets.iter().map(|row| row[c]).collect();
            roc_auc(&scores, &labels)
        })
        .collect();

    if per_class.is_empty() {
        None
    } else {
        Some(per_class.iter().sum::<f64>() / per_class.len() as f64)
    }
}

pub struct RocAucEvaluation<B: AutodiffBackend> {
    tokens:     Vec<Vec<u32>>,
    targets:    Vec<Vec<f32>>,
    interval:   usize,
    batch_size: usize,
    device:     B::Device,
}

impl<B: AutodiffBackend> RocAucEvaluation<B> {
    pub fn new(validation: &SequenceDataset, interval: usize, batch_size: usize, device: B::Device) -> Self {
        let (tokens, targets) = validation
            .samples()
            .iter()
            .map(|s| (s.tokens.clone(), s.targets.clone()))
            .unzip();

        Self { tokens, targets, interval: interval.max(1), batch_size, device }
    }
}

impl<B: AutodiffBackend> EpochCallback<B> for RocAucEvaluation<B> {
    fn name(&self) -> &'static str { "roc_auc" }

    fn on_epoch_end(&mut self, state: &mut EpochState, models: &FoldModels<'_, B>) -> Result<Signal> {
        if state.epoch % self.interval != 0 {
            return Ok(Signal::Continue);
        }

        let predictions = predict_probabilities(models.valid, &self.tokens, self.batch_size, &self.device)?;
        state.val_auc = macro_roc_auc(&predictions, &self.targets);

        match state.val_auc {
            Some(score) => tracing::info!(
                "Fold {} epoch {}: ROC-AUC {:.6}",
                state.fold + 1,
                state.epoch,
                score
            ),
            None => tracing::warn!(
                "Fold {} epoch {}: ROC-AUC undefined (no label column has both classes)",
                state.fold + 1,
                state.epoch
            ),
        }

        Ok(Signal::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking_scores_one() {
        let auc = roc_auc(&[0.9, 0.8, 0.3, 0.2], &[1.0, 1.0, 0.0, 0.0]).unwrap();
        assert!((auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_ranking_scores_zero() {
        let auc = roc_auc(&[0.1, 0.2, 0.7, 0.9], &[1.0, 1.0, 0.0, 0.0]).unwrap();
        assert!(auc.abs() < 1e-12);
    }

    #[test]
    fn ties_score_one_half() {
        let auc = roc_auc(&[0.5, 0.5, 0.5, 0.5], &[1.0, 0.0, 1.0, 0.0]).unwrap();
        assert!((auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn partial_ranking() {
        // pairs (pos, neg): (0.8,0.6) ok, (0.8,0.9) miss, (0.4,0.6) miss, (0.4,0.9) miss
        let auc = roc_auc(&[0.8, 0.6, 0.4, 0.9], &[1.0, 0.0, 1.0, 0.0]).unwrap();
        assert!((auc - 0.25).abs() < 1e-12);
    }

    #[test]
    fn single_class_is_undefined() {
        assert_eq!(roc_auc(&[0.1, 0.9], &[1.0, 1.0]), None);
    }

    #[test]
    fn macro_average_skips_single_class_columns() {
        let predictions = vec![vec![0.9, 0.1], vec![0.1, 0.2]];
        let targets     = vec![vec![1.0, 0.0], vec![0.0, 0.0]];
        let auc = macro_roc_auc(&predictions, &targets).unwrap();
        assert!((auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn macro_average_of_empty_input_is_undefined() {
        assert_eq!(macro_roc_auc(&[], &[]), None);
    }
}
