// ============================================================
// Layer 3 — Core Traits
// ============================================================
// The results writer only needs "something that can score the
// test set with the model of fold i". Keeping that behind a trait
// lets the fold-averaging logic run without a trained network.

use anyhow::Result;

/// Produces per-class probabilities from the model saved for one fold.
pub trait FoldPredictor {
    /// Score every sequence with the checkpoint of `fold`.
    /// Returns one row of `num_classes` probabilities per sequence.
    fn predict_fold(&self, fold: usize, sequences: &[Vec<u32>]) -> Result<Vec<Vec<f32>>>;
}
