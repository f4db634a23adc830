// ============================================================
// Layer 3 — Cross-Validation Fold
// ============================================================
// A fold is a pair of disjoint index sets into the full dataset.
// Across the k folds produced by `data::splitter::k_fold`, the
// validation sets partition 0..n: every row is validated exactly once.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    /// Rows the model is fitted on for this fold
    pub train: Vec<usize>,

    /// Held-out rows used for validation loss, AUC and checkpointing
    pub validation: Vec<usize>,
}

impl Fold {
    pub fn new(train: Vec<usize>, validation: Vec<usize>) -> Self {
        Self { train, validation }
    }
}
