use serde::{Deserialize, Serialize};

/// One row of the training set after tokenisation.
///
/// `tokens` always has exactly the configured sequence length
/// (pre-padded with 0). `targets` holds one value per label column,
/// normally 0.0 or 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSequence {
    pub tokens:  Vec<u32>,
    pub targets: Vec<f32>,
}

impl LabeledSequence {
    pub fn new(tokens: Vec<u32>, targets: Vec<f32>) -> Self {
        Self { tokens, targets }
    }

    pub fn num_classes(&self) -> usize {
        self.targets.len()
    }
}
