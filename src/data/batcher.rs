// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Implements burn's Batcher trait: stacks N pre-padded samples
// into one [N, seq_len] token tensor and one [N, num_classes]
// float target tensor.
//
// Samples are already padded to the same length by the loader,
// so batching is a flatten + reshape.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::LabeledSequence;

/// A batch ready for the forward pass.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub tokens: Tensor<B, 2, Int>,

    /// Multi-hot targets — shape: [batch_size, num_classes]
    pub targets: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Token tensor for unlabelled sequences (inference path).
    pub fn tokens(&self, sequences: &[Vec<u32>]) -> Tensor<B, 2, Int> {
        let batch_size = sequences.len();
        let seq_len    = sequences.first().map(Vec::len).unwrap_or(0);

        let flat: Vec<i32> = sequences
            .iter()
            .flat_map(|s| s.iter().map(|&id| id as i32))
            .collect();

        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len])
    }
}

impl<B: Backend> Batcher<LabeledSequence, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<LabeledSequence>) -> SequenceBatch<B> {
        let batch_size  = items.len();
        let seq_len     = items[0].tokens.len();
        let num_classes = items[0].num_classes();

        let token_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.tokens.iter().map(|&id| id as i32))
            .collect();

        let target_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.targets.iter().copied())
            .collect();

        let tokens = Tensor::<B, 1, Int>::from_ints(token_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        let targets = Tensor::<B, 1>::from_floats(target_flat.as_slice(), &self.device)
            .reshape([batch_size, num_classes]);

        SequenceBatch { tokens, targets }
    }
}
