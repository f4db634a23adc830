// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Batched probability prediction, used by the validation-AUC
// callback during training and by the results writer afterwards.

use anyhow::Result;
use burn::prelude::*;

use crate::data::batcher::SequenceBatcher;
use crate::domain::traits::FoldPredictor;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{BiGruClassifier, ClassifierConfig};

/// Score `sequences` in batches of `batch_size`.
/// Returns one row of per-class probabilities per sequence.
pub fn predict_probabilities<B: Backend>(
    model:      &BiGruClassifier<B>,
    sequences:  &[Vec<u32>],
    batch_size: usize,
    device:     &B::Device,
) -> Result<Vec<Vec<f32>>> {
    let batcher = SequenceBatcher::<B>::new(device.clone());
    let mut rows = Vec::with_capacity(sequences.len());

    for chunk in sequences.chunks(batch_size.max(1)) {
        let probs = model.forward_classification(batcher.tokens(chunk));
        let [_, num_classes] = probs.dims();

        let flat: Vec<f32> = probs
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Cannot read predictions: {e:?}"))?;

        rows.extend(flat.chunks(num_classes).map(<[f32]>::to_vec));
    }

    Ok(rows)
}

/// Loads fold checkpoints into a freshly built model and scores with it.
pub struct CheckpointPredictor<'a, B: Backend> {
    config:      ClassifierConfig,
    checkpoints: &'a CheckpointManager,
    device:      B::Device,
    batch_size:  usize,
}

impl<'a, B: Backend> CheckpointPredictor<'a, B> {
    pub fn new(
        config:      ClassifierConfig,
        checkpoints: &'a CheckpointManager,
        device:      B::Device,
        batch_size:  usize,
    ) -> Self {
        Self { config, checkpoints, device, batch_size }
    }
}

impl<B: Backend> FoldPredictor for CheckpointPredictor<'_, B> {
    fn predict_fold(&self, fold: usize, sequences: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
        let model: BiGruClassifier<B> = self.config.init(&self.device)?;
        let model = self.checkpoints.load_fold(model, fold, &self.device)?;
        predict_probabilities(&model, sequences, self.batch_size, &self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn one_row_per_sequence_across_partial_batches() {
        let device = Default::default();
        let model: BiGruClassifier<TestBackend> = ClassifierConfig::new(8, 3, 4, 2)
            .with_hidden_size(4)
            .init(&device)
            .unwrap();

        let sequences: Vec<Vec<u32>> = (0..5).map(|i| vec![0, 1, i, 7]).collect();
        let rows = predict_probabilities(&model, &sequences, 2, &device).unwrap();

        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.len() == 2));
        assert!(rows.iter().flatten().all(|p| (0.0..=1.0).contains(p)));
    }
}
