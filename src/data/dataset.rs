use burn::data::dataset::Dataset;

use crate::domain::sample::LabeledSequence;

/// The full tokenised training set plus the names of its label columns.
pub struct LabeledDataset {
    samples:       Vec<LabeledSequence>,
    label_columns: Vec<String>,
}

impl LabeledDataset {
    pub fn new(samples: Vec<LabeledSequence>, label_columns: Vec<String>) -> Self {
        Self { samples, label_columns }
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    pub fn samples(&self) -> &[LabeledSequence] { &self.samples }

    pub fn label_columns(&self) -> &[String] { &self.label_columns }

    /// Copy the rows at `indices` into a burn dataset for one fold split.
    pub fn subset(&self, indices: &[usize]) -> SequenceDataset {
        SequenceDataset::new(indices.iter().map(|&i| self.samples[i].clone()).collect())
    }
}

/// One fold split, exposed to burn's `DataLoader`.
pub struct SequenceDataset {
    samples: Vec<LabeledSequence>,
}

impl SequenceDataset {
    pub fn new(samples: Vec<LabeledSequence>) -> Self { Self { samples } }

    pub fn samples(&self) -> &[LabeledSequence] { &self.samples }
}

impl Dataset<LabeledSequence> for SequenceDataset {
    fn get(&self, index: usize) -> Option<LabeledSequence> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
