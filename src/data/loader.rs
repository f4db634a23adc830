// ============================================================
// Layer 4 — CSV Dataset Loader
// ============================================================
// Reads the labelled training CSV and the unlabelled test CSV,
// then turns text into fixed-length token id sequences.
//
// Training file layout (header required):
//   id,comment_text,label_a,label_b,...
//
//   - the text column is found by name
//   - the id column, when present, is ignored
//   - every other column is a numeric label
//
// `load_data_folds` is the single entry point the training
// pipeline calls: it returns the tokenised dataset, the k folds,
// the vocabulary, the class count and the fitted tokenizer.

use anyhow::{Context, Result};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::data::{
    dataset::LabeledDataset,
    preprocessor::{pad_sequence, Preprocessor},
    splitter::k_fold,
};
use crate::domain::{
    error::DataError,
    fold::Fold,
    sample::LabeledSequence,
    vocabulary::{Vocabulary, PAD_ID},
};
use crate::infra::tokenizer_store::{vocabulary_of, TokenizerStore};

/// Column names shared by the train and test files.
#[derive(Debug, Clone)]
pub struct CsvSchema {
    pub text_column: String,
    pub id_column:   String,
}

impl Default for CsvSchema {
    fn default() -> Self {
        Self {
            text_column: "comment_text".to_string(),
            id_column:   "id".to_string(),
        }
    }
}

/// Raw rows of the training file before tokenisation.
#[derive(Debug, Clone)]
pub struct LabeledTexts {
    pub texts:         Vec<String>,
    pub targets:       Vec<Vec<f32>>,
    pub label_columns: Vec<String>,
}

/// Everything `load_data_folds` hands to the rest of the pipeline.
pub struct TrainingData {
    pub dataset:     LabeledDataset,
    pub folds:       Vec<Fold>,
    pub vocabulary:  Vocabulary,
    pub num_classes: usize,
    pub tokenizer:   Tokenizer,
}

pub struct LoadOptions<'a> {
    pub path:            &'a Path,
    pub folds:           usize,
    pub max_features:    usize,
    pub sequence_length: usize,
    pub seed:            u64,
}

pub struct CsvLoader {
    schema:       CsvSchema,
    preprocessor: Preprocessor,
}

impl CsvLoader {
    pub fn new(schema: CsvSchema) -> Self {
        Self { schema, preprocessor: Preprocessor::new() }
    }

    /// Read the labelled CSV. Texts come back already cleaned.
    pub fn load_labeled(&self, path: &Path) -> Result<LabeledTexts> {
        let mut reader = open_csv(path)?;
        let headers = reader
            .headers()
            .with_context(|| format!("Cannot read header of '{}'", path.display()))?
            .clone();

        let text_idx = self.text_index(&headers, path)?;

        let label_idx: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| *name != self.schema.text_column && *name != self.schema.id_column)
            .map(|(i, _)| i)
            .collect();

        if label_idx.is_empty() {
            return Err(DataError::NoLabelColumns {
                path:        path.display().to_string(),
                text_column: self.schema.text_column.clone(),
            }
            .into());
        }

        let label_columns: Vec<String> = label_idx
            .iter()
            .map(|&i| headers[i].to_string())
            .collect();

        let mut texts   = Vec::new();
        let mut targets = Vec::new();

        for (row, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Malformed row {} in '{}'", row + 1, path.display()))?;

            texts.push(self.preprocessor.clean(&record[text_idx]));

            let mut target = Vec::with_capacity(label_idx.len());
            for &i in &label_idx {
                let raw = record[i].trim();
                let value: f32 = raw.parse().map_err(|_| DataError::InvalidLabel {
                    path:   path.display().to_string(),
                    row:    row + 1,
                    column: headers[i].to_string(),
                    value:  raw.to_string(),
                })?;
                target.push(value);
            }
            targets.push(target);
        }

        tracing::debug!(
            "Read {} labelled rows with {} label columns from '{}'",
            texts.len(),
            label_columns.len(),
            path.display()
        );

        Ok(LabeledTexts { texts, targets, label_columns })
    }

    /// Read the text column of an unlabelled CSV, cleaned.
    pub fn load_texts(&self, path: &Path) -> Result<Vec<String>> {
        let mut reader = open_csv(path)?;
        let headers = reader
            .headers()
            .with_context(|| format!("Cannot read header of '{}'", path.display()))?
            .clone();
        let text_idx = self.text_index(&headers, path)?;

        let mut texts = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Malformed row {} in '{}'", row + 1, path.display()))?;
            texts.push(self.preprocessor.clean(&record[text_idx]));
        }
        Ok(texts)
    }

    fn text_index(&self, headers: &csv::StringRecord, path: &Path) -> Result<usize> {
        headers
            .iter()
            .position(|h| h == self.schema.text_column)
            .ok_or_else(|| {
                DataError::MissingColumn {
                    path:   path.display().to_string(),
                    column: self.schema.text_column.clone(),
                }
                .into()
            })
    }
}

/// Tokenise cleaned texts and fit each to `sequence_length` ids.
pub fn encode_texts(
    tokenizer:       &Tokenizer,
    texts:           &[String],
    sequence_length: usize,
) -> Result<Vec<Vec<u32>>> {
    if sequence_length == 0 {
        return Err(DataError::InvalidSequenceLength.into());
    }
    texts
        .iter()
        .map(|text| {
            let enc = tokenizer
                .encode(text.as_str(), false)
                .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
            Ok(pad_sequence(enc.get_ids(), sequence_length, PAD_ID))
        })
        .collect()
}

/// Load the training CSV, fit (or reuse) the tokenizer stored in
/// `tokenizer_store`, and build the k folds.
pub fn load_data_folds(
    loader:          &CsvLoader,
    tokenizer_store: &TokenizerStore,
    opts:            LoadOptions<'_>,
) -> Result<TrainingData> {
    if opts.sequence_length == 0 {
        return Err(DataError::InvalidSequenceLength.into());
    }

    tracing::info!("Loading training data from '{}'", opts.path.display());
    let raw = loader.load_labeled(opts.path)?;

    let tokenizer  = tokenizer_store.load_or_build(&raw.texts, opts.max_features)?;
    let vocabulary = vocabulary_of(&tokenizer);
    let sequences  = encode_texts(&tokenizer, &raw.texts, opts.sequence_length)?;

    let samples: Vec<LabeledSequence> = sequences
        .into_iter()
        .zip(raw.targets)
        .map(|(tokens, targets)| LabeledSequence::new(tokens, targets))
        .collect();

    let folds       = k_fold(samples.len(), opts.folds, opts.seed)?;
    let num_classes = raw.label_columns.len();
    let dataset     = LabeledDataset::new(samples, raw.label_columns);

    Ok(TrainingData { dataset, folds, vocabulary, num_classes, tokenizer })
}

/// Tokenise the unlabelled test CSV with the training tokenizer.
pub fn load_test_data(
    loader:          &CsvLoader,
    path:            &Path,
    tokenizer:       &Tokenizer,
    sequence_length: usize,
) -> Result<Vec<Vec<u32>>> {
    tracing::info!("Loading test data from '{}'", path.display());
    let texts = loader.load_texts(path)?;
    encode_texts(tokenizer, &texts, sequence_length)
}

fn open_csv(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))
}
