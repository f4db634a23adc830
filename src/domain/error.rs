// ============================================================
// Layer 3 — Data Errors
// ============================================================
// Schema and shape problems in the input files. I/O failures are
// reported through anyhow context at the call site instead; these
// variants cover the "file was read but its contents are wrong" case.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("{path}: missing required column '{column}'")]
    MissingColumn { path: String, column: String },

    #[error("{path}: no label columns found besides '{text_column}'")]
    NoLabelColumns { path: String, text_column: String },

    #[error("{path}: row {row} column '{column}' is not a number: '{value}'")]
    InvalidLabel {
        path:   String,
        row:    usize,
        column: String,
        value:  String,
    },

    #[error("sequence length must be at least 1")]
    InvalidSequenceLength,

    #[error("cannot split {samples} samples into {folds} folds")]
    InvalidFoldCount { samples: usize, folds: usize },

    #[error("embedding matrix has {actual} values but {rows}x{dim} = {expected} were expected")]
    EmbeddingShape {
        rows:     usize,
        dim:      usize,
        expected: usize,
        actual:   usize,
    },

    #[error("{path}: line {line} has {found} vector values but the embedding dimension is {expected}")]
    EmbeddingWidth {
        path:     String,
        line:     usize,
        expected: usize,
        found:    usize,
    },

    #[error("{path}: no vocabulary token has a vector in this file")]
    NoEmbeddingsFound { path: String },

    #[error("submission template has {template} rows but the test set has {test}")]
    RowCountMismatch { template: usize, test: usize },

    #[error("submission template has {template} label columns but the model predicts {classes}")]
    ClassCountMismatch { template: usize, classes: usize },

    #[error("submission template column '{column}' is not a trained label")]
    UnknownLabelColumn { column: String },
}
