// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// Every flag of a pipeline run. Defaults reproduce the standard
// layout:
//
//   data/train.csv, data/test.csv, data/sample_submission.csv,
//   data/embeddings/glove.42B.300d.txt → checkpoints/, output/

use clap::{ArgAction, Args, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::PipelineConfig;

/// Which burn backend runs the tensors.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// GPU through WGPU
    Wgpu,
    /// CPU ndarray
    Ndarray,
}

#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Train one model per fold
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub train: bool,

    /// Average the fold models over the test set and write the submission
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub write_results: bool,

    /// Labelled training CSV
    #[arg(long, default_value = "data/train.csv")]
    pub train_path: PathBuf,

    /// Unlabelled test CSV
    #[arg(long, default_value = "data/test.csv")]
    pub test_path: PathBuf,

    /// Submission template: id column followed by the label columns
    #[arg(long, default_value = "data/sample_submission.csv")]
    pub submission_path: PathBuf,

    /// Whitespace-separated embedding file (token v1 ... vD per line)
    #[arg(long, default_value = "data/embeddings/glove.42B.300d.txt")]
    pub embedding_path: PathBuf,

    /// Where the averaged predictions are written
    #[arg(long, default_value = "output/submission.csv")]
    pub output_path: PathBuf,

    /// Directory for fold checkpoints, tokenizer, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Prefix of the checkpoint file names
    #[arg(long, default_value = "bigru")]
    pub model_name: String,

    /// Name of the text column in train and test CSVs
    #[arg(long, default_value = "comment_text")]
    pub text_column: String,

    /// Name of the identifier column (ignored for training)
    #[arg(long, default_value = "id")]
    pub id_column: String,

    /// Number of cross-validation folds
    #[arg(long, default_value_t = 10)]
    pub folds: usize,

    /// Vocabulary cap, including the padding and unknown ids
    #[arg(long, default_value_t = 200_000)]
    pub max_features: usize,

    /// Tokens per sequence after padding/truncation
    #[arg(long, default_value_t = 150)]
    pub sequence_length: usize,

    /// Width of the vectors in the embedding file
    #[arg(long, default_value_t = 300)]
    pub embed_dim: usize,

    /// Seed for fold assignment, shuffling and weight init
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Compute validation ROC-AUC every N epochs
    #[arg(long, default_value_t = 1)]
    pub auc_interval: usize,

    #[arg(long, value_enum, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,
}

/// The application layer never sees clap types.
impl From<PipelineArgs> for PipelineConfig {
    fn from(a: PipelineArgs) -> Self {
        PipelineConfig {
            train_path:      a.train_path,
            test_path:       a.test_path,
            submission_path: a.submission_path,
            embedding_path:  a.embedding_path,
            output_path:     a.output_path,
            checkpoint_dir:  a.checkpoint_dir,
            model_name:      a.model_name,
            text_column:     a.text_column,
            id_column:       a.id_column,
            folds:           a.folds,
            max_features:    a.max_features,
            sequence_length: a.sequence_length,
            embed_dim:       a.embed_dim,
            seed:            a.seed,
            auc_interval:    a.auc_interval,
            train:           a.train,
            write_results:   a.write_results,
        }
    }
}
