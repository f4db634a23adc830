// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Trains one classifier per fold on the already-loaded data:
//
//   Step 1: Load pretrained embeddings       (Layer 4 - data)
//   Step 2: Build the classifier             (Layer 5 - ml)
//   Step 3: Save architecture + label names  (Layer 6 - infra)
//   Step 4: Open the metrics CSV             (Layer 6 - infra)
//   Step 5: Run the k-fold loop              (Layer 5 - ml)
//
// Each fold gets a fresh callback list, in this order:
//   EarlyStopping → ReduceLrOnPlateau → RocAucEvaluation →
//   ModelCheckpoint → MetricsCallback

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use burn::tensor::backend::AutodiffBackend;

use crate::data::{
    embeddings::load_embedding_matrix,
    loader::{CsvSchema, TrainingData},
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    callbacks::{EarlyStopping, EpochCallback, MetricsCallback, ModelCheckpoint, ReduceLrOnPlateau},
    evaluator::RocAucEvaluation,
    model::{ClassifierConfig, Hyperparameters},
    session::Session,
    trainer::{FoldSummary, FoldTrainer},
};

// ─── Callback settings ───────────────────────────────────────────────────────
const EARLY_STOP_PATIENCE:  usize = 2;
const EARLY_STOP_MIN_DELTA: f64   = 1e-5;
const LR_FACTOR:            f64   = 0.1;
const LR_PATIENCE:          usize = 1;
const LR_THRESHOLD:         f64   = 1e-4;
const MIN_LR:               f64   = 1e-4;

// ─── Pipeline Configuration ──────────────────────────────────────────────────
// Everything a run needs, independent of how it was supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub train_path:      PathBuf,
    pub test_path:       PathBuf,
    pub submission_path: PathBuf,
    pub embedding_path:  PathBuf,
    pub output_path:     PathBuf,
    pub checkpoint_dir:  PathBuf,
    pub model_name:      String,
    pub text_column:     String,
    pub id_column:       String,
    pub folds:           usize,
    pub max_features:    usize,
    pub sequence_length: usize,
    pub embed_dim:       usize,
    pub seed:            u64,
    pub auc_interval:    usize,
    pub train:           bool,
    pub write_results:   bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            train_path:      PathBuf::from("data/train.csv"),
            test_path:       PathBuf::from("data/test.csv"),
            submission_path: PathBuf::from("data/sample_submission.csv"),
            embedding_path:  PathBuf::from("data/embeddings/glove.42B.300d.txt"),
            output_path:     PathBuf::from("output/submission.csv"),
            checkpoint_dir:  PathBuf::from("checkpoints"),
            model_name:      "bigru".to_string(),
            text_column:     "comment_text".to_string(),
            id_column:       "id".to_string(),
            folds:           10,
            max_features:    200_000,
            sequence_length: 150,
            embed_dim:       300,
            seed:            42,
            auc_interval:    1,
            train:           true,
            write_results:   true,
        }
    }
}

impl PipelineConfig {
    pub fn csv_schema(&self) -> CsvSchema {
        CsvSchema {
            text_column: self.text_column.clone(),
            id_column:   self.id_column.clone(),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase<'a, B: AutodiffBackend> {
    config:  &'a PipelineConfig,
    session: &'a Session<B>,
    hyper:   Hyperparameters,
}

impl<'a, B: AutodiffBackend> TrainUseCase<'a, B> {
    pub fn new(config: &'a PipelineConfig, session: &'a Session<B>) -> Self {
        Self { config, session, hyper: Hyperparameters::default() }
    }

    pub fn with_hyperparameters(mut self, hyper: Hyperparameters) -> Self {
        self.hyper = hyper;
        self
    }

    pub fn execute(&self, data: &TrainingData) -> Result<Vec<FoldSummary>> {
        let cfg    = self.config;
        let device = self.session.device();

        // ── Step 1: Pretrained embeddings ────────────────────────────────────
        tracing::info!("Loading embeddings from '{}'", cfg.embedding_path.display());
        let embeddings = load_embedding_matrix(&cfg.embedding_path, &data.vocabulary, cfg.embed_dim)?;

        // ── Step 2: Classifier ───────────────────────────────────────────────
        let model_cfg = ClassifierConfig::new(
            data.vocabulary.len(),
            cfg.embed_dim,
            cfg.sequence_length,
            data.num_classes,
        );
        let model = model_cfg.init_with_embeddings::<B>(&embeddings, device)?;
        tracing::info!(
            "Model ready: vocab={}, embed_dim={}, hidden={}x2, classes={}",
            model_cfg.vocab_size,
            model_cfg.embed_dim,
            model_cfg.hidden_size,
            model_cfg.num_classes
        );

        // ── Step 3: Architecture config for inference ────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir, cfg.model_name.as_str())?;
        checkpoints.save_config(&model_cfg)?;
        checkpoints.save_label_columns(data.dataset.label_columns())?;

        // ── Step 4: Metrics CSV ──────────────────────────────────────────────
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 5: K-fold loop ──────────────────────────────────────────────
        let hyper   = self.hyper;
        let trainer = FoldTrainer::new(self.session, hyper);
        let summaries = trainer.run(model, &data.dataset, &data.folds, |fold, validation| {
            let callbacks: Vec<Box<dyn EpochCallback<B> + '_>> = vec![
                Box::new(EarlyStopping::new(EARLY_STOP_PATIENCE, EARLY_STOP_MIN_DELTA)),
                Box::new(ReduceLrOnPlateau::new(LR_FACTOR, LR_PATIENCE, LR_THRESHOLD, MIN_LR)),
                Box::new(RocAucEvaluation::<B>::new(
                    validation,
                    cfg.auc_interval,
                    hyper.batch_size,
                    device.clone(),
                )),
                Box::new(ModelCheckpoint::new(&checkpoints, fold)),
                Box::new(MetricsCallback::new(&metrics)),
            ];
            Ok(callbacks)
        })?;

        tracing::info!(
            "Training complete: {} fold checkpoint(s) in '{}'",
            summaries.len(),
            checkpoints.dir().display()
        );
        Ok(summaries)
    }
}
