// ============================================================
// Layer 2 — Pipeline
// ============================================================
// The full run, in the order the CLI flags allow:
//
//   1. Start the backend session (device + seed)
//   2. Load train.csv, fit/reuse the tokenizer, build the folds
//   3. --train true          → TrainUseCase (one checkpoint per fold)
//   4. Tear down the training session
//   5. --write-results true  → ResultsUseCase on the inner backend
//
// The training data is always loaded: the results step needs the
// same tokenizer, and the sample/class counts are logged either way.

use anyhow::Result;
use std::path::PathBuf;
use burn::tensor::backend::AutodiffBackend;

use crate::application::{
    results_use_case::ResultsUseCase,
    train_use_case::{PipelineConfig, TrainUseCase},
};
use crate::data::loader::{load_data_folds, CsvLoader, LoadOptions};
use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::{model::Hyperparameters, session::Session, trainer::FoldSummary};

/// What a run produced, for the CLI's closing summary.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub samples:    usize,
    pub classes:    usize,
    pub folds:      Vec<FoldSummary>,
    pub submission: Option<PathBuf>,
}

pub struct Pipeline {
    config: PipelineConfig,
    hyper:  Hyperparameters,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, hyper: Hyperparameters::default() }
    }

    pub fn with_hyperparameters(mut self, hyper: Hyperparameters) -> Self {
        self.hyper = hyper;
        self
    }

    pub fn run<B: AutodiffBackend>(&self, device: B::Device) -> Result<PipelineReport> {
        let cfg     = &self.config;
        let session = Session::<B>::init(device, cfg.seed);

        let loader = CsvLoader::new(cfg.csv_schema());
        let store  = TokenizerStore::new(&cfg.checkpoint_dir);
        let data   = load_data_folds(
            &loader,
            &store,
            LoadOptions {
                path:            &cfg.train_path,
                folds:           cfg.folds,
                max_features:    cfg.max_features,
                sequence_length: cfg.sequence_length,
                seed:            cfg.seed,
            },
        )?;

        tracing::info!("Number of data samples: {}", data.dataset.sample_count());
        tracing::info!("Number of classes: {}", data.num_classes);

        let mut report = PipelineReport {
            samples: data.dataset.sample_count(),
            classes: data.num_classes,
            ..PipelineReport::default()
        };

        if cfg.train {
            report.folds = TrainUseCase::new(cfg, &session)
                .with_hyperparameters(self.hyper)
                .execute(&data)?;
        } else {
            tracing::info!("Skipping training (--train false)");
        }

        let device = session.device().clone();
        session.teardown();

        if cfg.write_results {
            let path = ResultsUseCase::new(cfg)
                .execute::<B::InnerBackend>(&data.tokenizer, &device)?;
            report.submission = Some(path);
        } else {
            tracing::info!("Skipping results (--write-results false)");
        }

        Ok(report)
    }
}
