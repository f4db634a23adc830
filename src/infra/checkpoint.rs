// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Per-fold weight files plus the architecture config needed to
// rebuild the model before loading them.
//
// File naming convention:
//   checkpoints/
//     bigru_fold_0.mpk.gz     ← best weights of fold 0
//     bigru_fold_1.mpk.gz
//     ...
//     classifier_config.json  ← ClassifierConfig used for every fold
//     label_columns.json      ← class names, in output-unit order
//
// Weights go through burn's NamedMpkGzFileRecorder at full precision,
// so a reloaded checkpoint is bit-identical to what was saved.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::ml::model::{BiGruClassifier, ClassifierConfig};

const CONFIG_FILE: &str = "classifier_config.json";
const LABELS_FILE: &str = "label_columns.json";

pub struct CheckpointManager {
    dir:        PathBuf,
    model_name: String,
}

impl CheckpointManager {
    /// Creates `dir` if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>, model_name: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir, model_name: model_name.into() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path without extension; the recorder appends `.mpk.gz`.
    pub fn fold_path(&self, fold: usize) -> PathBuf {
        self.dir.join(format!("{}_fold_{fold}", self.model_name))
    }

    pub fn has_fold(&self, fold: usize) -> bool {
        self.fold_path(fold).with_extension("mpk.gz").exists()
    }

    pub fn save_fold<B: Backend>(&self, model: &BiGruClassifier<B>, fold: usize) -> Result<()> {
        let path = self.fold_path(fold);
        NamedMpkGzFileRecorder::<FullPrecisionSettings>::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint for fold {} to '{}'", fold, path.display());
        Ok(())
    }

    pub fn load_fold<B: Backend>(
        &self,
        model:  BiGruClassifier<B>,
        fold:   usize,
        device: &B::Device,
    ) -> Result<BiGruClassifier<B>> {
        let path = self.fold_path(fold);
        let record = NamedMpkGzFileRecorder::<FullPrecisionSettings>::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Has fold {} been trained?",
                    path.display(),
                    fold
                )
            })?;

        tracing::debug!("Loaded checkpoint for fold {} from '{}'", fold, path.display());
        Ok(model.load_record(record))
    }

    pub fn save_config(&self, config: &ClassifierConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved classifier config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<ClassifierConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Run with --train true first.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed classifier config '{}'", path.display()))
    }

    pub fn save_label_columns(&self, labels: &[String]) -> Result<()> {
        let path = self.dir.join(LABELS_FILE);
        fs::write(&path, serde_json::to_string_pretty(labels)?)
            .with_context(|| format!("Cannot write label columns to '{}'", path.display()))
    }

    pub fn load_label_columns(&self) -> Result<Vec<String>> {
        let path = self.dir.join(LABELS_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read label columns from '{}'. Run with --train true first.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed label columns '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::ml::model::weights_bytes;

    type TestBackend = NdArray;

    #[test]
    fn fold_round_trip_is_exact() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), "bigru").unwrap();
        let device  = Default::default();
        let cfg     = ClassifierConfig::new(6, 3, 4, 2).with_hidden_size(3);

        let model: BiGruClassifier<TestBackend> = cfg.init(&device).unwrap();
        assert!(!manager.has_fold(2));
        manager.save_fold(&model, 2).unwrap();
        assert!(manager.has_fold(2));

        let loaded = manager
            .load_fold(cfg.init::<TestBackend>(&device).unwrap(), 2, &device)
            .unwrap();
        assert_eq!(weights_bytes(&loaded).unwrap(), weights_bytes(&model).unwrap());
    }

    #[test]
    fn missing_fold_is_an_error() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), "bigru").unwrap();
        let device  = Default::default();
        let model: BiGruClassifier<TestBackend> = ClassifierConfig::new(6, 3, 4, 2)
            .init(&device)
            .unwrap();
        assert!(manager.load_fold(model, 0, &device).is_err());
    }

    #[test]
    fn config_round_trip() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), "bigru").unwrap();
        let cfg     = ClassifierConfig::new(100, 300, 150, 12);

        manager.save_config(&cfg).unwrap();
        let loaded = manager.load_config().unwrap();

        assert_eq!(loaded.vocab_size, 100);
        assert_eq!(loaded.embed_dim, 300);
        assert_eq!(loaded.sequence_length, 150);
        assert_eq!(loaded.num_classes, 12);
        assert_eq!(loaded.hidden_size, 64);
    }

    #[test]
    fn label_columns_round_trip() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), "bigru").unwrap();
        let labels  = vec!["toxic".to_string(), "insult".to_string()];

        assert!(manager.load_label_columns().is_err());
        manager.save_label_columns(&labels).unwrap();
        assert_eq!(manager.load_label_columns().unwrap(), labels);
    }
}
