// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Fits the word-level tokenizer on the cleaned training text and
// persists it as a HuggingFace tokenizer JSON, so a later
// `--train false` run tokenises the test set with the exact
// vocabulary the fold checkpoints were trained against.
//
// The vocabulary is written by hand (WordLevel model) instead of
// going through a tokenizers Trainer: ids must follow the
// frequency ranking used by the embedding matrix, and the cleaned
// text is already split on single spaces.

use anyhow::{Context, Result};
use std::{collections::HashMap, path::PathBuf};
use tokenizers::Tokenizer;

use crate::domain::vocabulary::{Vocabulary, PAD_ID, PAD_TOKEN, UNK_ID, UNK_TOKEN};

const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load the saved tokenizer, or fit a new one on `texts`.
    pub fn load_or_build(&self, texts: &[String], max_features: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Reusing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Fitting tokenizer (max_features={})", max_features);
            self.build_and_save(texts, max_features)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    /// Fit on already-cleaned texts. At most `max_features` ids are
    /// issued, two of which are reserved for padding and unknown words.
    pub fn build_and_save(&self, texts: &[String], max_features: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let words = rank_words(texts, max_features.saturating_sub(2));

        let mut vocab = serde_json::Map::new();
        vocab.insert(PAD_TOKEN.to_string(), PAD_ID.into());
        vocab.insert(UNK_TOKEN.to_string(), UNK_ID.into());
        for (offset, word) in words.iter().enumerate() {
            vocab.insert(word.clone(), (offset as u32 + 2).into());
        }

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": PAD_ID, "content": PAD_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": UNK_ID, "content": UNK_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": { "type": "Lowercase" },
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer to '{}'", path.display()))?;

        tracing::info!(
            "Tokenizer fitted with {} words, saved to '{}'",
            words.len(),
            path.display()
        );

        self.load()
    }
}

/// Vocabulary view of a fitted tokenizer, used to align embedding rows.
pub fn vocabulary_of(tokenizer: &Tokenizer) -> Vocabulary {
    tokenizer.get_vocab(true).into_iter().collect()
}

/// Words ordered by descending frequency, ties broken alphabetically,
/// capped at `limit`.
fn rank_words(texts: &[String], limit: usize) -> Vec<String> {
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for text in texts {
        for word in text.split_whitespace() {
            *freq.entry(word).or_insert(0) += 1;
        }
    }

    let mut words: Vec<(&str, usize)> = freq
        .into_iter()
        .filter(|(w, _)| *w != PAD_TOKEN && *w != UNK_TOKEN)
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    words.truncate(limit);

    words.into_iter().map(|(w, _)| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rank_words_orders_by_frequency() {
        let ranked = rank_words(&texts(&["b a b", "c b a"]), 10);
        assert_eq!(ranked, vec!["b", "a", "c"]);
    }

    #[test]
    fn rank_words_respects_limit() {
        let ranked = rank_words(&texts(&["x y z x y x"]), 2);
        assert_eq!(ranked, vec!["x", "y"]);
    }

    #[test]
    fn built_tokenizer_assigns_frequency_ids() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let tok   = store
            .build_and_save(&texts(&["good good bad", "good ugly"]), 100)
            .unwrap();

        let vocab = vocabulary_of(&tok);
        assert_eq!(vocab.id(PAD_TOKEN), Some(PAD_ID));
        assert_eq!(vocab.id(UNK_TOKEN), Some(UNK_ID));
        assert_eq!(vocab.id("good"), Some(2));
        assert_eq!(vocab.len(), 5);

        let enc = tok.encode("good unseen", false).unwrap();
        assert_eq!(enc.get_ids(), &[2, UNK_ID]);
    }

    #[test]
    fn load_or_build_reuses_saved_tokenizer() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        store.build_and_save(&texts(&["alpha beta"]), 100).unwrap();

        // different corpus, but the saved vocabulary wins
        let tok = store.load_or_build(&texts(&["gamma"]), 100).unwrap();
        assert!(vocabulary_of(&tok).id("alpha").is_some());
        assert!(vocabulary_of(&tok).id("gamma").is_none());
    }
}
