// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Files the pipeline writes next to its checkpoints:
//
//   checkpoint.rs      — per-fold weights (burn recorder) and the
//                        ClassifierConfig JSON needed to rebuild
//                        the model for inference
//
//   tokenizer_store.rs — the fitted word-level tokenizer, so a
//                        results-only run reuses the training
//                        vocabulary
//
//   metrics.rs         — metrics.csv, one row per fold and epoch

/// Fold checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer fitting, saving and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
