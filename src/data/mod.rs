// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the CSV / embedding files on disk and the
// tensor batches the trainer consumes:
//
//   train.csv
//       │
//       ▼
//   CsvLoader         → reads rows, cleans text, parses labels
//       │
//       ▼
//   Tokenizer         → word ids, pre-padded to sequence_length
//       │
//       ▼
//   k_fold            → k train/validation index splits
//       │
//       ▼
//   SequenceDataset   → one fold split behind burn's Dataset trait
//       │
//       ▼
//   SequenceBatcher   → [batch, seq_len] tokens + [batch, classes] targets
//
// Side inputs: the pretrained embedding file (embeddings.rs) and
// the submission template (submission.rs).

/// Reads the labelled train CSV and the unlabelled test CSV
pub mod loader;

/// Text cleaning and fixed-length padding
pub mod preprocessor;

/// Pretrained word vectors aligned to the vocabulary
pub mod embeddings;

/// Burn Dataset implementations
pub mod dataset;

/// Burn Batcher implementation
pub mod batcher;

/// Seeded k-fold index splits
pub mod splitter;

/// Submission template reading and writing
pub mod submission;
