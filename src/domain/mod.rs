// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types shared by every other layer:
//
//   sample.rs     — one tokenised, padded text with its label vector
//   fold.rs       — a cross-validation fold (train / validation indices)
//   vocabulary.rs — token string → id mapping fitted on the training text
//   error.rs      — malformed-data errors
//   traits.rs     — seams other layers implement
//
// Nothing here touches burn, the filesystem, or the tokenizer crate.

pub mod error;
pub mod fold;
pub mod sample;
pub mod traits;
pub mod vocabulary;
