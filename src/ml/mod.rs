// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, trains or runs the network lives here.
//
//   model.rs      — BiGruClassifier and ClassifierConfig:
//                   embedding → spatial dropout → Gaussian noise →
//                   bidirectional GRU → [avg ‖ max ‖ final state] →
//                   dense; plus BCE-with-logits and weight snapshots
//
//   session.rs    — explicit backend context (device + seed)
//
//   callbacks.rs  — epoch-end handlers: early stopping, LR plateau,
//                   checkpointing, metrics
//
//   evaluator.rs  — macro ROC-AUC and its epoch callback
//
//   trainer.rs    — the k-fold loop: reset, train, validate,
//                   run callbacks
//
//   inferencer.rs — batched probability prediction and the
//                   checkpoint-backed fold predictor

/// Bidirectional GRU classifier architecture
pub mod model;

/// Backend device and RNG seed for one run
pub mod session;

/// Epoch-end callbacks
pub mod callbacks;

/// Validation ROC-AUC
pub mod evaluator;

/// K-fold training loop
pub mod trainer;

/// Batched prediction from a model or a fold checkpoint
pub mod inferencer;
