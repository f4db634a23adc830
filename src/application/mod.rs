// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers; no tensor code and no argument
// parsing here.
//
//   pipeline.rs         — one full run: load data, train, write results
//   train_use_case.rs   — PipelineConfig and the k-fold training step
//   results_use_case.rs — fold-averaged test predictions → submission

pub mod pipeline;

pub mod train_use_case;

pub mod results_use_case;
