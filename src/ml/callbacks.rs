// ============================================================
// Layer 5 — Epoch-End Callbacks
// ============================================================
// After every epoch the trainer runs an ordered list of handlers:
//
//   EarlyStopping      → stop when val_loss stops improving
//   ReduceLrOnPlateau  → shrink the learning rate on a plateau
//   RocAucEvaluation   → validation ROC-AUC (ml/evaluator.rs)
//   ModelCheckpoint    → save best-so-far weights for the fold
//   MetricsCallback    → append a row to metrics.csv
//
// Each handler sees the shared `EpochState` (it may write to it:
// the learning rate, the AUC) and read-only views of the model.
// Returning `Signal::Stop` ends the fold after the remaining
// handlers of this epoch have run; the process keeps going.
//
// A new list is built for every fold, so no handler carries
// state from one fold into the next. `on_fold_begin` runs once per
// fold with the freshly restored model, before the first epoch.

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;

use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::BiGruClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Stop,
}

/// Per-epoch values shared by the handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochState {
    pub fold:          usize,
    pub epoch:         usize,
    pub train_loss:    f64,
    pub val_loss:      f64,
    pub learning_rate: f64,
    pub val_auc:       Option<f64>,
}

/// The trainable model and its evaluation copy for the current epoch.
pub struct FoldModels<'a, B: AutodiffBackend> {
    pub train: &'a BiGruClassifier<B>,
    pub valid: &'a BiGruClassifier<B::InnerBackend>,
}

pub trait EpochCallback<B: AutodiffBackend> {
    fn name(&self) -> &'static str;

    fn on_fold_begin(&mut self, _fold: usize, _model: &BiGruClassifier<B>) -> Result<()> {
        Ok(())
    }

    fn on_epoch_end(&mut self, state: &mut EpochState, models: &FoldModels<'_, B>) -> Result<Signal>;
}

// ─── EarlyStopping ───────────────────────────────────────────────────────────
/// Stops after `patience` epochs without val_loss improving by more
/// than `min_delta`.
pub struct EarlyStopping {
    patience:  usize,
    min_delta: f64,
    best:      f64,
    wait:      usize,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f64) -> Self {
        Self { patience, min_delta, best: f64::INFINITY, wait: 0 }
    }

    fn observe(&mut self, val_loss: f64) -> Signal {
        if val_loss < self.best - self.min_delta {
            self.best = val_loss;
            self.wait = 0;
            return Signal::Continue;
        }

        self.wait += 1;
        if self.wait >= self.patience {
            Signal::Stop
        } else {
            Signal::Continue
        }
    }
}

impl<B: AutodiffBackend> EpochCallback<B> for EarlyStopping {
    fn name(&self) -> &'static str { "early_stopping" }

    fn on_epoch_end(&mut self, state: &mut EpochState, _: &FoldModels<'_, B>) -> Result<Signal> {
        let signal = self.observe(state.val_loss);
        if signal == Signal::Stop {
            tracing::info!(
                "Fold {} epoch {}: early stopping (best val_loss={:.6})",
                state.fold + 1,
                state.epoch,
                self.best
            );
        }
        Ok(signal)
    }
}

// ─── ReduceLrOnPlateau ───────────────────────────────────────────────────────
/// Multiplies the learning rate by `factor` once val_loss has failed
/// to beat its best by `threshold` for `patience` epochs. Never goes
/// below `min_lr`.
pub struct ReduceLrOnPlateau {
    factor:    f64,
    patience:  usize,
    threshold: f64,
    min_lr:    f64,
    best:      f64,
    wait:      usize,
}

impl ReduceLrOnPlateau {
    pub fn new(factor: f64, patience: usize, threshold: f64, min_lr: f64) -> Self {
        Self {
            factor,
            patience,
            threshold,
            min_lr,
            best: f64::INFINITY,
            wait: 0,
        }
    }

    /// Returns the learning rate to use for the next epoch.
    fn observe(&mut self, val_loss: f64, lr: f64) -> f64 {
        if val_loss < self.best - self.threshold {
            self.best = val_loss;
            self.wait = 0;
            return lr;
        }

        self.wait += 1;
        if self.wait < self.patience {
            return lr;
        }

        self.wait = 0;
        // floating-point slack so 1e-3 * 0.1 counts as reaching 1e-4
        if lr > self.min_lr * (1.0 + 1e-9) {
            (lr * self.factor).max(self.min_lr)
        } else {
            lr
        }
    }
}

impl<B: AutodiffBackend> EpochCallback<B> for ReduceLrOnPlateau {
    fn name(&self) -> &'static str { "reduce_lr_on_plateau" }

    fn on_epoch_end(&mut self, state: &mut EpochState, _: &FoldModels<'_, B>) -> Result<Signal> {
        let new_lr = self.observe(state.val_loss, state.learning_rate);
        if new_lr < state.learning_rate {
            tracing::info!(
                "Fold {} epoch {}: reducing learning rate {:.2e} → {:.2e}",
                state.fold + 1,
                state.epoch,
                state.learning_rate,
                new_lr
            );
        }
        state.learning_rate = new_lr;
        Ok(Signal::Continue)
    }
}

// ─── ModelCheckpoint ─────────────────────────────────────────────────────────
/// Saves the fold's weights whenever val_loss beats every earlier
/// epoch of this fold. Non-improving epochs leave the file alone.
pub struct ModelCheckpoint<'a> {
    manager: &'a CheckpointManager,
    fold:    usize,
    best:    f64,
}

impl<'a> ModelCheckpoint<'a> {
    pub fn new(manager: &'a CheckpointManager, fold: usize) -> Self {
        Self { manager, fold, best: f64::INFINITY }
    }
}

impl<B: AutodiffBackend> EpochCallback<B> for ModelCheckpoint<'_> {
    fn name(&self) -> &'static str { "model_checkpoint" }

    fn on_epoch_end(&mut self, state: &mut EpochState, models: &FoldModels<'_, B>) -> Result<Signal> {
        if state.val_loss < self.best {
            tracing::info!(
                "Fold {} epoch {}: val_loss improved {:.6} → {:.6}, saving checkpoint",
                self.fold + 1,
                state.epoch,
                self.best,
                state.val_loss
            );
            self.manager.save_fold(models.train, self.fold)?;
            self.best = state.val_loss;
        } else {
            tracing::debug!(
                "Fold {} epoch {}: val_loss {:.6} did not improve on {:.6}",
                self.fold + 1,
                state.epoch,
                state.val_loss,
                self.best
            );
        }
        Ok(Signal::Continue)
    }
}

// ─── MetricsCallback ─────────────────────────────────────────────────────────
pub struct MetricsCallback<'a> {
    logger: &'a MetricsLogger,
}

impl<'a> MetricsCallback<'a> {
    pub fn new(logger: &'a MetricsLogger) -> Self {
        Self { logger }
    }
}

impl<B: AutodiffBackend> EpochCallback<B> for MetricsCallback<'_> {
    fn name(&self) -> &'static str { "metrics" }

    fn on_epoch_end(&mut self, state: &mut EpochState, _: &FoldModels<'_, B>) -> Result<Signal> {
        self.logger.log(&EpochMetrics::from(&*state))?;
        Ok(Signal::Continue)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::{Autodiff, NdArray}, module::AutodiffModule};

    use crate::ml::model::{weights_bytes, ClassifierConfig};

    type TrainBackend = Autodiff<NdArray>;

    fn state(epoch: usize, val_loss: f64) -> EpochState {
        EpochState {
            fold: 0,
            epoch,
            train_loss: 1.0,
            val_loss,
            learning_rate: 1e-3,
            val_auc: None,
        }
    }

    #[test]
    fn early_stopping_waits_for_patience() {
        let mut es = EarlyStopping::new(2, 1e-5);
        assert_eq!(es.observe(0.50), Signal::Continue);
        assert_eq!(es.observe(0.40), Signal::Continue);
        assert_eq!(es.observe(0.41), Signal::Continue);
        assert_eq!(es.observe(0.42), Signal::Stop);
    }

    #[test]
    fn early_stopping_ignores_improvements_below_min_delta() {
        let mut es = EarlyStopping::new(2, 1e-5);
        es.observe(0.5);
        assert_eq!(es.observe(0.499_999_5), Signal::Continue);
        assert_eq!(es.observe(0.499_999_0), Signal::Stop);
    }

    #[test]
    fn early_stopping_resets_wait_on_improvement() {
        let mut es = EarlyStopping::new(2, 1e-5);
        es.observe(0.5);
        es.observe(0.6);
        assert_eq!(es.observe(0.3), Signal::Continue);
        assert_eq!(es.observe(0.4), Signal::Continue);
    }

    #[test]
    fn reduce_lr_scales_after_one_plateau_epoch_and_respects_floor() {
        let mut rl = ReduceLrOnPlateau::new(0.1, 1, 1e-4, 1e-4);
        let lr = rl.observe(0.5, 1e-3);
        assert_eq!(lr, 1e-3);

        let lr = rl.observe(0.5, lr);
        assert!((lr - 1e-4).abs() < 1e-12);

        // already at the floor
        let lr = rl.observe(0.5, lr);
        assert!((lr - 1e-4).abs() < 1e-12);
    }

    #[test]
    fn reduce_lr_keeps_rate_while_improving() {
        let mut rl = ReduceLrOnPlateau::new(0.1, 1, 1e-4, 1e-4);
        assert_eq!(rl.observe(0.5, 1e-3), 1e-3);
        assert_eq!(rl.observe(0.4, 1e-3), 1e-3);
        assert_eq!(rl.observe(0.3, 1e-3), 1e-3);
    }

    #[test]
    fn checkpoint_keeps_best_epoch_not_last() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), "bigru").unwrap();
        let device  = Default::default();
        let cfg     = ClassifierConfig::new(6, 3, 4, 2).with_hidden_size(3);

        // three distinct parameter sets stand in for three epochs
        let epochs: Vec<BiGruClassifier<TrainBackend>> =
            (0..3).map(|_| cfg.init(&device).unwrap()).collect();

        let mut checkpoint = ModelCheckpoint::new(&manager, 0);
        for (i, (model, loss)) in epochs.iter().zip([0.5, 0.45, 0.6]).enumerate() {
            let valid  = model.valid();
            let models = FoldModels { train: model, valid: &valid };
            let signal = EpochCallback::<TrainBackend>::on_epoch_end(
                &mut checkpoint,
                &mut state(i + 1, loss),
                &models,
            )
            .unwrap();
            assert_eq!(signal, Signal::Continue);
        }

        let restored = manager
            .load_fold(cfg.init::<TrainBackend>(&device).unwrap(), 0, &device)
            .unwrap();
        let restored = weights_bytes(&restored).unwrap();

        assert_eq!(restored, weights_bytes(&epochs[1]).unwrap());
        assert_ne!(restored, weights_bytes(&epochs[2]).unwrap());
    }
}
