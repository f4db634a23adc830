// ============================================================
// Layer 5 — K-Fold Training Loop
// ============================================================
// Trains one model per fold, every fold starting from the same
// initial weights.
//
// Per fold:
//   Reset       → restore the initial snapshot, fresh Adam state,
//                 fresh callback list
//   Training    → up to `epochs` passes over shuffled mini-batches
//   Validating  → val_loss on the held-out split (model.valid(),
//                 no dropout or noise), then every callback in order
//   Checkpointed→ best weights on disk (ModelCheckpoint), next fold
//
// A `Signal::Stop` from any callback ends the fold after the rest
// of that epoch's callbacks have run. Errors abort the whole run.
//
// Training runs on B (an autodiff backend); validation runs on
// B::InnerBackend, which shares the device.

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::SequenceBatcher,
    dataset::{LabeledDataset, SequenceDataset},
};
use crate::domain::fold::Fold;
use crate::ml::callbacks::{EpochCallback, EpochState, FoldModels, Signal};
use crate::ml::model::{BiGruClassifier, Hyperparameters, ModelSnapshot};
use crate::ml::session::Session;

/// Outcome of one fold, for the end-of-run log.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldSummary {
    pub fold:          usize,
    pub epochs_run:    usize,
    pub best_val_loss: f64,
    pub last_val_auc:  Option<f64>,
}

pub struct FoldTrainer<'s, B: AutodiffBackend> {
    session: &'s Session<B>,
    hyper:   Hyperparameters,
}

impl<'s, B: AutodiffBackend> FoldTrainer<'s, B> {
    pub fn new(session: &'s Session<B>, hyper: Hyperparameters) -> Self {
        Self { session, hyper }
    }

    /// Train every fold in order. `callbacks_for(fold, validation)`
    /// builds that fold's callback list.
    pub fn run<'c, F>(
        &self,
        model:             BiGruClassifier<B>,
        dataset:           &LabeledDataset,
        folds:             &[Fold],
        mut callbacks_for: F,
    ) -> Result<Vec<FoldSummary>>
    where
        F: FnMut(usize, &SequenceDataset) -> Result<Vec<Box<dyn EpochCallback<B> + 'c>>>,
    {
        let device   = self.session.device();
        let snapshot = ModelSnapshot::capture(&model)?;
        tracing::debug!("Captured initial weights ({} bytes)", snapshot.as_bytes().len());

        let mut model     = model;
        let mut summaries = Vec::with_capacity(folds.len());

        for (fold_index, fold) in folds.iter().enumerate() {
            model = snapshot.restore(model, device)?;

            let train_split = dataset.subset(&fold.train);
            let valid_split = dataset.subset(&fold.validation);
            let callbacks   = callbacks_for(fold_index, &valid_split)?;

            tracing::info!(
                "Fold {}/{}: {} training rows, {} validation rows",
                fold_index + 1,
                folds.len(),
                train_split.len(),
                valid_split.len()
            );

            let (trained, summary) =
                self.train_fold(model, fold_index, train_split, valid_split, callbacks)?;
            model = trained;

            tracing::info!(
                "Fold {} finished after {} epoch(s), best val_loss={:.6}",
                fold_index + 1,
                summary.epochs_run,
                summary.best_val_loss
            );
            summaries.push(summary);
        }

        Ok(summaries)
    }

    fn train_fold<'c>(
        &self,
        mut model:     BiGruClassifier<B>,
        fold:          usize,
        train_split:   SequenceDataset,
        valid_split:   SequenceDataset,
        mut callbacks: Vec<Box<dyn EpochCallback<B> + 'c>>,
    ) -> Result<(BiGruClassifier<B>, FoldSummary)> {
        let device = self.session.device();

        for callback in callbacks.iter_mut() {
            callback.on_fold_begin(fold, &model)?;
        }

        // ── Adam with gradient-norm clipping, new state every fold ──────────
        let mut optim = AdamConfig::new()
            .with_epsilon(1e-8)
            .with_grad_clipping(Some(GradientClippingConfig::Norm(self.hyper.clip_norm)))
            .init();

        let train_loader = DataLoaderBuilder::new(SequenceBatcher::<B>::new(device.clone()))
            .batch_size(self.hyper.batch_size)
            .shuffle(self.session.seed().wrapping_add(fold as u64))
            .num_workers(1)
            .build(train_split);

        let valid_loader =
            DataLoaderBuilder::new(SequenceBatcher::<B::InnerBackend>::new(device.clone()))
                .batch_size(self.hyper.batch_size)
                .num_workers(1)
                .build(valid_split);

        let mut state = EpochState {
            fold,
            epoch:         0,
            train_loss:    f64::NAN,
            val_loss:      f64::NAN,
            learning_rate: self.hyper.learning_rate,
            val_auc:       None,
        };
        let mut summary = FoldSummary {
            fold,
            epochs_run:    0,
            best_val_loss: f64::INFINITY,
            last_val_auc:  None,
        };

        for epoch in 1..=self.hyper.epochs {
            // ── Training phase ───────────────────────────────────────────────
            let mut loss_sum = 0.0f64;
            let mut seen     = 0usize;

            for batch in train_loader.iter() {
                let rows = batch.tokens.dims()[0];
                let loss = model.forward_loss(batch.tokens, batch.targets);

                loss_sum += loss.clone().into_scalar().elem::<f64>() * rows as f64;
                seen     += rows;

                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(state.learning_rate, model, grads);
            }

            // ── Validation phase ─────────────────────────────────────────────
            let model_valid = model.valid();

            let mut val_sum  = 0.0f64;
            let mut val_seen = 0usize;
            for batch in valid_loader.iter() {
                let rows = batch.tokens.dims()[0];
                let loss = model_valid.forward_loss(batch.tokens, batch.targets);
                val_sum  += loss.into_scalar().elem::<f64>() * rows as f64;
                val_seen += rows;
            }

            state.epoch      = epoch;
            state.train_loss = mean_or_nan(loss_sum, seen);
            state.val_loss   = mean_or_nan(val_sum, val_seen);
            state.val_auc    = None;

            tracing::info!(
                "Fold {} epoch {:>2}/{} | train_loss={:.6} | val_loss={:.6} | lr={:.1e}",
                fold + 1,
                epoch,
                self.hyper.epochs,
                state.train_loss,
                state.val_loss,
                state.learning_rate
            );

            // ── Callbacks, in order ──────────────────────────────────────────
            let models = FoldModels { train: &model, valid: &model_valid };
            let mut stop = false;
            for callback in callbacks.iter_mut() {
                if callback.on_epoch_end(&mut state, &models)? == Signal::Stop {
                    tracing::debug!("Fold {} epoch {}: stop requested by {}", fold + 1, epoch, callback.name());
                    stop = true;
                }
            }

            summary.epochs_run    = epoch;
            summary.best_val_loss = summary.best_val_loss.min(state.val_loss);
            if state.val_auc.is_some() {
                summary.last_val_auc = state.val_auc;
            }

            if stop {
                break;
            }
        }

        Ok((model, summary))
    }
}

fn mean_or_nan(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use std::{cell::RefCell, rc::Rc};

    use crate::domain::sample::LabeledSequence;
    use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
    use crate::ml::callbacks::{EarlyStopping, MetricsCallback, ModelCheckpoint};
    use crate::ml::model::{weights_bytes, ClassifierConfig};

    type TrainBackend = Autodiff<NdArray>;

    fn dataset() -> LabeledDataset {
        let samples = (0..10u32)
            .map(|i| LabeledSequence::new(vec![0, 2 + i % 3, 2 + i % 5, 7], vec![(i % 2) as f32, 0.0]))
            .collect();
        LabeledDataset::new(samples, vec!["a".into(), "b".into()])
    }

    fn hyper(epochs: usize) -> Hyperparameters {
        Hyperparameters { batch_size: 4, epochs, ..Hyperparameters::default() }
    }

    fn model(device: &<TrainBackend as Backend>::Device) -> BiGruClassifier<TrainBackend> {
        ClassifierConfig::new(8, 3, 4, 2).with_hidden_size(3).init(device).unwrap()
    }

    /// Records (fold, epoch) on every call.
    struct CallRecorder {
        calls: Rc<RefCell<Vec<(usize, usize)>>>,
        stop:  bool,
    }

    impl EpochCallback<TrainBackend> for CallRecorder {
        fn name(&self) -> &'static str { "call_recorder" }

        fn on_epoch_end(
            &mut self,
            state: &mut EpochState,
            _: &FoldModels<'_, TrainBackend>,
        ) -> Result<Signal> {
            self.calls.borrow_mut().push((state.fold, state.epoch));
            Ok(if self.stop { Signal::Stop } else { Signal::Continue })
        }
    }

    #[test]
    fn every_fold_is_trained_and_checkpointed() {
        let dir     = tempfile::tempdir().unwrap();
        let session = Session::<TrainBackend>::init(Default::default(), 7);
        let manager = CheckpointManager::new(dir.path(), "bigru").unwrap();
        let logger  = MetricsLogger::new(dir.path()).unwrap();
        let folds   = crate::data::splitter::k_fold(10, 2, 7).unwrap();

        let trainer   = FoldTrainer::new(&session, hyper(2));
        let summaries = trainer
            .run(model(session.device()), &dataset(), &folds, |fold, _| {
                let callbacks: Vec<Box<dyn EpochCallback<TrainBackend> + '_>> = vec![
                    Box::new(EarlyStopping::new(2, 1e-5)),
                    Box::new(ModelCheckpoint::new(&manager, fold)),
                    Box::new(MetricsCallback::new(&logger)),
                ];
                Ok(callbacks)
            })
            .unwrap();

        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.epochs_run == 2 && s.best_val_loss.is_finite()));
        assert!(manager.has_fold(0));
        assert!(manager.has_fold(1));

        // header + 2 folds × 2 epochs
        let metrics = std::fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(metrics.lines().count(), 5);
    }

    #[test]
    fn stop_ends_the_fold_after_remaining_callbacks_run() {
        let session = Session::<TrainBackend>::init(Default::default(), 7);
        let folds   = crate::data::splitter::k_fold(10, 2, 7).unwrap();
        let calls   = Rc::new(RefCell::new(Vec::new()));

        let trainer   = FoldTrainer::new(&session, hyper(5));
        let summaries = trainer
            .run(model(session.device()), &dataset(), &folds, |_, _| {
                let callbacks: Vec<Box<dyn EpochCallback<TrainBackend>>> = vec![
                    Box::new(CallRecorder { calls: calls.clone(), stop: true }),
                    Box::new(CallRecorder { calls: calls.clone(), stop: false }),
                ];
                Ok(callbacks)
            })
            .unwrap();

        assert!(summaries.iter().all(|s| s.epochs_run == 1));
        assert_eq!(*calls.borrow(), vec![(0, 1), (0, 1), (1, 1), (1, 1)]);
    }

    /// Records serialised weights at every fold start and epoch end.
    struct WeightRecorder {
        at_begin: Rc<RefCell<Vec<Vec<u8>>>>,
        at_end:   Rc<RefCell<Vec<Vec<u8>>>>,
    }

    impl EpochCallback<TrainBackend> for WeightRecorder {
        fn name(&self) -> &'static str { "weight_recorder" }

        fn on_fold_begin(&mut self, _: usize, model: &BiGruClassifier<TrainBackend>) -> Result<()> {
            self.at_begin.borrow_mut().push(weights_bytes(model)?);
            Ok(())
        }

        fn on_epoch_end(
            &mut self,
            _: &mut EpochState,
            models: &FoldModels<'_, TrainBackend>,
        ) -> Result<Signal> {
            self.at_end.borrow_mut().push(weights_bytes(models.train)?);
            Ok(Signal::Continue)
        }
    }

    #[test]
    fn every_fold_starts_from_the_initial_weights() {
        let session  = Session::<TrainBackend>::init(Default::default(), 7);
        let folds    = crate::data::splitter::k_fold(10, 3, 7).unwrap();
        let initial  = model(session.device());
        let snapshot = weights_bytes(&initial).unwrap();
        let at_begin = Rc::new(RefCell::new(Vec::new()));
        let at_end   = Rc::new(RefCell::new(Vec::new()));

        let trainer = FoldTrainer::new(
            &session,
            Hyperparameters { learning_rate: 1e-2, ..hyper(1) },
        );
        trainer
            .run(initial, &dataset(), &folds, |_, _| {
                let callbacks: Vec<Box<dyn EpochCallback<TrainBackend>>> = vec![Box::new(WeightRecorder {
                    at_begin: at_begin.clone(),
                    at_end:   at_end.clone(),
                })];
                Ok(callbacks)
            })
            .unwrap();

        let at_begin = at_begin.borrow();
        let at_end   = at_end.borrow();
        assert_eq!(at_begin.len(), 3);
        assert_eq!(at_end.len(), 3);

        // each fold actually trained away from the snapshot ...
        assert!(at_end.iter().all(|w| *w != snapshot));
        // ... and the next one still started from it
        assert!(at_begin.iter().all(|w| *w == snapshot));
    }
}
