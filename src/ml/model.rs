use anyhow::Result;
use burn::{
    module::Param,
    nn::{
        gru::{Gru, GruConfig},
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::{activation::sigmoid, Distribution},
};

use crate::data::embeddings::EmbeddingMatrix;
use crate::domain::error::DataError;

// ─── Fixed training hyperparameters ──────────────────────────────────────────
pub const BATCH_SIZE:    usize = 32;
pub const EPOCHS:        usize = 7;
pub const LEARN_RATE:    f64   = 0.001;
pub const CLIP_NORM:     f32   = 1.0;

#[derive(Debug, Clone, Copy)]
pub struct Hyperparameters {
    pub batch_size:    usize,
    pub epochs:        usize,
    pub learning_rate: f64,
    pub clip_norm:     f32,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            batch_size:    BATCH_SIZE,
            epochs:        EPOCHS,
            learning_rate: LEARN_RATE,
            clip_norm:     CLIP_NORM,
        }
    }
}

// #[derive(Config)] also provides Clone and serde impls.
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    pub vocab_size:      usize,
    pub embed_dim:       usize,
    pub sequence_length: usize,
    pub num_classes:     usize,
    #[config(default = 64)]
    pub hidden_size:     usize,
    #[config(default = 0.5)]
    pub spatial_dropout: f64,
    #[config(default = 0.2)]
    pub noise_std:       f64,
}

impl ClassifierConfig {
    /// Build the classifier with a randomly initialised embedding table.
    /// Used when the weights are about to be replaced by a checkpoint.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<BiGruClassifier<B>> {
        self.validate()?;
        let embedding = EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device);
        Ok(self.assemble(embedding, device))
    }

    /// Build the classifier with its embedding layer seeded from `matrix`.
    pub fn init_with_embeddings<B: Backend>(
        &self,
        matrix: &EmbeddingMatrix,
        device: &B::Device,
    ) -> Result<BiGruClassifier<B>> {
        self.validate()?;

        let expected = self.vocab_size * self.embed_dim;
        if matrix.values.len() != expected || matrix.dim != self.embed_dim {
            return Err(DataError::EmbeddingShape {
                rows:     self.vocab_size,
                dim:      self.embed_dim,
                expected,
                actual:   matrix.values.len(),
            }
            .into());
        }

        let weights = Tensor::<B, 1>::from_floats(matrix.values.as_slice(), device)
            .reshape([self.vocab_size, self.embed_dim]);

        let mut embedding = EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device);
        embedding.weight = Param::from_tensor(weights);

        Ok(self.assemble(embedding, device))
    }

    fn validate(&self) -> Result<()> {
        if self.sequence_length == 0 {
            return Err(DataError::InvalidSequenceLength.into());
        }
        anyhow::ensure!(self.vocab_size > 0, "classifier needs a non-empty vocabulary");
        anyhow::ensure!(self.embed_dim > 0, "classifier needs embed_dim > 0");
        anyhow::ensure!(self.num_classes > 0, "classifier needs at least one class");
        anyhow::ensure!(self.hidden_size > 0, "classifier needs hidden_size > 0");
        Ok(())
    }

    fn assemble<B: Backend>(&self, embedding: Embedding<B>, device: &B::Device) -> BiGruClassifier<B> {
        let gru_forward  = GruConfig::new(self.embed_dim, self.hidden_size, true).init(device);
        let gru_backward = GruConfig::new(self.embed_dim, self.hidden_size, true).init(device);
        // avg-pool (2h) + max-pool (2h) + final state (2h)
        let output = LinearConfig::new(6 * self.hidden_size, self.num_classes).init(device);

        BiGruClassifier {
            embedding,
            gru_forward,
            gru_backward,
            output,
            spatial_dropout: self.spatial_dropout,
            noise_std:       self.noise_std,
        }
    }
}

/// Embedding → spatial dropout → Gaussian noise → bidirectional GRU →
/// spatial dropout → [avg-pool ‖ max-pool ‖ final state] → dense.
///
/// Dropout and noise only fire on an autodiff backend, so the model
/// returned by `.valid()` is deterministic.
#[derive(Module, Debug)]
pub struct BiGruClassifier<B: Backend> {
    pub embedding:       Embedding<B>,
    pub gru_forward:     Gru<B>,
    pub gru_backward:    Gru<B>,
    pub output:          Linear<B>,
    pub spatial_dropout: f64,
    pub noise_std:       f64,
}

impl<B: Backend> BiGruClassifier<B> {
    /// tokens: [batch, seq_len] → logits: [batch, num_classes]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, _] = tokens.dims();

        let x = self.embedding.forward(tokens);
        let x = spatial_dropout(x, self.spatial_dropout);
        let x = gaussian_noise(x, self.noise_std);

        let (sequence, last_state) = self.bidirectional(x);
        let sequence = spatial_dropout(sequence, self.spatial_dropout);

        let [_, _, features] = sequence.dims();
        let avg_pool = sequence.clone().mean_dim(1).reshape([batch_size, features]);
        // max over time as a last-dim reduction: ndarray's autodiff only
        // supports max_dim gradients on the last dimension
        let max_pool = sequence
            .swap_dims(1, 2)
            .max_dim(2)
            .reshape([batch_size, features]);

        let pooled = Tensor::cat(vec![avg_pool, max_pool, last_state], 1);
        self.output.forward(pooled)
    }

    /// Per-class probabilities in [0, 1].
    pub fn forward_classification(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        sigmoid(self.forward(tokens))
    }

    pub fn forward_loss(&self, tokens: Tensor<B, 2, Int>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        binary_cross_entropy_with_logits(self.forward(tokens), targets)
    }

    /// Runs both directions and returns
    /// (sequence output [batch, seq, 2h], final state [batch, 2h]).
    fn bidirectional(&self, x: Tensor<B, 3>) -> (Tensor<B, 3>, Tensor<B, 2>) {
        let [batch_size, seq_len, _] = x.dims();
        let reversed = reversed_positions::<B>(seq_len, &x.device());

        let forward  = self.gru_forward.forward(x.clone(), None);
        let backward = self.gru_backward.forward(x.select(1, reversed.clone()), None);

        let [_, _, hidden] = forward.dims();
        let last = seq_len - 1;
        let forward_last = forward
            .clone()
            .slice([0..batch_size, last..seq_len, 0..hidden])
            .reshape([batch_size, hidden]);
        // The backward pass sees the sequence reversed, so its last step
        // has read the whole text from the end.
        let backward_last = backward
            .clone()
            .slice([0..batch_size, last..seq_len, 0..hidden])
            .reshape([batch_size, hidden]);

        let backward = backward.select(1, reversed);

        (
            Tensor::cat(vec![forward, backward], 2),
            Tensor::cat(vec![forward_last, backward_last], 1),
        )
    }
}

fn reversed_positions<B: Backend>(len: usize, device: &B::Device) -> Tensor<B, 1, Int> {
    let positions: Vec<i32> = (0..len as i32).rev().collect();
    Tensor::<B, 1, Int>::from_ints(positions.as_slice(), device)
}

/// Drops whole embedding channels across every timestep.
fn spatial_dropout<B: Backend>(x: Tensor<B, 3>, prob: f64) -> Tensor<B, 3> {
    if !B::ad_enabled() || prob <= 0.0 {
        return x;
    }

    let [batch_size, seq_len, channels] = x.dims();
    let keep = 1.0 - prob;
    let mask = Tensor::<B, 3>::random(
        [batch_size, 1, channels],
        Distribution::Bernoulli(keep),
        &x.device(),
    )
    .div_scalar(keep)
    .expand([batch_size, seq_len, channels]);

    x * mask
}

fn gaussian_noise<B: Backend>(x: Tensor<B, 3>, std: f64) -> Tensor<B, 3> {
    if !B::ad_enabled() || std <= 0.0 {
        return x;
    }

    let noise = Tensor::<B, 3>::random(x.dims(), Distribution::Normal(0.0, std), &x.device());
    x + noise
}

/// Mean per-class binary cross-entropy, computed from logits:
///   max(x, 0) - x·y + ln(1 + e^{-|x|})
pub fn binary_cross_entropy_with_logits<B: Backend>(
    logits:  Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let loss = logits.clone().clamp_min(0.0)
        - logits.clone() * targets
        + logits.abs().neg().exp().log1p();
    loss.mean()
}

// ─── Weight snapshots ─────────────────────────────────────────────────────────
// The initial weights are serialised to bytes once, before the fold
// loop. Restoring deserialises a fresh record from those bytes, so
// the live model never shares storage with the snapshot.

pub struct ModelSnapshot {
    bytes: Vec<u8>,
}

impl ModelSnapshot {
    pub fn capture<B: Backend>(model: &BiGruClassifier<B>) -> Result<Self> {
        Ok(Self { bytes: weights_bytes(model)? })
    }

    /// Replace every parameter of `model` with the captured values.
    pub fn restore<B: Backend>(
        &self,
        model:  BiGruClassifier<B>,
        device: &B::Device,
    ) -> Result<BiGruClassifier<B>> {
        let record = BinBytesRecorder::<FullPrecisionSettings>::default()
            .load(self.bytes.clone(), device)
            .map_err(|e| anyhow::anyhow!("Cannot restore initial weights: {e}"))?;
        Ok(model.load_record(record))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Full-precision serialisation of every parameter (ids included).
/// Two models with equal bytes are bit-identical.
pub fn weights_bytes<B: Backend>(model: &BiGruClassifier<B>) -> Result<Vec<u8>> {
    BinBytesRecorder::<FullPrecisionSettings>::default()
        .record(model.clone().into_record(), ())
        .map_err(|e| anyhow::anyhow!("Cannot serialise model weights: {e}"))
}
