// ============================================================
// Layer 5 — Backend Session
// ============================================================
// Explicit execution context for one pipeline run. Everything that
// creates tensors receives the session (or its device) as an
// argument; nothing reaches for a process-wide default.
//
// Lifecycle:
//   Session::init(device, seed)  → seeds the backend RNG
//   ...training / inference...
//   session.teardown()           → consumes the session

use burn::prelude::*;

pub struct Session<B: Backend> {
    device: B::Device,
    seed:   u64,
}

impl<B: Backend> Session<B> {
    pub fn init(device: B::Device, seed: u64) -> Self {
        B::seed(seed);
        tracing::info!("Backend session started on {:?} (seed={})", device, seed);
        Self { device, seed }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// End the session. Models built on it must already be dropped.
    pub fn teardown(self) {
        tracing::info!("Backend session on {:?} released", self.device);
    }
}
