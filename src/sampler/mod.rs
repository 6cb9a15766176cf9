use async_trait::async_trait;

use crate::models::LocationSample;

pub mod config;
pub mod controller;
pub mod loop_worker;

pub use config::{ForegroundNotice, SamplerConfig};
pub use controller::LocationSampler;

/// What a firing asks of the sampler once it has handled its sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiringOutcome {
    Submitted,
    Dropped,
    /// Nothing should be tracking any more; the sampler disarms itself.
    Disarm,
}

/// Receives every sampler firing. Runs in the sampler's own context, never
/// sharing memory with whoever armed it.
#[async_trait]
pub trait SampleSink: Send + Sync {
    async fn on_sample(&self, sample: LocationSample) -> FiringOutcome;
}
