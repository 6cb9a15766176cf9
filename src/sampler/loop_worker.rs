use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    location::{distance_m, LocationProvider},
    models::LocationSample,
};

use super::{FiringOutcome, SampleSink, SamplerConfig};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const POSITION_TIMEOUT_SECS: u64 = 10;

/// Decides which polled positions become firings.
#[derive(Debug)]
pub(crate) struct FiringGate {
    last_fired_at: Instant,
    reference: Option<LocationSample>,
}

impl FiringGate {
    pub(crate) fn new(armed_at: Instant) -> Self {
        Self {
            last_fired_at: armed_at,
            reference: None,
        }
    }

    /// Returns true when `sample` should fire, and records it if so.
    pub(crate) fn observe(
        &mut self,
        sample: &LocationSample,
        now: Instant,
        config: &SamplerConfig,
    ) -> bool {
        let interval_elapsed = now.duration_since(self.last_fired_at) >= config.min_interval;
        let moved_far_enough = match &self.reference {
            Some(previous) => {
                config.min_distance_m > 0.0
                    && distance_m(previous, sample) >= config.min_distance_m
            }
            None => {
                self.reference = Some(*sample);
                false
            }
        };

        if interval_elapsed || moved_far_enough {
            self.last_fired_at = now;
            self.reference = Some(*sample);
            true
        } else {
            false
        }
    }
}

pub async fn sampling_loop(
    config: SamplerConfig,
    provider: Arc<dyn LocationProvider>,
    sink: Arc<dyn SampleSink>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut gate = FiringGate::new(Instant::now());
    let mut in_flight: JoinSet<FiringOutcome> = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down");
                break;
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    if err.is_panic() {
                        log_error!("sampler firing panicked: {err}");
                    }
                }
            }
            _ = ticker.tick() => {
                let fut = provider.current_position(config.accuracy);
                let fetched = tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    fetched = tokio::time::timeout(Duration::from_secs(POSITION_TIMEOUT_SECS), fut) => fetched,
                };
                let sample = match fetched {
                    Ok(Ok(sample)) => sample,
                    Ok(Err(err)) => {
                        log_warn!("position unavailable: {err}");
                        continue;
                    }
                    Err(_) => {
                        log_warn!("position timeout (> {}s)", POSITION_TIMEOUT_SECS);
                        continue;
                    }
                };

                if !gate.observe(&sample, Instant::now(), &config) {
                    continue;
                }

                // Each firing is independent: a slow submission never delays the next one.
                let sink = Arc::clone(&sink);
                let token = cancel_token.clone();
                in_flight.spawn(async move {
                    let outcome = sink.on_sample(sample).await;
                    if outcome == FiringOutcome::Disarm {
                        token.cancel();
                    }
                    outcome
                });
            }
        }
    }

    if !in_flight.is_empty() {
        log_info!("aborting {} in-flight firing(s)", in_flight.len());
    }
    in_flight.shutdown().await;
}
