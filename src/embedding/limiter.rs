use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::{Instrument, debug_span};

/// Enforces a minimum spacing between consecutive requests
///
/// The quota admits one request per interval with a burst of one, so no two grants
/// are ever closer than the interval. Clones share the same state.
#[derive(Clone)]
pub struct RequestLimiter {
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    interval: Duration,
}

impl RequestLimiter {
    /// Create a limiter with the given spacing; a zero interval admits everything
    pub fn new(interval: Duration) -> Self {
        let limiter = Quota::with_period(interval)
            .map(|quota| Arc::new(RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN))));
        Self { limiter, interval }
    }

    /// The configured spacing
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next slot is available and claim it
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().instrument(debug_span!("limiter")).await;
        }
    }
}

impl std::fmt::Debug for RequestLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLimiter")
            .field("interval", &self.interval)
            .finish()
    }
}
