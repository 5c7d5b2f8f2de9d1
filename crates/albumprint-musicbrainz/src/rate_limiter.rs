// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Spaces out MusicBrainz requests so at most one starts per `min_interval`.
///
/// Cloned limiters share state, so every clone of a client draws from the
/// same budget.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until a request can be made according to the rate limit.
    ///
    /// The lock is held while sleeping, which queues concurrent callers in
    /// arrival order.
    pub async fn acquire(&self) {
        let mut next_slot = self.next_slot.lock().await;

        if let Some(slot) = *next_slot {
            if slot > Instant::now() {
                tracing::trace!(
                    target: "musicbrainz",
                    "rate limiting: waiting {:?}",
                    slot - Instant::now()
                );
                sleep_until(slot).await;
            }
        }

        *next_slot = Some(Instant::now() + self.min_interval);
    }
}

impl Default for RateLimiter {
    /// One request per second, the MusicBrainz limit for anonymous clients.
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
