//! Fetch-start pacing.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Spaces fetch starts at least `interval` apart, however many fetches are
/// in flight. Slots are handed out in call order.
#[derive(Debug)]
pub struct RatePacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RatePacer {
    /// Pacer allowing one start per `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Pacer for a requests-per-second cap. A non-positive cap disables
    /// spacing.
    #[must_use]
    pub fn per_second(requests_per_second: f64) -> Self {
        if requests_per_second.is_finite() && requests_per_second > 0.0 {
            Self::new(Duration::from_secs_f64(1.0 / requests_per_second))
        } else {
            Self::new(Duration::ZERO)
        }
    }

    /// Minimum spacing between starts.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next start slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.interval);
            slot
        };
        sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_slot_is_immediate() {
        let pacer = RatePacer::per_second(2.0);
        let start = Instant::now();
        pacer.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_starts_are_spaced() {
        let pacer = RatePacer::per_second(2.0);
        let start = Instant::now();
        for _ in 0..5 {
            pacer.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_the_cap() {
        let pacer = Arc::new(RatePacer::per_second(4.0));
        let start = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pacer = Arc::clone(&pacer);
                tokio::spawn(async move {
                    pacer.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(250));
        }
        assert!(start.elapsed() >= Duration::from_millis(1750));
    }
}
