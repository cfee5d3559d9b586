use std::sync::Arc;
use tokio::sync::{AcquireError, Semaphore};
use tokio::time::{sleep, Duration, Instant};
use parking_lot::Mutex;

/// Throttles calls to the market data provider.
///
/// Bounds how many fetches run at once and spaces their start times so a
/// multi-symbol request does not trip the provider's own rate limiting.
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    /// Start time of the most recent request
    last_request: Arc<Mutex<Instant>>,
    min_delay: Duration,
}

impl RateLimiter {
    /// `requests_per_minute` of zero is treated as one.
    pub fn new(max_concurrent: usize, requests_per_minute: u32) -> Self {
        let min_delay_ms = 60_000 / requests_per_minute.max(1) as u64;
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            last_request: Arc::new(Mutex::new(Self::start_reference(Instant::now()))),
            min_delay: Duration::from_millis(min_delay_ms),
        }
    }

    /// Reference point a minute before `now`, clamped to `now` when the
    /// monotonic clock has not run that long yet.
    fn start_reference(now: Instant) -> Instant {
        now.checked_sub(Duration::from_secs(60)).unwrap_or(now)
    }

    /// Wait for a free slot and for the minimum spacing since the previous
    /// request. The slot is released when the guard is dropped.
    pub async fn acquire(&self) -> Result<RateLimitGuard, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;

        // Reserve the next start slot under the lock, sleep outside it
        let wait_time = {
            let mut last = self.last_request.lock();
            let now = Instant::now();
            let next = (*last + self.min_delay).max(now);
            *last = next;
            next - now
        };

        if !wait_time.is_zero() {
            sleep(wait_time).await;
        }

        Ok(RateLimitGuard { _permit: permit })
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Holds a concurrency slot until dropped
pub struct RateLimitGuard {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant as StdInstant;

    #[tokio::test]
    async fn test_rate_limiter_enforces_delay() {
        // 60 per minute => one per second
        let limiter = RateLimiter::new(2, 60);

        let start = StdInstant::now();

        let guard1 = limiter.acquire().await.unwrap();
        assert!(start.elapsed().as_millis() < 100, "First request should be immediate");
        drop(guard1);

        let _guard2 = limiter.acquire().await.unwrap();
        assert!(start.elapsed().as_millis() >= 900, "Second request should wait ~1 second");
    }

    #[tokio::test]
    async fn test_concurrent_limit() {
        let limiter = Arc::new(RateLimiter::new(2, 6000));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    let _guard = limiter.acquire().await.unwrap();
                    sleep(Duration::from_millis(50)).await;
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(limiter.available_permits(), 2);
    }

    #[test]
    fn test_start_reference_never_underflows() {
        let now = Instant::now();
        let reference = RateLimiter::start_reference(now);
        assert!(reference <= now);
        assert!(now - reference <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_zero_rate_does_not_panic() {
        let limiter = RateLimiter::new(0, 0);
        let _guard = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available_permits(), 0);
    }
}
