//! # Shared Rate Limiter
//!
//! The tagging service allows 5 mutating requests per second per account.
//! One [`RateLimiter`] is shared by every region and every concurrent
//! reconciler task, so the aggregate call rate stays under that quota.
//!
//! ## Algorithm
//!
//! Generic cell rate: each reservation pushes a theoretical arrival time
//! (`tat`) forward by one emission interval `T = 1 / per_second`. A caller
//! may proceed once `now >= tat - (burst - 1) * T`. With `burst = 1`, N back
//! to back callers are released at `0, T, 2T, ... (N-1)T`.
//!
//! Times come from `tokio::time`, so tests can drive the limiter with a
//! paused clock.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::ConfigError;

/// Rate limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Sustained calls per second.
    pub per_second: f64,
    /// Calls that may go out back to back before pacing starts.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 5.0,
            burst: 1,
        }
    }
}

/// Longest accepted gap between two calls.
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

impl RateLimitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pacing().map(|_| ())
    }

    /// Emission interval and burst tolerance, both checked against overflow.
    fn pacing(&self) -> Result<(Duration, Duration), ConfigError> {
        if !self.per_second.is_finite() || self.per_second <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(format!(
                "per_second must be positive, got {}",
                self.per_second
            )));
        }
        if self.burst == 0 {
            return Err(ConfigError::InvalidRateLimit("burst must be at least 1".into()));
        }
        let interval = Duration::try_from_secs_f64(1.0 / self.per_second)
            .ok()
            .filter(|interval| *interval <= MAX_INTERVAL)
            .ok_or_else(|| {
                ConfigError::InvalidRateLimit(format!(
                    "per_second {} is below one call per {}s",
                    self.per_second,
                    MAX_INTERVAL.as_secs()
                ))
            })?;
        let tolerance = interval.checked_mul(self.burst - 1).ok_or_else(|| {
            ConfigError::InvalidRateLimit(format!(
                "burst {} at {}/s overflows the burst window",
                self.burst, self.per_second
            ))
        })?;
        Ok((interval, tolerance))
    }
}

/// The wait for a token was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limiter wait cancelled")]
    Cancelled,
}

/// Token-bucket limiter shared across tasks.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    tolerance: Duration,
    tat: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Result<Self, ConfigError> {
        let (interval, tolerance) = config.pacing()?;
        Ok(Self {
            interval,
            tolerance,
            tat: Mutex::new(None),
        })
    }

    /// Time between two calls once the burst is spent.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next slot. Returns when the caller may proceed and the
    /// `tat` this reservation produced.
    fn reserve(&self, now: Instant) -> (Instant, Instant) {
        let mut tat = self.tat.lock();
        let start = tat.map_or(now, |t| t.max(now));
        let ready_at = start.checked_sub(self.tolerance).map_or(now, |t| t.max(now));
        let next = start + self.interval;
        *tat = Some(next);
        (ready_at, next)
    }

    /// Hand back a reservation that will not be used, unless a later
    /// reservation has already been stacked on top of it.
    fn unreserve(&self, reserved: Instant) {
        let mut tat = self.tat.lock();
        if *tat == Some(reserved) {
            *tat = reserved.checked_sub(self.interval);
        }
    }

    /// Wait until a call may be dispatched.
    ///
    /// Returns [`RateLimitError::Cancelled`] if `cancel` fires first; the
    /// reservation is then returned to the bucket.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), RateLimitError> {
        if cancel.is_cancelled() {
            return Err(RateLimitError::Cancelled);
        }

        let now = Instant::now();
        let (ready_at, reserved) = self.reserve(now);
        if ready_at <= now {
            return Ok(());
        }

        tracing::trace!(delay = ?(ready_at - now), "waiting for rate limiter");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.unreserve(reserved);
                Err(RateLimitError::Cancelled)
            }
            _ = tokio::time::sleep_until(ready_at) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_second: f64, burst: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig { per_second, burst }).unwrap()
    }

    /// The paused clock advances in whole timer ticks.
    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = Instant::now() - start;
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    #[test]
    fn rejects_non_positive_rate() {
        for per_second in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(RateLimiter::new(RateLimitConfig { per_second, burst: 1 }).is_err());
        }
        assert!(RateLimiter::new(RateLimitConfig { per_second: 1.0, burst: 0 }).is_err());
    }

    #[test]
    fn vanishing_rate_is_rejected_without_panicking() {
        for per_second in [1e-20, f64::MIN_POSITIVE, 1e-9] {
            let config = RateLimitConfig { per_second, burst: 1 };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidRateLimit(_))));
            assert!(matches!(RateLimiter::new(config), Err(ConfigError::InvalidRateLimit(_))));
        }
        let huge_burst = RateLimitConfig { per_second: 1e-9, burst: u32::MAX };
        assert!(matches!(RateLimiter::new(huge_burst), Err(ConfigError::InvalidRateLimit(_))));
    }

    #[test]
    fn hourly_rate_with_largest_burst_is_accepted() {
        let limiter = RateLimiter::new(RateLimitConfig {
            per_second: 1.0 / 3600.0,
            burst: u32::MAX,
        })
        .unwrap();
        assert!(limiter.interval() >= Duration::from_secs(3599));
        assert!(limiter.interval() <= MAX_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_is_immediate() {
        let limiter = limiter(5.0, 1);
        let start = Instant::now();
        limiter.wait(&CancellationToken::new()).await.unwrap();
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_calls_are_spaced_by_interval() {
        let limiter = limiter(5.0, 1);
        let cancel = CancellationToken::new();
        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait(&cancel).await.unwrap();
        }
        assert!(Instant::now() - start >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_allows_back_to_back_calls() {
        let limiter = limiter(5.0, 3);
        let cancel = CancellationToken::new();
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait(&cancel).await.unwrap();
        }
        assert_eq!(Instant::now(), start);

        limiter.wait(&cancel).await.unwrap();
        assert_elapsed(start, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_does_not_bank_beyond_burst() {
        let limiter = limiter(5.0, 1);
        let cancel = CancellationToken::new();
        limiter.wait(&cancel).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let start = Instant::now();
        limiter.wait(&cancel).await.unwrap();
        limiter.wait(&cancel).await.unwrap();
        assert_elapsed(start, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_fails_without_reserving() {
        let limiter = limiter(5.0, 1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(limiter.wait(&cancel).await, Err(RateLimitError::Cancelled));

        let start = Instant::now();
        limiter.wait(&CancellationToken::new()).await.unwrap();
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_wait_returns_the_slot() {
        let limiter = std::sync::Arc::new(limiter(1.0, 1));
        let start = Instant::now();
        limiter.wait(&CancellationToken::new()).await.unwrap();

        let cancel = CancellationToken::new();
        let waiting = {
            let limiter = std::sync::Arc::clone(&limiter);
            let cancel = cancel.clone();
            tokio::spawn(async move { limiter.wait(&cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        assert_eq!(waiting.await.unwrap(), Err(RateLimitError::Cancelled));

        // The abandoned slot at t=1s is free again.
        limiter.wait(&CancellationToken::new()).await.unwrap();
        assert_elapsed(start, Duration::from_secs(1));
    }
}
