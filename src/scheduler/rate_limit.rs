//! Process-wide outbound request pacing

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::info;

/// Timestamps gating the next dispatch
#[derive(Debug, Default, Clone, Copy)]
pub struct RateLimitState {
    /// When the last request went out
    pub last_request_at: Option<Instant>,
    /// No request may go out before this instant
    pub cooldown_until: Option<Instant>,
}

/// Shared pacing state between the scheduler and the resolver bridge
#[derive(Debug, Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<RateLimitState>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(RateLimitState::default())),
            min_interval,
        }
    }

    /// Remaining cooldown, clearing it once it has elapsed
    pub async fn cooldown_remaining(&self) -> Option<Duration> {
        let mut state = self.state.lock().await;
        let until = state.cooldown_until?;
        let now = Instant::now();
        if now < until {
            Some(until - now)
        } else {
            state.cooldown_until = None;
            None
        }
    }

    /// Time left before the minimum spacing since the last dispatch is met
    pub async fn spacing_remaining(&self) -> Option<Duration> {
        let state = self.state.lock().await;
        let elapsed = state.last_request_at?.elapsed();
        let remaining = self.min_interval.saturating_sub(elapsed);
        (!remaining.is_zero()).then_some(remaining)
    }

    /// Records that a request is being sent now
    pub async fn record_dispatch(&self) {
        self.state.lock().await.last_request_at = Some(Instant::now());
    }

    /// Pauses dispatching until the given reset time (epoch seconds)
    ///
    /// A reset time already in the past leaves the state untouched.
    pub async fn cooldown_until_epoch(&self, reset_time: i64) {
        let remaining_ms = reset_time
            .saturating_mul(1000)
            .saturating_sub(Utc::now().timestamp_millis());
        if remaining_ms <= 0 {
            return;
        }

        let until = Instant::now() + Duration::from_millis(remaining_ms as u64);
        let mut state = self.state.lock().await;
        // Keep whichever cooldown ends later
        if state.cooldown_until.map_or(true, |current| current < until) {
            state.cooldown_until = Some(until);
        }
        info!(
            resume_in_minutes = (remaining_ms as u64).div_ceil(60_000),
            "rate limited; pausing location requests"
        );
    }

    pub async fn state(&self) -> RateLimitState {
        *self.state.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    #[tokio::test(start_paused = true)]
    async fn test_spacing_remaining_counts_down() {
        let limiter = RateLimiter::new(Duration::from_millis(800));
        assert!(limiter.spacing_remaining().await.is_none());

        limiter.record_dispatch().await;
        assert_eq!(limiter.spacing_remaining().await, Some(Duration::from_millis(800)));

        time::advance(Duration::from_millis(300)).await;
        assert_eq!(limiter.spacing_remaining().await, Some(Duration::from_millis(500)));

        time::advance(Duration::from_millis(500)).await;
        assert!(limiter.spacing_remaining().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_clears_after_elapsing() {
        let limiter = RateLimiter::new(Duration::from_millis(800));
        limiter.cooldown_until_epoch(Utc::now().timestamp() + 120).await;

        let remaining = limiter.cooldown_remaining().await.expect("cooldown active");
        assert!(remaining > Duration::from_secs(118));
        assert!(remaining <= Duration::from_secs(120));

        time::advance(Duration::from_secs(121)).await;
        assert!(limiter.cooldown_remaining().await.is_none());
        assert!(limiter.state().await.cooldown_until.is_none());
    }

    #[tokio::test]
    async fn test_past_reset_time_is_ignored() {
        let limiter = RateLimiter::new(Duration::from_millis(800));
        limiter.cooldown_until_epoch(Utc::now().timestamp() - 5).await;
        assert!(limiter.cooldown_remaining().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shorter_cooldown_does_not_shorten_active_one() {
        let limiter = RateLimiter::new(Duration::from_millis(800));
        let now = Utc::now().timestamp();
        limiter.cooldown_until_epoch(now + 300).await;
        limiter.cooldown_until_epoch(now + 60).await;

        let remaining = limiter.cooldown_remaining().await.unwrap();
        assert!(remaining > Duration::from_secs(200));
    }
}
