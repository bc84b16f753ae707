//! Fixed-window request rate limiting per caller identifier.
//!
//! Independent of subscription quota accounting: the limiter bounds burst
//! traffic inside a rolling 24-hour window, while the quota manager tracks
//! calendar usage. Windows are created lazily on first check and reset only
//! once `now` passes the window's reset time.
//!
//! `check` and `consume` are separate calls by contract, so two truly
//! concurrent requests from the same identifier can both pass `check`
//! before either `consume` lands. Within this process each call is atomic
//! under the window mutex; coordinating across processes needs a shared
//! atomic counter backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::types::Tier;

/// Per-identifier request count within the current window.
#[derive(Debug, Clone)]
struct RateWindow {
    count: u32,
    reset_at: Instant,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq)]
pub struct RateDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Time until the window resets.
    pub reset_in: Duration,
    /// Why the request was denied, when it was.
    pub reason: Option<String>,
}

/// Sliding fixed-window rate limiter keyed by caller identifier.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter with the given window length.
    pub fn new(window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Requests allowed per window for a tier.
    pub fn max_requests(tier: Tier) -> u32 {
        match tier {
            Tier::Free => 50,
            Tier::Pro => 500,
            Tier::Enterprise => 10_000,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateWindow>> {
        // Degrade open on poisoning: the limiter must never become the
        // availability outage it exists to prevent.
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fetch the identifier's window, resetting it if its time has passed
    /// or creating it lazily on first sight.
    fn window_for<'a>(
        windows: &'a mut HashMap<String, RateWindow>,
        identifier: &str,
        window_len: Duration,
        now: Instant,
    ) -> &'a mut RateWindow {
        let entry = windows
            .entry(identifier.to_string())
            .or_insert_with(|| RateWindow {
                count: 0,
                reset_at: now + window_len,
            });
        if now > entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + window_len;
        }
        entry
    }

    /// Check whether one more request from `identifier` would be allowed.
    pub fn check(&self, identifier: &str, tier: Tier) -> RateDecision {
        self.check_batch(identifier, 1, tier)
    }

    /// Pre-flight check for a fan-out of `n` requests. Denies when the
    /// window cannot absorb all `n`, reporting how many are still available.
    pub fn check_batch(&self, identifier: &str, n: u32, tier: Tier) -> RateDecision {
        let max = Self::max_requests(tier);
        let now = Instant::now();
        let mut windows = self.lock();
        let entry = Self::window_for(&mut windows, identifier, self.window, now);
        let remaining = max.saturating_sub(entry.count);
        let reset_in = entry.reset_at.saturating_duration_since(now);

        if entry.count + n > max {
            RateDecision {
                allowed: false,
                remaining,
                reset_in,
                reason: Some(format!(
                    "window limit reached: {n} requested, {remaining} available of {max}"
                )),
            }
        } else {
            RateDecision {
                allowed: true,
                remaining,
                reset_in,
                reason: None,
            }
        }
    }

    /// Check and, when allowed, consume one request in a single lock
    /// acquisition. Closes the check/consume race for callers that do not
    /// need to separate the two.
    pub fn check_and_consume(&self, identifier: &str, tier: Tier) -> RateDecision {
        let max = Self::max_requests(tier);
        let now = Instant::now();
        let mut windows = self.lock();
        let entry = Self::window_for(&mut windows, identifier, self.window, now);
        let reset_in = entry.reset_at.saturating_duration_since(now);

        if entry.count >= max {
            RateDecision {
                allowed: false,
                remaining: 0,
                reset_in,
                reason: Some(format!("window limit of {max} requests reached")),
            }
        } else {
            entry.count += 1;
            RateDecision {
                allowed: true,
                remaining: max - entry.count,
                reset_in,
                reason: None,
            }
        }
    }

    /// Record one consumed request for `identifier`.
    pub fn consume(&self, identifier: &str) {
        self.consume_n(identifier, 1);
    }

    /// Record `n` consumed requests (fan-out accounting).
    pub fn consume_n(&self, identifier: &str, n: u32) {
        let now = Instant::now();
        let mut windows = self.lock();
        let entry = Self::window_for(&mut windows, identifier, self.window, now);
        entry.count += n;
    }

    /// Drop windows whose reset time has passed, bounding memory.
    /// Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, w| now <= w.reset_at);
        let removed = before - windows.len();
        if removed > 0 {
            tracing::debug!(removed, "rate limiter cleanup removed stale windows");
        }
        removed
    }

    /// Spawn a background task that runs [`cleanup`](Self::cleanup) every
    /// `interval`.
    pub fn spawn_cleanup(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                limiter.cleanup();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_limiter() -> RateLimiter {
        RateLimiter::new(Duration::from_secs(24 * 60 * 60))
    }

    #[test]
    fn tier_limits_strictly_increase() {
        assert!(RateLimiter::max_requests(Tier::Enterprise) > RateLimiter::max_requests(Tier::Pro));
        assert!(RateLimiter::max_requests(Tier::Pro) > RateLimiter::max_requests(Tier::Free));
    }

    #[test]
    fn first_check_is_allowed_with_full_remaining() {
        let limiter = make_limiter();
        let decision = limiter.check("alice", Tier::Free);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 50);
        assert!(decision.reason.is_none());
    }

    #[test]
    fn sequential_consumes_reduce_remaining_exactly() {
        let limiter = make_limiter();
        for _ in 0..7 {
            limiter.consume("alice");
        }
        let decision = limiter.check("alice", Tier::Free);
        assert_eq!(decision.remaining, 43);
    }

    #[test]
    fn check_denies_at_limit() {
        let limiter = make_limiter();
        for _ in 0..50 {
            limiter.consume("alice");
        }
        let decision = limiter.check("alice", Tier::Free);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.reason.is_some());
    }

    #[test]
    fn remaining_never_goes_below_zero() {
        let limiter = make_limiter();
        for _ in 0..60 {
            limiter.consume("alice");
        }
        let decision = limiter.check("alice", Tier::Free);
        assert_eq!(decision.remaining, 0);
        assert!(!decision.allowed);
    }

    #[test]
    fn identifiers_are_independent() {
        let limiter = make_limiter();
        for _ in 0..50 {
            limiter.consume("alice");
        }
        assert!(!limiter.check("alice", Tier::Free).allowed);
        assert!(limiter.check("bob", Tier::Free).allowed);
    }

    #[test]
    fn higher_tier_allows_more() {
        let limiter = make_limiter();
        for _ in 0..50 {
            limiter.consume("carol");
        }
        assert!(!limiter.check("carol", Tier::Free).allowed);
        assert!(limiter.check("carol", Tier::Pro).allowed);
    }

    #[test]
    fn check_batch_denies_when_window_cannot_absorb_all() {
        let limiter = make_limiter();
        for _ in 0..47 {
            limiter.consume("alice");
        }
        let decision = limiter.check_batch("alice", 5, Tier::Free);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 3);
        let reason = decision.reason.expect("denial carries a reason");
        assert!(reason.contains("3 available"));
    }

    #[test]
    fn check_batch_allows_exact_fit() {
        let limiter = make_limiter();
        for _ in 0..45 {
            limiter.consume("alice");
        }
        assert!(limiter.check_batch("alice", 5, Tier::Free).allowed);
    }

    #[test]
    fn check_and_consume_is_exact_at_the_boundary() {
        let limiter = make_limiter();
        for _ in 0..50 {
            assert!(limiter.check_and_consume("alice", Tier::Free).allowed);
        }
        let decision = limiter.check_and_consume("alice", Tier::Free);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(Duration::from_millis(30));
        for _ in 0..50 {
            limiter.consume("alice");
        }
        assert!(!limiter.check("alice", Tier::Free).allowed);

        std::thread::sleep(Duration::from_millis(50));
        let decision = limiter.check("alice", Tier::Free);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 50);
    }

    #[test]
    fn cleanup_drops_expired_windows_only() {
        let limiter = RateLimiter::new(Duration::from_millis(10));
        limiter.consume("stale");
        std::thread::sleep(Duration::from_millis(30));

        // A fresh consume creates a new window after the old one expired.
        let fresh = RateLimiter::new(Duration::from_secs(3600));
        fresh.consume("live");

        assert_eq!(limiter.cleanup(), 1);
        assert_eq!(fresh.cleanup(), 0);
    }

    #[test]
    fn reset_in_reports_window_remainder() {
        let limiter = RateLimiter::new(Duration::from_secs(3600));
        let decision = limiter.check("alice", Tier::Free);
        assert!(decision.reset_in <= Duration::from_secs(3600));
        assert!(decision.reset_in > Duration::from_secs(3590));
    }
}
