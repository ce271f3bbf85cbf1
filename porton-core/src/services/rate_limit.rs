//! Per-address login rate limiting.
//!
//! Fixed-window counting keyed by client address, held in process memory.
//! The first attempt from an address opens a window; once the attempt count
//! inside the window reaches the cap, further attempts are refused until the
//! window elapses. A restart forgets all windows, which is acceptable for a
//! perimeter throttle; the per-account lockout is the durable defence.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    /// Refused; retry once `retry_after` has elapsed.
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// In-memory fixed-window limiter. Cheap to clone the handle via `Arc`;
/// the map itself is shared and sharded-locked.
pub struct LoginRateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl LoginRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    /// Count one attempt against the key and decide admission.
    ///
    /// Every call increments; refused attempts still consume the entry-level
    /// lock but do not extend the window.
    pub fn try_acquire(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window {
                started_at: now,
                count: 0,
            });

        // Window elapsed: start a fresh one.
        if now - entry.started_at >= self.config.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= self.config.max_attempts {
            let retry_after = entry.started_at + self.config.window - now;
            return RateLimitDecision::Limited { retry_after };
        }

        entry.count += 1;
        RateLimitDecision::Allowed
    }

    /// Drop windows that have fully elapsed. Called by the periodic cleanup
    /// task to keep the map from accumulating one entry per address seen.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now - window.started_at < self.config.window);
        before - self.windows.len()
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
