//! Per-author write throttling.
//!
//! Post creation is limited with a sliding window: an identity may perform at
//! most `max_requests` writes within any trailing `window`. The window moves
//! with every request rather than resetting on wall-clock boundaries.
//!
//! A separate, process-wide [`IngressLimiter`] (GCRA via `governor`) guards the
//! whole HTTP surface and is unrelated to the per-author quota.

use async_trait::async_trait;
use dashmap::DashMap;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as Governor};
use std::{
    collections::VecDeque,
    num::NonZeroU32,
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Writes permitted per window
    pub max_requests: u32,
    /// Length of the trailing window
    pub window: Duration,
    /// When set, denied attempts also occupy the window
    pub count_rejected: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            window: Duration::from_secs(60),
            count_rejected: false,
        }
    }
}

/// Outcome of a single `allow` evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub permitted: bool,
    /// Writes still available in the current window after this one
    pub remaining: u32,
    /// Time until the oldest counted attempt leaves the window, set on denial
    pub retry_after: Option<Duration>,
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit backend unavailable: {0}")]
    Unavailable(String),
}

/// Decides whether an identity may perform another write.
///
/// Implementations must check and record atomically per identity.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn allow(&self, identity: &str) -> Result<RateLimitDecision, RateLimitError>;
}

/// Sliding-window log kept in process memory.
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    attempts: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            attempts: DashMap::new(),
        }
    }

    /// Evaluates a write attempt by `identity` happening at `now`.
    pub fn check_at(&self, identity: &str, now: Instant) -> RateLimitDecision {
        let max = self.config.max_requests as usize;
        let window = self.config.window;

        // The entry guard holds the shard lock for the whole check-and-record.
        let mut log = self.attempts.entry(identity.to_string()).or_default();

        while let Some(&oldest) = log.front() {
            if now.saturating_duration_since(oldest) >= window {
                log.pop_front();
            } else {
                break;
            }
        }

        let permitted = log.len() < max;
        if permitted || self.config.count_rejected {
            log.push_back(now);
            while log.len() > max {
                log.pop_front();
            }
        }

        let retry_after = if permitted {
            None
        } else {
            log.front()
                .map(|&oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
        };

        let decision = RateLimitDecision {
            permitted,
            remaining: max.saturating_sub(log.len()) as u32,
            retry_after,
        };

        debug!(identity, permitted, remaining = decision.remaining, "rate limit evaluated");

        decision
    }

    /// Drops identities with no attempts left inside the window.
    pub fn purge_expired(&self, now: Instant) {
        let window = self.config.window;
        self.attempts.retain(|_, log| {
            log.retain(|&at| now.saturating_duration_since(at) < window);
            !log.is_empty()
        });
    }

    pub fn tracked_identities(&self) -> usize {
        self.attempts.len()
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn allow(&self, identity: &str) -> Result<RateLimitDecision, RateLimitError> {
        Ok(self.check_at(identity, Instant::now()))
    }
}

/// Process-wide request throttle in front of every route.
pub type IngressLimiter = DefaultDirectRateLimiter;

pub fn ingress_limiter(requests_per_second: NonZeroU32) -> IngressLimiter {
    Governor::direct(Quota::per_second(requests_per_second))
}
