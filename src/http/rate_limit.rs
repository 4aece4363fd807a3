//! Request pacing
//!
//! Three policies are supported:
//! - fixed interval: consecutive requests start at least `interval` apart
//! - sliding window: at most `max_requests` within any trailing `per` window
//! - token bucket: GCRA bucket from the governor crate
//!
//! Fixed-interval and sliding-window pacing run on `tokio::time`, so they
//! follow paused/advanced time in tests.

use crate::error::{Error, Result};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Configuration for token-bucket rate limiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per second
    pub requests_per_second: u32,
    /// Burst size (max tokens in bucket)
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 10,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }
}

/// Token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Result<Self> {
        let rps = NonZeroU32::new(config.requests_per_second)
            .ok_or_else(|| Error::invalid_value("requests_per_second", "must be greater than 0"))?;
        let burst = NonZeroU32::new(config.burst_size)
            .ok_or_else(|| Error::invalid_value("burst_size", "must be greater than 0"))?;

        let quota = Quota::per_second(rps).allow_burst(burst);
        Ok(Self {
            limiter: Arc::new(Governor::direct(quota)),
        })
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a permit, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

/// How a client spaces out its requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacingPolicy {
    /// No pacing
    Unlimited,
    /// Minimum delay between the starts of consecutive requests
    FixedInterval(Duration),
    /// At most `max_requests` in any trailing `per` window
    SlidingWindow { max_requests: u32, per: Duration },
    /// Governor token bucket
    TokenBucket(RateLimiterConfig),
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::FixedInterval(Duration::from_millis(100))
    }
}

impl PacingPolicy {
    /// Fixed-interval policy
    pub fn fixed_interval(interval: Duration) -> Self {
        Self::FixedInterval(interval)
    }

    /// Sliding-window policy
    pub fn sliding_window(max_requests: u32, per: Duration) -> Self {
        Self::SlidingWindow { max_requests, per }
    }

    /// Reject quotas that could never admit a request
    pub fn validate(&self) -> Result<()> {
        match self {
            PacingPolicy::SlidingWindow { max_requests, per } => {
                if *max_requests == 0 {
                    return Err(Error::invalid_value(
                        "pacing.max_requests",
                        "must be greater than 0",
                    ));
                }
                if per.is_zero() {
                    return Err(Error::invalid_value(
                        "pacing.per_seconds",
                        "must be greater than 0",
                    ));
                }
                Ok(())
            }
            PacingPolicy::TokenBucket(config) => RateLimiter::new(config).map(|_| ()),
            PacingPolicy::Unlimited | PacingPolicy::FixedInterval(_) => Ok(()),
        }
    }
}

/// Timestamps of recent requests within a trailing window.
///
/// Never holds more than `max_requests` entries.
#[derive(Debug, Clone)]
pub struct RateWindow {
    stamps: VecDeque<Instant>,
    max_requests: usize,
    per: Duration,
}

impl RateWindow {
    pub fn new(max_requests: u32, per: Duration) -> Self {
        let max_requests = max_requests.max(1) as usize;
        Self {
            stamps: VecDeque::with_capacity(max_requests),
            max_requests,
            per,
        }
    }

    /// Drop timestamps that have left the window
    pub fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.stamps.front() {
            if now.saturating_duration_since(oldest) >= self.per {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until another request fits, or `None` if one fits now
    pub fn wait_time(&mut self, now: Instant) -> Option<Duration> {
        self.prune(now);
        if self.stamps.len() < self.max_requests {
            return None;
        }
        self.stamps
            .front()
            .map(|&oldest| (oldest + self.per).saturating_duration_since(now))
    }

    /// Record a request at `now`. Callers must check [`Self::wait_time`] first.
    pub fn record(&mut self, now: Instant) {
        debug_assert!(self.stamps.len() < self.max_requests);
        self.stamps.push_back(now);
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_requests
    }

    pub fn last(&self) -> Option<Instant> {
        self.stamps.back().copied()
    }
}

#[derive(Debug)]
enum PacerState {
    Unlimited,
    Fixed {
        interval: Duration,
        last: Option<Instant>,
    },
    Window(RateWindow),
    Bucket(RateLimiter),
}

/// Point-in-time view of a pacer, for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingSnapshot {
    /// Timestamps currently held in the sliding window (0 for other policies)
    pub window_len: usize,
    /// Start of the most recently admitted request
    pub last_request: Option<Instant>,
    /// Completion of the most recent 2xx response
    pub last_success: Option<Instant>,
}

/// Pacing state owned by one client
#[derive(Debug)]
pub struct Pacer {
    state: PacerState,
    last_request: Option<Instant>,
    last_success: Option<Instant>,
}

impl Pacer {
    /// Create a pacer for the given policy
    pub fn new(policy: &PacingPolicy) -> Result<Self> {
        policy.validate()?;
        let state = match policy {
            PacingPolicy::Unlimited => PacerState::Unlimited,
            PacingPolicy::FixedInterval(interval) => PacerState::Fixed {
                interval: *interval,
                last: None,
            },
            PacingPolicy::SlidingWindow { max_requests, per } => {
                PacerState::Window(RateWindow::new(*max_requests, *per))
            }
            PacingPolicy::TokenBucket(config) => PacerState::Bucket(RateLimiter::new(config)?),
        };
        Ok(Self {
            state,
            last_request: None,
            last_success: None,
        })
    }

    /// Wait until the policy admits another request, then record it.
    ///
    /// Fails with `DeadlineExceeded` without sleeping when the wait would
    /// run past `deadline`.
    pub async fn acquire(&mut self, deadline: Option<Instant>) -> Result<()> {
        if let PacerState::Bucket(limiter) = &self.state {
            match deadline {
                Some(at) => {
                    tokio::time::timeout_at(at, limiter.wait())
                        .await
                        .map_err(|_| deadline_error(at))?;
                }
                None => limiter.wait().await,
            }
            self.last_request = Some(Instant::now());
            return Ok(());
        }

        loop {
            let now = Instant::now();
            let wait = match &mut self.state {
                PacerState::Unlimited | PacerState::Bucket(_) => None,
                PacerState::Fixed { interval, last } => last
                    .map(|last| (last + *interval).saturating_duration_since(now))
                    .filter(|d| !d.is_zero()),
                PacerState::Window(window) => window.wait_time(now).filter(|d| !d.is_zero()),
            };

            match wait {
                None => {
                    self.admit(now);
                    return Ok(());
                }
                Some(delay) => {
                    if let Some(at) = deadline {
                        if now + delay > at {
                            return Err(deadline_error(at));
                        }
                    }
                    debug!("Pacing: waiting {:?} before next request", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn admit(&mut self, now: Instant) {
        match &mut self.state {
            PacerState::Fixed { last, .. } => *last = Some(now),
            PacerState::Window(window) => window.record(now),
            PacerState::Unlimited | PacerState::Bucket(_) => {}
        }
        self.last_request = Some(now);
    }

    /// Note a 2xx completion
    pub fn mark_success(&mut self) {
        self.last_success = Some(Instant::now());
    }

    pub fn snapshot(&self) -> PacingSnapshot {
        let window_len = match &self.state {
            PacerState::Window(window) => window.len(),
            _ => 0,
        };
        PacingSnapshot {
            window_len,
            last_request: self.last_request,
            last_success: self.last_success,
        }
    }
}

fn deadline_error(at: Instant) -> Error {
    let remaining = at.saturating_duration_since(Instant::now());
    Error::deadline(format!("waiting for pacing ({remaining:?} left)"))
}
