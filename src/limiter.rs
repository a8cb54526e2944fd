//! Sliding-window admission control with remote-signalled cool-down.
//!
//! Every outbound catalog call passes through [`RateLimiter::admit`], which
//! suspends the caller until the call fits the quota. Two independent gates
//! apply:
//!
//! 1. **Quota window**: at most `quota` admissions in any span of `window`.
//!    The limiter keeps the timestamps of live admissions; when the window is
//!    full the caller sleeps until the oldest one ages out, then re-checks.
//! 2. **Cool-down**: when the remote service reports a rate violation
//!    ([`RateLimiter::on_rate_limited`]) admission is suspended for
//!    `cooldown_base * 2^(n-1)` (capped at `cooldown_max`), where `n` counts
//!    consecutive violations. One successful call
//!    ([`RateLimiter::on_success`]) resets `n`.
//!
//! The two gates exist because the local and remote rate models can
//! disagree. Neither raises errors; the limiter only ever delays.
//!
//! State lives behind a mutex that is never held across an `.await`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::events::{EventSink, NoopEventSink, ResolutionEvent, WaitReason};
use crate::telemetry;

/// Longest cool-down a remote `Retry-After` hint can impose.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Clamp for durations read from configuration or remote hints.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + delay`, saturating instead of overflowing on absurd durations.
pub(crate) fn instant_after(start: Instant, delay: Duration) -> Instant {
    start.checked_add(delay.min(FAR_FUTURE)).unwrap_or(start)
}

/// Configuration for the [`RateLimiter`].
///
/// ```rust
/// # use muninn::RateLimitConfig;
/// # use std::time::Duration;
/// let config = RateLimitConfig::new()
///     .quota(1000)
///     .window(Duration::from_secs(300))
///     .cooldown_base(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum admissions per window. Default: 1000.
    pub quota: usize,
    /// Sliding window length. Default: 300s.
    pub window: Duration,
    /// Cool-down after the first violation. Default: 1s.
    pub cooldown_base: Duration,
    /// Upper bound on the cool-down. Default: 60s.
    pub cooldown_max: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            quota: 1000,
            window: Duration::from_secs(300),
            cooldown_base: Duration::from_secs(1),
            cooldown_max: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of admissions allowed per window.
    pub fn quota(mut self, n: usize) -> Self {
        self.quota = n;
        self
    }

    /// Set the window length.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the cool-down applied after the first violation.
    pub fn cooldown_base(mut self, delay: Duration) -> Self {
        self.cooldown_base = delay;
        self
    }

    /// Set the cool-down cap.
    pub fn cooldown_max(mut self, delay: Duration) -> Self {
        self.cooldown_max = delay;
        self
    }

    /// Cool-down after `violations` consecutive violations (1-indexed).
    ///
    /// `cooldown_base * 2^(violations - 1)`, capped at `cooldown_max`.
    pub fn cooldown_for(&self, violations: u32) -> Duration {
        let exponent = violations.saturating_sub(1);
        self.cooldown_base
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.cooldown_max)
    }
}

enum Admission {
    Granted,
    Wait(Duration, WaitReason),
}

#[derive(Default)]
struct RateState {
    admitted: VecDeque<Instant>,
    cooldown_until: Option<Instant>,
    violations: u32,
}

impl RateState {
    fn try_admit(&mut self, config: &RateLimitConfig, now: Instant) -> Admission {
        if let Some(until) = self.cooldown_until {
            if until > now {
                return Admission::Wait(until - now, WaitReason::Cooldown);
            }
            self.cooldown_until = None;
        }

        while let Some(&oldest) = self.admitted.front() {
            if now.duration_since(oldest) >= config.window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }

        if self.admitted.len() < config.quota {
            self.admitted.push_back(now);
            return Admission::Granted;
        }

        match self.admitted.front() {
            Some(&oldest) => Admission::Wait(
                instant_after(oldest, config.window).saturating_duration_since(now),
                WaitReason::Quota,
            ),
            // quota is clamped to >= 1, so a full window is never empty
            None => Admission::Granted,
        }
    }
}

/// Shared admission gate for all outbound calls.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<RateState>,
    events: Arc<dyn EventSink>,
}

impl RateLimiter {
    /// Create a limiter that reports waits nowhere.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_events(config, Arc::new(NoopEventSink))
    }

    /// Create a limiter that reports `rate_wait` events to `events`.
    pub fn with_events(mut config: RateLimitConfig, events: Arc<dyn EventSink>) -> Self {
        config.quota = config.quota.max(1);
        Self {
            config,
            state: Mutex::new(RateState::default()),
            events,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, RateState> {
        // Critical sections never panic mid-update, so a poisoned lock still
        // guards consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Suspend until a request slot is available, then claim it.
    ///
    /// Cancel-safe: dropping the future before it completes claims nothing.
    pub async fn admit(&self) {
        loop {
            let decision = self.state().try_admit(&self.config, Instant::now());
            match decision {
                Admission::Granted => return,
                Admission::Wait(wait, reason) => {
                    metrics::counter!(telemetry::RATE_WAITS_TOTAL, "reason" => reason.as_str())
                        .increment(1);
                    debug!(
                        wait_ms = wait.as_millis() as u64,
                        reason = reason.as_str(),
                        "rate limiter suspending admission"
                    );
                    self.events
                        .emit(&ResolutionEvent::RateWait { wait, reason });
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Record a rate violation reported by the remote service.
    ///
    /// Starts (or extends) the cool-down and returns its length. A
    /// `retry_after` hint can lengthen the cool-down but never shorten it,
    /// and is capped at [`MAX_RETRY_AFTER`].
    pub fn on_rate_limited(&self, retry_after: Option<Duration>) -> Duration {
        let now = Instant::now();
        let mut state = self.state();
        state.violations = state.violations.saturating_add(1);
        let delay = self
            .config
            .cooldown_for(state.violations)
            .max(retry_after.unwrap_or_default().min(MAX_RETRY_AFTER));
        let until = instant_after(now, delay);
        state.cooldown_until = Some(match state.cooldown_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
        let violations = state.violations;
        drop(state);

        metrics::counter!(telemetry::RATE_LIMIT_SIGNALS_TOTAL).increment(1);
        warn!(
            violations,
            cooldown_ms = delay.as_millis() as u64,
            "remote rate limit signalled, cooling down"
        );
        delay
    }

    /// Record a successful remote call, resetting the violation streak.
    pub fn on_success(&self) {
        let mut state = self.state();
        if state.violations > 0 {
            debug!(
                violations = state.violations,
                "rate limit cool-down reset after success"
            );
            state.violations = 0;
        }
    }

    /// Time left in the current cool-down, if one is active.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        self.state()
            .cooldown_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Number of consecutive rate violations since the last success.
    pub fn consecutive_violations(&self) -> u32 {
        self.state().violations
    }
}
