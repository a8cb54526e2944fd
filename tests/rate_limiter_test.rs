//! Tests for [`RateLimiter`]: sliding-window quota and remote cool-down.
//!
//! All tests run on tokio's paused clock so waits are exact.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use muninn::{
    EventSink, MAX_RETRY_AFTER, RateLimitConfig, RateLimiter, ResolutionEvent, WaitReason,
};

fn limiter(quota: usize, window_secs: u64) -> RateLimiter {
    RateLimiter::new(
        RateLimitConfig::new()
            .quota(quota)
            .window(Duration::from_secs(window_secs)),
    )
}

#[derive(Default)]
struct WaitRecorder {
    waits: Mutex<Vec<(Duration, WaitReason)>>,
}

impl EventSink for WaitRecorder {
    fn emit(&self, event: &ResolutionEvent) {
        if let ResolutionEvent::RateWait { wait, reason } = event {
            self.waits.lock().unwrap().push((*wait, *reason));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn admits_up_to_quota_without_waiting() {
    let limiter = limiter(5, 300);
    let start = Instant::now();
    for _ in 0..5 {
        limiter.admit().await;
    }
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn waits_exactly_until_oldest_leaves_window() {
    let limiter = limiter(2, 300);
    let start = Instant::now();
    limiter.admit().await;
    tokio::time::advance(Duration::from_secs(100)).await;
    limiter.admit().await;

    limiter.admit().await;
    assert_eq!(start.elapsed(), Duration::from_secs(300));
}

#[tokio::test(start_paused = true)]
async fn no_window_ever_exceeds_quota() {
    let quota = 3;
    let window = Duration::from_secs(10);
    let limiter = Arc::new(limiter(quota, 10));

    let mut handles = Vec::new();
    for _ in 0..12 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            limiter.admit().await;
            Instant::now()
        }));
    }
    let mut admitted = Vec::new();
    for handle in handles {
        admitted.push(handle.await.unwrap());
    }
    admitted.sort();

    let mut live: VecDeque<Instant> = VecDeque::new();
    for at in admitted {
        while live.front().is_some_and(|oldest| at.duration_since(*oldest) >= window) {
            live.pop_front();
        }
        live.push_back(at);
        assert!(live.len() <= quota, "window held {} admissions", live.len());
    }
}

#[tokio::test(start_paused = true)]
async fn cooldown_doubles_per_violation_and_caps() {
    let limiter = RateLimiter::new(
        RateLimitConfig::new()
            .cooldown_base(Duration::from_secs(1))
            .cooldown_max(Duration::from_secs(5)),
    );
    assert_eq!(limiter.on_rate_limited(None), Duration::from_secs(1));
    assert_eq!(limiter.on_rate_limited(None), Duration::from_secs(2));
    assert_eq!(limiter.on_rate_limited(None), Duration::from_secs(4));
    assert_eq!(limiter.on_rate_limited(None), Duration::from_secs(5));
    assert_eq!(limiter.consecutive_violations(), 4);
}

#[tokio::test(start_paused = true)]
async fn one_success_resets_cooldown_to_base() {
    let limiter = RateLimiter::new(RateLimitConfig::new().cooldown_base(Duration::from_secs(1)));
    limiter.on_rate_limited(None);
    limiter.on_rate_limited(None);
    limiter.on_success();

    assert_eq!(limiter.consecutive_violations(), 0);
    assert_eq!(limiter.on_rate_limited(None), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn admission_blocks_during_cooldown() {
    let limiter = RateLimiter::new(RateLimitConfig::new().cooldown_base(Duration::from_secs(2)));
    limiter.on_rate_limited(None);
    assert_eq!(limiter.cooldown_remaining(), Some(Duration::from_secs(2)));

    let start = Instant::now();
    limiter.admit().await;
    assert_eq!(start.elapsed(), Duration::from_secs(2));
    assert_eq!(limiter.cooldown_remaining(), None);
}

#[tokio::test(start_paused = true)]
async fn retry_after_lengthens_but_never_shortens() {
    let limiter = RateLimiter::new(RateLimitConfig::new().cooldown_base(Duration::from_secs(4)));
    assert_eq!(
        limiter.on_rate_limited(Some(Duration::from_secs(1))),
        Duration::from_secs(4)
    );
    limiter.on_success();
    assert_eq!(
        limiter.on_rate_limited(Some(Duration::from_secs(30))),
        Duration::from_secs(30)
    );
}

#[tokio::test(start_paused = true)]
async fn waits_are_reported_to_the_event_sink() {
    let recorder = Arc::new(WaitRecorder::default());
    let limiter = RateLimiter::with_events(
        RateLimitConfig::new()
            .quota(1)
            .window(Duration::from_secs(60))
            .cooldown_base(Duration::from_secs(1)),
        recorder.clone(),
    );

    limiter.admit().await;
    limiter.admit().await;
    limiter.on_rate_limited(None);
    limiter.admit().await;

    let waits = recorder.waits.lock().unwrap().clone();
    assert_eq!(
        waits,
        vec![
            (Duration::from_secs(60), WaitReason::Quota),
            (Duration::from_secs(1), WaitReason::Cooldown),
            (Duration::from_secs(59), WaitReason::Quota),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn absurd_retry_after_is_capped() {
    let limiter = RateLimiter::new(RateLimitConfig::new());
    let cooldown = limiter.on_rate_limited(Some(Duration::from_secs(u64::MAX)));

    assert_eq!(cooldown, MAX_RETRY_AFTER);
    assert_eq!(limiter.cooldown_remaining(), Some(MAX_RETRY_AFTER));
}
