//! Lifecycle events for audit and observability.
//!
//! The engine reports what it does through an [`EventSink`]. Emission is
//! synchronous and fire-and-forget: the engine never waits on a sink and
//! never looks at what a sink does with an event. Sinks that need to do
//! I/O should hand the event off (e.g. to a channel) and return.

use std::time::Duration;

use tracing::{debug, info, warn};

/// Why admission was suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// The local sliding window is full.
    Quota,
    /// The remote service signalled a rate violation.
    Cooldown,
}

impl WaitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitReason::Quota => "quota",
            WaitReason::Cooldown => "cooldown",
        }
    }
}

/// An informational event emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionEvent {
    CacheHit { key: String },
    CacheMiss { key: String },
    RateWait { wait: Duration, reason: WaitReason },
    Resolved { key: String, catalog_id: u64, queries: usize },
    Ambiguous { key: String, candidates: usize, queries: usize },
    Failed { key: String, reason: String, queries: usize },
}

impl ResolutionEvent {
    /// Event name: `cache_hit`, `cache_miss`, `rate_wait`, `resolved`,
    /// `ambiguous` or `failed`.
    pub fn name(&self) -> &'static str {
        match self {
            ResolutionEvent::CacheHit { .. } => "cache_hit",
            ResolutionEvent::CacheMiss { .. } => "cache_miss",
            ResolutionEvent::RateWait { .. } => "rate_wait",
            ResolutionEvent::Resolved { .. } => "resolved",
            ResolutionEvent::Ambiguous { .. } => "ambiguous",
            ResolutionEvent::Failed { .. } => "failed",
        }
    }
}

/// Consumer of engine events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ResolutionEvent);
}

/// Default sink: writes every event as a `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &ResolutionEvent) {
        match event {
            ResolutionEvent::CacheHit { key } => debug!(event = "cache_hit", %key),
            ResolutionEvent::CacheMiss { key } => debug!(event = "cache_miss", %key),
            ResolutionEvent::RateWait { wait, reason } => info!(
                event = "rate_wait",
                wait_ms = wait.as_millis() as u64,
                reason = reason.as_str(),
                "admission suspended"
            ),
            ResolutionEvent::Resolved {
                key,
                catalog_id,
                queries,
            } => debug!(event = "resolved", %key, catalog_id, queries),
            ResolutionEvent::Ambiguous {
                key,
                candidates,
                queries,
            } => info!(event = "ambiguous", %key, candidates, queries),
            ResolutionEvent::Failed {
                key,
                reason,
                queries,
            } => warn!(event = "failed", %key, %reason, queries),
        }
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &ResolutionEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names() {
        let wait = ResolutionEvent::RateWait {
            wait: Duration::from_secs(1),
            reason: WaitReason::Quota,
        };
        assert_eq!(wait.name(), "rate_wait");
        assert_eq!(
            ResolutionEvent::CacheMiss { key: "k".into() }.name(),
            "cache_miss"
        );
    }

    #[test]
    fn tracing_sink_accepts_all_events() {
        let sink = TracingEventSink;
        sink.emit(&ResolutionEvent::Failed {
            key: "\"x\"".into(),
            reason: "no match".into(),
            queries: 1,
        });
        sink.emit(&ResolutionEvent::RateWait {
            wait: Duration::from_millis(5),
            reason: WaitReason::Cooldown,
        });
    }
}
