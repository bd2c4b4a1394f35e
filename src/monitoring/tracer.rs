/*!
 * Structured Tracing
 * Subscriber setup and per-grant spans using the tracing crate
 *
 * Features:
 * - JSON-formatted logs for structured parsing
 * - One span per grant, closed with its hold time
 * - Slow-hold warnings carrying lock, grant and mode fields
 */

use crate::core::types::{GrantId, LockMode};
use std::time::Duration;
use tracing::{debug, info, span, warn, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Environment variable that switches output to JSON
pub const TRACE_JSON_ENV: &str = "RWLOCK_TRACE_JSON";

fn json_requested() -> bool {
    std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
}

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - RWLOCK_TRACE_JSON: Enable JSON output (default: false)
///
/// # Panics
///
/// Panics if a global subscriber is already installed. Use
/// [`try_init_tracing`] where that may happen.
pub fn init_tracing() {
    if let Err(err) = try_init_tracing() {
        panic!("failed to install tracing subscriber: {err}");
    }
}

/// Initialize structured tracing unless a global subscriber already exists
pub fn try_init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json_requested() {
        // JSON output for production/parsing
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?;
        info!("Structured tracing initialized with JSON output");
    } else {
        // Human-readable output for development
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_file(true)
                    .compact(),
            )
            .try_init()?;
        info!("Structured tracing initialized");
    }
    Ok(())
}

/// Span covering one grant from issue to release
pub struct GrantSpan {
    span: Span,
}

impl GrantSpan {
    pub fn new(lock: &str, grant: GrantId, mode: LockMode) -> Self {
        let span = span!(
            Level::DEBUG,
            "grant",
            lock = lock,
            grant = grant.0,
            mode = %mode,
            held_us = tracing::field::Empty,
        );

        Self { span }
    }

    /// Record the hold time, warning when it exceeds `slow`
    pub fn close(&self, held: Duration, slow: Duration) {
        let _entered = self.span.enter();
        self.span.record("held_us", held.as_micros() as u64);

        if held > slow {
            warn!(
                held_ms = held.as_millis() as u64,
                slow = true,
                "grant held past slow threshold"
            );
        } else {
            debug!(held_us = held.as_micros() as u64, "grant closed");
        }
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}
