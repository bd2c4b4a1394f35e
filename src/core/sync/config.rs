/*!
 * Lock Configuration
 *
 * Per-instance settings for queue bounds and diagnostics
 */

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default label used in tracing output
pub const DEFAULT_LOCK_NAME: &str = "rwlock";

/// Lock configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Label attached to every tracing event for this lock
    pub name: String,
    /// Maximum queued requests; `None` means unbounded
    pub max_pending: Option<usize>,
    /// Log contained entry point failures at `warn`
    pub log_failures: bool,
    /// Grants held longer than this are reported as slow on release
    pub slow_hold: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_LOCK_NAME.to_string(),
            max_pending: None,
            log_failures: true,
            slow_hold: Duration::from_secs(1),
        }
    }
}

impl LockConfig {
    /// Configuration with a custom tracing label
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Configuration that rejects submissions beyond `max_pending` queued requests
    pub fn bounded(max_pending: usize) -> Self {
        Self {
            max_pending: Some(max_pending),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_pending(mut self, max_pending: Option<usize>) -> Self {
        self.max_pending = max_pending;
        self
    }

    pub fn with_log_failures(mut self, log_failures: bool) -> Self {
        self.log_failures = log_failures;
        self
    }

    pub fn with_slow_hold(mut self, slow_hold: Duration) -> Self {
        self.slow_hold = slow_hold;
        self
    }

    /// Limit that a queue of `pending` requests has reached, if any
    ///
    /// `Some(limit)` means one more queued request would exceed the bound.
    #[inline]
    pub(crate) fn reached_limit(&self, pending: usize) -> Option<usize> {
        self.max_pending.filter(|&limit| pending >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LockConfig::default();
        assert_eq!(config.name, DEFAULT_LOCK_NAME);
        assert_eq!(config.max_pending, None);
        assert!(config.log_failures);
        assert_eq!(config.reached_limit(usize::MAX - 1), None);
    }

    #[test]
    fn test_bounded() {
        let config = LockConfig::bounded(2).with_name("cache");
        assert_eq!(config.name, "cache");
        assert_eq!(config.reached_limit(0), None);
        assert_eq!(config.reached_limit(1), None);
        assert_eq!(config.reached_limit(2), Some(2));
        assert_eq!(config.reached_limit(5), Some(2));
    }

    #[test]
    fn test_zero_bound_never_queues() {
        assert_eq!(LockConfig::bounded(0).reached_limit(0), Some(0));
    }

    #[test]
    fn test_partial_deserialize() {
        let config: LockConfig = serde_json::from_str(r#"{"name":"index","max_pending":16}"#).unwrap();
        assert_eq!(config.name, "index");
        assert_eq!(config.max_pending, Some(16));
        assert!(config.log_failures);
        assert_eq!(config.slow_hold, Duration::from_secs(1));
    }
}
