//! Version stamps for discovery responses.
//!
//! A version stamp names one generation of resource content. Callers only
//! ever compare stamps for equality; no ordering is implied.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{SecondsFormat, Utc};

/// Produces the version stamp assigned to a response at build time.
pub trait VersionPolicy: Send + Sync + 'static {
    /// Return a stamp representing the current state of the world.
    fn next_version(&self) -> String;
}

/// Uses the current UTC wall-clock time, RFC 3339 with nanosecond precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClockVersion;

impl VersionPolicy for WallClockVersion {
    fn next_version(&self) -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
    }
}

/// A process-local counter; every call yields a new, never repeated stamp.
#[derive(Debug, Default)]
pub struct CounterVersion {
    next: AtomicU64,
}

impl CounterVersion {
    /// Create a counter starting at 1.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionPolicy for CounterVersion {
    fn next_version(&self) -> String {
        (self.next.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_wall_clock_is_rfc3339() {
        let version = WallClockVersion.next_version();
        assert!(version.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&version).is_ok());
    }

    #[test]
    fn test_counter_never_repeats() {
        let policy = CounterVersion::new();
        assert_eq!(policy.next_version(), "1");
        assert_eq!(policy.next_version(), "2");
        assert_eq!(policy.next_version(), "3");
    }
}
