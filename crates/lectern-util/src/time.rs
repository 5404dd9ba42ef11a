//! Time utilities for lecternd
//!
//! Everything that needs "now" goes through the [`Clock`] trait so that tests
//! can pin time with a [`ManualClock`]. The service uses [`SystemClock`].
//!
//! # Mock Time for Development
//!
//! In debug builds, the `LECTERN_MOCK_TIME` environment variable can be set
//! to override the system time seen by [`now`] and [`SystemClock`]. The mock
//! time advances at the same rate as real time.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2024-03-20 10:30:00`)
//!
//! Example:
//! ```bash
//! LECTERN_MOCK_TIME="2024-03-20 10:30:00" lecternd
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::sync::{Mutex, OnceLock};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "LECTERN_MOCK_TIME";

/// Naive formats accepted by [`parse_local_datetime`], tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset between mock time and real time, computed once per process.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // Internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match parse_local_datetime(&mock_time_str) {
                    Some(mock_dt) => {
                        let offset = mock_dt.signed_duration_since(chrono::Local::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    None => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time, using system time"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // The wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The real clock (with debug-build mock time support).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Local>) -> Self {
        Self {
            current: Mutex::new(at),
        }
    }

    /// Jump to an absolute instant (may go backwards)
    pub fn set(&self, at: DateTime<Local>) {
        *self.lock() = at;
    }

    /// Move forward by `by`
    pub fn advance(&self, by: chrono::Duration) {
        let mut current = self.lock();
        *current = *current + by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Local>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.lock()
    }
}

/// Parse a timestamp as local time.
///
/// Accepts RFC 3339 (converted to local) or a naive `YYYY-MM-DDTHH:MM[:SS]`
/// form (a space may replace the `T`) interpreted in the local timezone.
/// Returns `None` for unparseable input or a local time that does not exist
/// or is ambiguous (DST transitions).
pub fn parse_local_datetime(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).single())
}

/// Format a DateTime for list display.
pub fn format_datetime_short(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_naive_forms() {
        let expected = Local.with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap();

        for input in [
            "2024-03-20T10:00:00",
            "2024-03-20 10:00:00",
            "2024-03-20T10:00",
            " 2024-03-20 10:00 ",
        ] {
            assert_eq!(
                parse_local_datetime(input),
                Some(expected),
                "failed to parse '{}'",
                input
            );
        }
    }

    #[test]
    fn test_parse_rfc3339() {
        let parsed = parse_local_datetime("2024-03-20T10:00:00Z").unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-03-20T10:00:00+00:00").unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "not a date", "2024/03/20 10:00:00", "14:30:00", "2024-03-20"] {
            assert!(parse_local_datetime(input).is_none(), "accepted '{}'", input);
        }
    }

    #[test]
    fn test_manual_clock() {
        let start = Local.with_ymd_and_hms(2024, 3, 20, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(chrono::Duration::minutes(90));
        assert_eq!(clock.now().hour(), 10);
        assert_eq!(clock.now().minute(), 30);

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_system_clock_returns_time() {
        let t = SystemClock.now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }

    #[test]
    fn test_format_datetime() {
        let dt = Local.with_ymd_and_hms(2024, 3, 21, 14, 30, 45).unwrap();
        assert_eq!(format_datetime_short(&dt), "2024-03-21 14:30");
    }

    #[test]
    fn test_mock_time_env_var_name() {
        assert_eq!(MOCK_TIME_ENV_VAR, "LECTERN_MOCK_TIME");
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_is_mock_time_active_in_debug() {
        // OnceLock makes the env var impossible to toggle here; just make sure it doesn't panic
        let _ = is_mock_time_active();
    }
}
