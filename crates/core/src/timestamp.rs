//! UTC timestamp type.
//!
//! Every version record carries a [`Timestamp`] recording when it was
//! created. Internally this wraps [`chrono::DateTime<Utc>`] at microsecond
//! precision; externally it renders as ISO-8601 (`to_rfc3339`), matching
//! the wire format required by spec §3 and §6.2.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time, UTC, microsecond precision.
///
/// ## Invariants
///
/// - Always UTC; there is no local-time variant.
/// - Orderable and comparable (`Ord`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current moment, per the system clock.
    pub fn now() -> Self {
        Timestamp(Utc::now())
    }

    /// Construct from microseconds since the Unix epoch.
    pub fn from_micros(micros: i64) -> Self {
        Timestamp(DateTime::from_timestamp_micros(micros).unwrap_or_default())
    }

    /// Microseconds since the Unix epoch.
    pub fn as_micros(&self) -> i64 {
        self.0.timestamp_micros()
    }

    /// Parse an RFC-3339 / ISO-8601 string.
    pub fn parse_rfc3339(s: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| Timestamp(dt.with_timezone(&Utc)))
    }

    /// Render as ISO-8601 with millisecond precision and a trailing `Z`.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// The underlying `chrono` value.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Apply a relative offset (e.g. for `-1h`, `-7d` time-travel points).
    pub fn checked_sub_signed(&self, duration: chrono::Duration) -> Option<Self> {
        self.0.checked_sub_signed(duration).map(Timestamp)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp(DateTime::from_timestamp_micros(0).unwrap())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp(dt)
    }
}

/// Parse a relative time expression like `-1h` or `-7d` into a duration.
///
/// Supported units: `s` (seconds), `m` (minutes), `h` (hours), `d` (days).
/// Returns `None` if the expression does not match `-<number><unit>`.
pub fn parse_relative_duration(expr: &str) -> Option<chrono::Duration> {
    let expr = expr.strip_prefix('-')?;
    if expr.is_empty() {
        return None;
    }
    let unit = expr.chars().last()?;
    let digits = &expr[..expr.len() - 1];
    let n: i64 = digits.parse().ok()?;
    match unit {
        's' => Some(chrono::Duration::seconds(n)),
        'm' => Some(chrono::Duration::minutes(n)),
        'h' => Some(chrono::Duration::hours(n)),
        'd' => Some(chrono::Duration::days(n)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_rfc3339() {
        let ts = Timestamp::from_micros(1_700_000_000_123_000);
        let s = ts.to_rfc3339();
        let back = Timestamp::parse_rfc3339(&s).unwrap();
        // millisecond precision on the wire, so compare at that granularity
        assert_eq!(ts.as_micros() / 1000, back.as_micros() / 1000);
    }

    #[test]
    fn orders_by_time() {
        let a = Timestamp::from_micros(100);
        let b = Timestamp::from_micros(200);
        assert!(a < b);
    }

    #[test]
    fn parses_relative_durations() {
        assert_eq!(
            parse_relative_duration("-1h"),
            Some(chrono::Duration::hours(1))
        );
        assert_eq!(
            parse_relative_duration("-7d"),
            Some(chrono::Duration::days(7))
        );
        assert_eq!(parse_relative_duration("garbage"), None);
        assert_eq!(parse_relative_duration("1h"), None);
    }
}
