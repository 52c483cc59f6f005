// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timestamp formatting for messages and logs.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with a `Z` suffix and only as many
/// fractional digits as the value needs. This is the same form chrono's
/// serde uses for alert timestamps, so a value copied from an error
/// message identifies the same alert.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_keeps_millis() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 4, 9, 30, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(format_utc_rfc3339(ts), "2026-07-04T09:30:00.250Z");
    }

    #[test]
    fn test_format_keeps_nanos() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 4, 9, 30, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        assert_eq!(format_utc_rfc3339(ts), "2026-07-04T09:30:00.123456789Z");
    }

    #[test]
    fn test_format_matches_serde_and_parses_back() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 4, 9, 30, 0).unwrap()
            + chrono::Duration::nanoseconds(987_654_321);
        let formatted = format_utc_rfc3339(ts);

        let serialized = serde_json::to_value(ts).unwrap();
        assert_eq!(serialized.as_str(), Some(formatted.as_str()));

        let parsed = DateTime::parse_from_rfc3339(&formatted)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, ts);
    }
}
