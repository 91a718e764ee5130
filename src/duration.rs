//! Elapsed-active duration since each event instant
//!
//! All rows in one pass are measured against the same `ReferenceInstant`,
//! captured once in operator civil time (America/Bogota, UTC-5, no DST) and
//! stripped to a naive clock value so the subtraction is plain wall-clock
//! arithmetic against the naive event timestamps.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// America/Bogota has been a fixed UTC-5 since 1993.
pub const BOGOTA_UTC_OFFSET_HOURS: i32 = -5;

const SECS_PER_HOUR: i64 = 3600;
const SECS_PER_MINUTE: i64 = 60;

/// The single "now" every duration in a pass is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferenceInstant(NaiveDateTime);

impl ReferenceInstant {
    /// Pin the reference to a known civil instant (tests, replays).
    pub fn fixed(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// Capture the current wall clock at the given UTC offset.
    ///
    /// Falls back to UTC when the offset is out of range; config validation
    /// rejects such offsets before they reach here.
    pub fn capture(utc_offset_hours: i32) -> Self {
        let now = Utc::now();
        let local = utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .map_or_else(|| now.naive_utc(), |tz| now.with_timezone(&tz).naive_local());
        Self(local)
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// Whole seconds elapsed from `timestamp` to this instant.
    ///
    /// Negative when the event lies in the future (clock skew, bad parse).
    pub fn elapsed_secs(&self, timestamp: NaiveDateTime) -> i64 {
        (self.0 - timestamp).num_seconds()
    }
}

/// Format whole elapsed seconds as the report's duration string.
///
/// Negative elapsed time is clamped to zero and therefore renders as
/// `"Menos de 1 minuto"`.
pub fn format_elapsed(total_secs: i64) -> String {
    let secs = total_secs.max(0);
    let hours = secs / SECS_PER_HOUR;
    let minutes = (secs % SECS_PER_HOUR) / SECS_PER_MINUTE;

    match (hours > 0, minutes > 0) {
        (true, true) => format!("{hours} horas {minutes} minutos"),
        (true, false) => format!("{hours} horas"),
        (false, true) => format!("{minutes} minutos"),
        (false, false) => "Menos de 1 minuto".to_string(),
    }
}

/// Duration string for one row; empty when the timestamp is unknown.
pub fn duration_active(timestamp: Option<NaiveDateTime>, now: ReferenceInstant) -> String {
    timestamp.map_or_else(String::new, |ts| format_elapsed(now.elapsed_secs(ts)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_format_boundaries() {
        assert_eq!(format_elapsed(0), "Menos de 1 minuto");
        assert_eq!(format_elapsed(59), "Menos de 1 minuto");
        assert_eq!(format_elapsed(60), "1 minutos");
        assert_eq!(format_elapsed(3600), "1 horas");
        assert_eq!(format_elapsed(3661), "1 horas 1 minutos");
    }

    #[test]
    fn test_hours_do_not_wrap_at_a_day() {
        assert_eq!(format_elapsed(2 * 86_400), "48 horas");
        assert_eq!(format_elapsed(86_400 + 90), "24 horas 1 minutos");
    }

    #[test]
    fn test_negative_elapsed_clamps_to_zero() {
        assert_eq!(format_elapsed(-1), "Menos de 1 minuto");
        assert_eq!(format_elapsed(-7_200), "Menos de 1 minuto");
    }

    #[test]
    fn test_duration_active_uses_reference() {
        let now = ReferenceInstant::fixed(at("2025-03-10 11:45:30"));
        assert_eq!(duration_active(Some(at("2025-03-10 09:00:00")), now), "2 horas 45 minutos");
        assert_eq!(duration_active(Some(at("2025-03-10 11:45:00")), now), "Menos de 1 minuto");
        assert_eq!(duration_active(Some(at("2025-03-10 12:00:00")), now), "Menos de 1 minuto");
        assert_eq!(duration_active(None, now), "");
    }

    #[test]
    fn test_capture_applies_offset() {
        let utc = ReferenceInstant::capture(0);
        let bogota = ReferenceInstant::capture(BOGOTA_UTC_OFFSET_HOURS);
        let diff = utc.elapsed_secs(bogota.naive());
        // Captured a few instants apart; allow a little slack
        assert!((diff - 5 * 3600).abs() < 5, "diff: {diff}");
    }

    #[test]
    fn test_capture_out_of_range_offset_falls_back_to_utc() {
        let fallback = ReferenceInstant::capture(99);
        let utc = ReferenceInstant::capture(0);
        assert!(utc.elapsed_secs(fallback.naive()).abs() < 5);
    }
}
