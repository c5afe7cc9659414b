//! Time-span calculation for event boundaries.
//!
//! Boundary strings come straight from the event source and may be missing,
//! empty, date-only or garbage. Nothing here returns an error: an unusable
//! boundary yields `None` from the parsers and `0.0` from the span functions.

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};

/// Format of all-day boundaries.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Offset-less timestamp formats, interpreted in the caller's timezone.
const LOCAL_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Parses a boundary string into a UTC instant, reading offset-less
/// timestamps in the local timezone.
pub fn parse_boundary(value: &str) -> Option<DateTime<Utc>> {
    parse_boundary_in(value, &Local)
}

/// Parses a boundary string into a UTC instant.
///
/// Accepted inputs:
/// - RFC 3339 timestamps (`2024-03-01T10:00:00Z`, `2024-03-01T10:00:00+02:00`)
/// - dates (`2024-05-01`), read as midnight UTC
/// - offset-less timestamps (`2024-03-01T10:00:00`), read in `tz`
pub fn parse_boundary_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(date) = parse_date(value) {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    LOCAL_DATETIME_FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(value, format).ok()?;
        resolve_local(&naive, tz)
    })
}

/// Reads a wall-clock time in `tz`. Repeated times take the earlier instant;
/// times skipped by a DST jump are moved forward one hour.
fn resolve_local<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    let resolved = match tz.from_local_datetime(naive) {
        LocalResult::None => tz
            .from_local_datetime(&(*naive + TimeDelta::hours(1)))
            .earliest(),
        other => other.earliest(),
    };
    resolved.map(|dt| dt.with_timezone(&Utc))
}

/// Parses a date-only boundary.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Returns the minutes elapsed between two boundaries, reading offset-less
/// timestamps in the local timezone.
pub fn elapsed_minutes(start: Option<&str>, end: Option<&str>) -> f64 {
    elapsed_minutes_in(start, end, &Local)
}

/// Returns the minutes elapsed between two boundaries.
///
/// Returns `0.0` when either side is missing, empty or unparseable. The
/// result is negative when `end` precedes `start`; it is never clamped.
pub fn elapsed_minutes_in<Tz: TimeZone>(start: Option<&str>, end: Option<&str>, tz: &Tz) -> f64 {
    let (Some(start), Some(end)) = (start, end) else {
        return 0.0;
    };

    match (parse_boundary_in(start, tz), parse_boundary_in(end, tz)) {
        (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / MILLIS_PER_MINUTE,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use chrono_tz::America::New_York;

    fn utc(value: &str) -> DateTime<Utc> {
        value.parse().unwrap()
    }

    #[test]
    fn parse_rfc3339() {
        assert_eq!(
            parse_boundary_in("2024-03-01T10:00:00Z", &Utc),
            Some(utc("2024-03-01T10:00:00Z"))
        );
        assert_eq!(
            parse_boundary_in("2024-03-01T12:00:00+02:00", &Utc),
            Some(utc("2024-03-01T10:00:00Z"))
        );
    }

    #[test]
    fn parse_date_only_is_utc_midnight() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(
            parse_boundary_in("2024-05-01", &tz),
            Some(utc("2024-05-01T00:00:00Z"))
        );
    }

    #[test]
    fn parse_offsetless_uses_timezone() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(
            parse_boundary_in("2024-03-01T10:00:00", &tz),
            Some(utc("2024-03-01T09:00:00Z"))
        );
        assert_eq!(
            parse_boundary_in("2024-03-01T10:00", &tz),
            Some(utc("2024-03-01T09:00:00Z"))
        );
    }

    #[test]
    fn offsetless_time_in_dst_gap_moves_forward() {
        // 02:30 does not exist in New York on 2024-03-10.
        assert_eq!(
            parse_boundary_in("2024-03-10T02:30:00", &New_York),
            Some(utc("2024-03-10T07:30:00Z"))
        );
        assert_eq!(
            elapsed_minutes_in(
                Some("2024-03-10T01:30:00"),
                Some("2024-03-10T02:30:00"),
                &New_York
            ),
            60.0
        );
    }

    #[test]
    fn offsetless_time_in_dst_overlap_takes_earlier() {
        assert_eq!(
            parse_boundary_in("2024-11-03T01:30:00", &New_York),
            Some(utc("2024-11-03T05:30:00Z"))
        );
    }

    #[test]
    fn parse_garbage() {
        assert_eq!(parse_boundary_in("", &Utc), None);
        assert_eq!(parse_boundary_in("   ", &Utc), None);
        assert_eq!(parse_boundary_in("not a date", &Utc), None);
        assert_eq!(parse_boundary_in("2024-13-45", &Utc), None);
    }

    #[test]
    fn missing_boundary_is_zero() {
        assert_eq!(elapsed_minutes_in(None, Some("2024-03-01T10:00:00Z"), &Utc), 0.0);
        assert_eq!(elapsed_minutes_in(Some("2024-03-01T10:00:00Z"), None, &Utc), 0.0);
        assert_eq!(elapsed_minutes_in(None, None, &Utc), 0.0);
        assert_eq!(elapsed_minutes_in(Some(""), Some("2024-03-01T10:00:00Z"), &Utc), 0.0);
    }

    #[test]
    fn unparseable_boundary_is_zero() {
        assert_eq!(
            elapsed_minutes_in(Some("yesterday"), Some("2024-03-01T10:00:00Z"), &Utc),
            0.0
        );
        assert_eq!(
            elapsed_minutes_in(Some("2024-03-01T10:00:00Z"), Some("soon"), &Utc),
            0.0
        );
    }

    #[test]
    fn valid_pair() {
        assert_eq!(
            elapsed_minutes_in(
                Some("2024-03-01T10:00:00Z"),
                Some("2024-03-01T11:30:00Z"),
                &Utc
            ),
            90.0
        );
        assert_eq!(
            elapsed_minutes_in(
                Some("2024-03-01T10:00:00Z"),
                Some("2024-03-01T10:00:30Z"),
                &Utc
            ),
            0.5
        );
    }

    #[test]
    fn negative_span_is_not_clamped() {
        assert_eq!(
            elapsed_minutes_in(
                Some("2024-03-01T11:00:00Z"),
                Some("2024-03-01T10:15:00Z"),
                &Utc
            ),
            -45.0
        );
    }

    #[test]
    fn all_day_span() {
        assert_eq!(
            elapsed_minutes_in(Some("2024-05-01"), Some("2024-05-02"), &Utc),
            1440.0
        );
    }

    #[test]
    fn local_wrappers_agree_on_absolute_timestamps() {
        assert_eq!(
            elapsed_minutes(Some("2024-03-01T10:00:00Z"), Some("2024-03-01T11:00:00Z")),
            60.0
        );
        assert_eq!(
            parse_boundary("2024-03-01T10:00:00Z"),
            Some(utc("2024-03-01T10:00:00Z"))
        );
    }
}
