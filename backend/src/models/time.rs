//! Timezone arithmetic for caller-relative queries.
//!
//! Storage is UTC only. A caller's "today" is computed by taking the current
//! instant in the caller's zone, finding local midnight and the next local
//! midnight, and converting each back to UTC on its own. Truncating the UTC
//! instant to a day boundary is wrong for every zone other than UTC.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Step used to walk out of a DST gap that swallows local midnight.
const GAP_STEP_MINUTES: i64 = 15;
const GAP_MAX_STEPS: usize = 12;

/// Resolve an IANA zone name, falling back to UTC when absent or unknown.
pub fn resolve_timezone(name: Option<&str>) -> Tz {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .and_then(|n| n.parse::<Tz>().ok())
        .unwrap_or(Tz::UTC)
}

/// A caller's local calendar day expressed as a half-open UTC window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocalDay {
    /// Calendar date in the caller's zone.
    pub date: NaiveDate,
    /// UTC instant of local midnight (inclusive).
    pub start_utc: DateTime<Utc>,
    /// UTC instant of the following local midnight (exclusive).
    pub end_utc: DateTime<Utc>,
}

impl LocalDay {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_utc && instant < self.end_utc
    }

    /// Length of the day; 23 or 25 hours across DST transitions.
    pub fn length(&self) -> Duration {
        self.end_utc - self.start_utc
    }
}

/// Compute the local day containing `now` for a caller in `tz`.
pub fn local_day_bounds(now: DateTime<Utc>, tz: Tz) -> LocalDay {
    let date = now.with_timezone(&tz).date_naive();
    let next = date.succ_opt().unwrap_or(date);

    LocalDay {
        date,
        start_utc: start_of_local_day(date, tz),
        end_utc: start_of_local_day(next, tz),
    }
}

fn start_of_local_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    let mut candidate = midnight;

    for _ in 0..=GAP_MAX_STEPS {
        // Ambiguous midnights (clocks falling back over 00:00) take the earlier instant.
        if let Some(local) = tz.from_local_datetime(&candidate).earliest() {
            return local.with_timezone(&Utc);
        }
        candidate += Duration::minutes(GAP_STEP_MINUTES);
    }

    Utc.from_utc_datetime(&midnight)
}

/// Project a stored UTC instant into the caller's zone for display.
pub fn to_display(instant: DateTime<Utc>, tz: Tz) -> DateTime<FixedOffset> {
    let local = instant.with_timezone(&tz);
    local.with_timezone(&local.offset().fix())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_resolve_timezone_falls_back_to_utc() {
        assert_eq!(resolve_timezone(None), Tz::UTC);
        assert_eq!(resolve_timezone(Some("")), Tz::UTC);
        assert_eq!(resolve_timezone(Some("   ")), Tz::UTC);
        assert_eq!(resolve_timezone(Some("Mars/Olympus_Mons")), Tz::UTC);
        assert_eq!(resolve_timezone(Some("Asia/Tokyo")), Tz::Asia__Tokyo);
        assert_eq!(resolve_timezone(Some(" America/New_York ")), Tz::America__New_York);
    }

    #[test]
    fn test_day_bounds_use_caller_midnight() {
        let now = utc("2024-01-14T12:00:00-05:00");
        let day = local_day_bounds(now, Tz::America__New_York);

        assert_eq!(day.date, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_eq!(day.start_utc, utc("2024-01-14T05:00:00Z"));
        assert_eq!(day.end_utc, utc("2024-01-15T05:00:00Z"));
        assert!(day.contains(utc("2024-01-15T04:30:00Z")));
        assert!(!day.contains(utc("2024-01-15T05:00:00Z")));
    }

    #[test]
    fn test_day_bounds_late_evening_utc_rollover() {
        // 03:00 UTC on the 15th is still the 14th in New York.
        let day = local_day_bounds(utc("2024-01-15T03:00:00Z"), Tz::America__New_York);
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert!(day.contains(utc("2024-01-15T04:30:00Z")));

        // Naive UTC truncation would have picked the 15th and missed it.
        let utc_day = local_day_bounds(utc("2024-01-15T03:00:00Z"), Tz::UTC);
        assert_eq!(utc_day.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_day_bounds_positive_offset() {
        let day = local_day_bounds(utc("2024-06-01T16:00:00Z"), Tz::Asia__Tokyo);
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(day.start_utc, utc("2024-06-01T15:00:00Z"));
        assert_eq!(day.end_utc, utc("2024-06-02T15:00:00Z"));
    }

    #[test]
    fn test_day_bounds_across_dst() {
        let spring = local_day_bounds(utc("2024-03-10T12:00:00Z"), Tz::America__New_York);
        assert_eq!(spring.length(), Duration::hours(23));

        let autumn = local_day_bounds(utc("2024-11-03T12:00:00Z"), Tz::America__New_York);
        assert_eq!(autumn.length(), Duration::hours(25));
    }

    #[test]
    fn test_display_conversion() {
        let shown = to_display(utc("2024-06-01T14:00:00Z"), Tz::Asia__Tokyo);
        assert_eq!(shown.to_rfc3339(), "2024-06-01T23:00:00+09:00");
        assert_eq!(shown.with_timezone(&Utc), utc("2024-06-01T14:00:00Z"));

        let shown = to_display(utc("2024-01-15T04:30:00Z"), Tz::America__New_York);
        assert_eq!(shown.to_rfc3339(), "2024-01-14T23:30:00-05:00");
    }
}
