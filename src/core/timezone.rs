//! Wall-clock resolution in the service timezone.
//!
//! Catalog arrival times and user time windows are clock readings without a
//! date. Every conversion to an instant goes through this module so one zone
//! is applied uniformly.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse `HH:MM` or `HHMM` (whitespace trimmed).
pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    let format = if text.len() == 4 && !text.contains(':') {
        "%H%M"
    } else {
        "%H:%M"
    };
    NaiveTime::parse_from_str(text, format).ok()
}

/// The instant `time` falls on today's date in `tz`, where "today" is the
/// calendar day of `now` in that zone.
pub fn at_time_today(tz: Tz, now: DateTime<Utc>, time: NaiveTime) -> Option<DateTime<Utc>> {
    let today = now.with_timezone(&tz).date_naive();
    tz.from_local_datetime(&today.and_time(time))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// Resolve a daily clock time to its next occurrence: today, or exactly one
/// day later when today's instant is already behind `now`.
pub fn next_occurrence(tz: Tz, now: DateTime<Utc>, time: NaiveTime) -> Option<DateTime<Utc>> {
    let instant = at_time_today(tz, now, time)?;
    if instant < now {
        Some(instant + Duration::days(1))
    } else {
        Some(instant)
    }
}

/// `HH:MM` rendering of an instant in `tz`
pub fn format_clock(tz: Tz, instant: DateTime<Utc>) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Taipei;

    fn taipei(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Taipei
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_parse_time_of_day_formats() {
        assert_eq!(
            parse_time_of_day("19:05"),
            NaiveTime::from_hms_opt(19, 5, 0)
        );
        assert_eq!(parse_time_of_day("0730"), NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(parse_time_of_day(" 21:00 "), NaiveTime::from_hms_opt(21, 0, 0));
        assert_eq!(parse_time_of_day("25:00"), None);
        assert_eq!(parse_time_of_day("evening"), None);
        assert_eq!(parse_time_of_day(""), None);
    }

    #[test]
    fn test_next_occurrence_rolls_past_times_forward() {
        let now = taipei(2024, 5, 1, 20, 0);
        let seven_pm = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(Taipei, now, seven_pm),
            Some(taipei(2024, 5, 2, 19, 0))
        );
    }

    #[test]
    fn test_next_occurrence_keeps_future_and_current_times() {
        let now = taipei(2024, 5, 1, 18, 30);
        let seven_pm = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(Taipei, now, seven_pm),
            Some(taipei(2024, 5, 1, 19, 0))
        );

        let exact = NaiveTime::from_hms_opt(18, 30, 0).unwrap();
        assert_eq!(next_occurrence(Taipei, now, exact), Some(now));
    }

    #[test]
    fn test_today_uses_zone_calendar_day() {
        // 23:30 UTC on April 30 is already May 1 in Taipei
        let now = Utc.with_ymd_and_hms(2024, 4, 30, 23, 30, 0).unwrap();
        let eight_am = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert_eq!(
            at_time_today(Taipei, now, eight_am),
            Some(taipei(2024, 5, 1, 8, 0))
        );
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Taipei, taipei(2024, 5, 1, 7, 5)), "07:05");
    }
}
