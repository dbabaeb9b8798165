//! crates/attendance_core/src/time.rs
//!
//! Calendar helpers for the fixed IST offset (UTC+05:30) every "local" boundary in
//! the application is expressed in. All conversions go through `FixedOffset`; day
//! boundaries are built from `NaiveDate`s and shifted back to UTC for storage queries.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};

pub const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

pub const IST: FixedOffset = match FixedOffset::east_opt(IST_OFFSET_SECONDS) {
    Some(offset) => offset,
    None => panic!("IST offset is out of range"),
};

pub fn to_ist(ts: DateTime<Utc>) -> DateTime<FixedOffset> {
    ts.with_timezone(&IST)
}

/// The IST calendar date a timestamp falls on.
pub fn ist_date(ts: DateTime<Utc>) -> NaiveDate {
    to_ist(ts).date_naive()
}

/// Whole minutes elapsed since IST midnight.
pub fn minutes_since_midnight(ts: DateTime<Utc>) -> u32 {
    let local = to_ist(ts);
    local.hour() * 60 + local.minute()
}

/// The UTC instant of IST midnight at the start of `date`.
pub fn day_start_utc(date: NaiveDate) -> DateTime<Utc> {
    (date.and_time(NaiveTime::MIN) - Duration::seconds(i64::from(IST_OFFSET_SECONDS))).and_utc()
}

/// First and last IST dates of a trailing window of `days` days ending today.
pub fn window_dates(now: DateTime<Utc>, days: u32) -> (NaiveDate, NaiveDate) {
    let today = ist_date(now);
    let span = i64::from(days.max(1)) - 1;
    (today - Duration::days(span), today)
}

/// UTC bounds `[start, end)` of a trailing window of `days` IST days, today inclusive.
pub fn window_bounds(now: DateTime<Utc>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let (first, today) = window_dates(now, days);
    (day_start_utc(first), day_start_utc(today + Duration::days(1)))
}

/// Formats minutes since midnight as `HH:MM`.
pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn late_utc_evening_is_next_ist_day() {
        // 20:00 UTC is 01:30 IST the following day.
        let ts = Utc.with_ymd_and_hms(2025, 1, 31, 20, 0, 0).unwrap();
        assert_eq!(ist_date(ts), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(minutes_since_midnight(ts), 90);
    }

    #[test]
    fn day_start_is_previous_utc_evening() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let start = day_start_utc(date);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 9, 18, 30, 0).unwrap());
        assert_eq!(minutes_since_midnight(start), 0);
        assert_eq!(ist_date(start), date);
    }

    #[test]
    fn fourteen_day_window_spans_today_inclusive() {
        // 05:00 UTC on the 15th is 10:30 IST on the 15th.
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 5, 0, 0).unwrap();
        let (first, today) = window_dates(now, 14);
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        assert_eq!(today, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());

        let (start, end) = window_bounds(now, 14);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 18, 30, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 6, 15, 18, 30, 0).unwrap());
        assert_eq!((end - start).num_days(), 14);
    }

    #[test]
    fn formats_minutes_with_padding() {
        assert_eq!(format_minutes(0), "00:00");
        assert_eq!(format_minutes(545), "09:05");
        assert_eq!(format_minutes(1439), "23:59");
    }
}
