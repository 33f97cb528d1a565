//! Timezone-local calendar derivation.
//!
//! All bucketing keys (date, weekday, hour, ISO week, week-of-month) are
//! derived from the UTC instant and the fixed project timezone in one
//! place, so every aggregate uses identical calendar semantics across DST
//! transitions.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

/// Weekday labels for 0=Mon..6=Sun.
const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Returns the label for a 0=Mon..6=Sun weekday index.
pub fn weekday_label(idx: u32) -> &'static str {
    WEEKDAY_LABELS[idx as usize % 7]
}

/// Calendar fields of one instant in the project timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarFields {
    /// Local calendar date.
    pub date_local: NaiveDate,
    /// Local timestamp rendered with its UTC offset.
    pub timestamp_local: DateTime<Tz>,
    /// 0=Mon .. 6=Sun.
    pub weekday_idx: u32,
    pub iso_year: i32,
    pub iso_week: u32,
    /// `YYYY-MM` month label.
    pub month: String,
    /// Local hour of day, 0-23.
    pub hour: u32,
    /// `1 + (day_of_month - 1) / 7`, values 1-5.
    pub week_of_month: u32,
}

impl CalendarFields {
    /// Derives all calendar fields for a UTC instant in `tz`.
    pub fn derive(timestamp_utc: DateTime<Utc>, tz: Tz) -> Self {
        let local = timestamp_utc.with_timezone(&tz);
        let date_local = local.date_naive();
        let iso = date_local.iso_week();
        Self {
            date_local,
            timestamp_local: local,
            weekday_idx: date_local.weekday().num_days_from_monday(),
            iso_year: iso.year(),
            iso_week: iso.week(),
            month: month_label(date_local),
            hour: local.hour(),
            week_of_month: week_of_month(date_local),
        }
    }

    /// Weekday label (Mon-Sun).
    pub fn weekday(&self) -> &'static str {
        weekday_label(self.weekday_idx)
    }
}

/// `YYYY-MM` label for a date.
pub fn month_label(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Calendar week-of-month: `1 + (day - 1) / 7`, values 1-5.
pub fn week_of_month(date: NaiveDate) -> u32 {
    1 + (date.day() - 1) / 7
}

/// Number of days in a `YYYY-MM` month.
pub fn days_in_calendar_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month start");
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid next month start");
    u32::try_from((next - first).num_days()).expect("month length is positive")
}

/// Iterates dates from `start` to `end` inclusive.
pub fn iter_dates(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Berlin;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn berlin_winter_offset() {
        // 23:30 UTC in January is 00:30 next day in Berlin (CET, +1).
        let fields = CalendarFields::derive(utc(2024, 1, 15, 23, 30), Berlin);
        assert_eq!(fields.date_local, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(fields.hour, 0);
        assert_eq!(fields.weekday(), "Tue");
    }

    #[test]
    fn berlin_summer_offset() {
        // 22:30 UTC in July is 00:30 next day in Berlin (CEST, +2).
        let fields = CalendarFields::derive(utc(2024, 7, 10, 22, 30), Berlin);
        assert_eq!(fields.date_local, NaiveDate::from_ymd_opt(2024, 7, 11).unwrap());
        assert_eq!(fields.hour, 0);
    }

    #[test]
    fn dst_spring_forward() {
        // 2024-03-31 01:59 UTC = 02:59 CET; 02:00 UTC = 04:00 CEST (the
        // local 03:00 hour is skipped).
        let before = CalendarFields::derive(utc(2024, 3, 31, 0, 59), Berlin);
        assert_eq!(before.hour, 1);
        let after = CalendarFields::derive(utc(2024, 3, 31, 2, 0), Berlin);
        assert_eq!(after.hour, 4);
    }

    #[test]
    fn dst_fall_back() {
        // 2024-10-27: 00:30 UTC = 02:30 CEST, 01:30 UTC = 02:30 CET.
        let first = CalendarFields::derive(utc(2024, 10, 27, 0, 30), Berlin);
        let second = CalendarFields::derive(utc(2024, 10, 27, 1, 30), Berlin);
        assert_eq!(first.hour, 2);
        assert_eq!(second.hour, 2);
        assert_eq!(first.date_local, second.date_local);
    }

    #[test]
    fn iso_week_year_boundary() {
        // 2024-12-30 (Mon) belongs to ISO week 1 of 2025.
        let fields = CalendarFields::derive(utc(2024, 12, 30, 12, 0), Berlin);
        assert_eq!(fields.iso_year, 2025);
        assert_eq!(fields.iso_week, 1);

        // 2021-01-01 (Fri) belongs to ISO week 53 of 2020.
        let fields = CalendarFields::derive(utc(2021, 1, 1, 12, 0), Berlin);
        assert_eq!(fields.iso_year, 2020);
        assert_eq!(fields.iso_week, 53);
    }

    #[test]
    fn week_of_month_bounds() {
        assert_eq!(week_of_month(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()), 1);
        assert_eq!(week_of_month(NaiveDate::from_ymd_opt(2024, 5, 7).unwrap()), 1);
        assert_eq!(week_of_month(NaiveDate::from_ymd_opt(2024, 5, 8).unwrap()), 2);
        assert_eq!(week_of_month(NaiveDate::from_ymd_opt(2024, 5, 29).unwrap()), 5);
        assert_eq!(week_of_month(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()), 5);
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_calendar_month(2024, 2), 29);
        assert_eq!(days_in_calendar_month(2023, 2), 28);
        assert_eq!(days_in_calendar_month(2024, 12), 31);
        assert_eq!(days_in_calendar_month(2024, 4), 30);
    }

    #[test]
    fn iter_dates_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
        let days: Vec<_> = iter_dates(start, end).collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[0], start);
        assert_eq!(days[3], end);
    }
}
