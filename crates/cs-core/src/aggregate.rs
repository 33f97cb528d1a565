//! Count aggregation and derived tables.
//!
//! Counters accumulate incrementally during the single pass; tables are
//! materialized afterwards. Dense tables (daily, weekday, hourly,
//! weekday×hour, week-of-month, ISO week) are zero-filled so a consumer
//! can trust the grid shape: an absent bucket means zero observed, never
//! missing data. Sparse tables (month×week-of-month, date×hour) carry
//! only observed keys, sorted.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::calendar::{self, CalendarFields};

/// A `(check_message_count, check_event_count)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub messages: u64,
    pub events: u64,
}

impl Counts {
    fn bump(&mut self, event_weight: u64) {
        self.messages += 1;
        self.events += event_weight;
    }
}

/// Incremental counters over every detected event.
#[derive(Debug, Default)]
pub struct Aggregator {
    daily: BTreeMap<NaiveDate, Counts>,
    weekday: BTreeMap<u32, Counts>,
    hour: BTreeMap<u32, Counts>,
    weekday_hour: BTreeMap<(u32, u32), Counts>,
    day_hour: BTreeMap<(NaiveDate, u32), Counts>,
    week_of_month: BTreeMap<u32, Counts>,
    month_week: BTreeMap<(String, u32), Counts>,
    month: BTreeMap<String, Counts>,
    iso_week: BTreeMap<(i32, u32), Counts>,
    /// Validated line id -> (weekday, hour) -> distinct event dates.
    line_weekday_hour: BTreeMap<String, BTreeMap<(u32, u32), BTreeSet<NaiveDate>>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event under every counter key.
    pub fn record(&mut self, cal: &CalendarFields, event_weight: u64) {
        self.daily.entry(cal.date_local).or_default().bump(event_weight);
        self.weekday
            .entry(cal.weekday_idx)
            .or_default()
            .bump(event_weight);
        self.hour.entry(cal.hour).or_default().bump(event_weight);
        self.weekday_hour
            .entry((cal.weekday_idx, cal.hour))
            .or_default()
            .bump(event_weight);
        self.day_hour
            .entry((cal.date_local, cal.hour))
            .or_default()
            .bump(event_weight);
        self.week_of_month
            .entry(cal.week_of_month)
            .or_default()
            .bump(event_weight);
        self.month_week
            .entry((cal.month.clone(), cal.week_of_month))
            .or_default()
            .bump(event_weight);
        self.month
            .entry(cal.month.clone())
            .or_default()
            .bump(event_weight);
        self.iso_week
            .entry((cal.iso_year, cal.iso_week))
            .or_default()
            .bump(event_weight);
    }

    /// Marks a validated line as seen in a weekday/hour cell on a date.
    ///
    /// Kept separate from [`Self::record`]: the line may only become
    /// known after a stitched follow-up, once counting is already done.
    pub fn record_line_event(&mut self, line_id: &str, cal: &CalendarFields) {
        self.line_weekday_hour
            .entry(line_id.to_string())
            .or_default()
            .entry((cal.weekday_idx, cal.hour))
            .or_default()
            .insert(cal.date_local);
    }

    /// Dates on which at least one event was counted.
    pub fn event_dates(&self) -> BTreeSet<NaiveDate> {
        self.daily
            .iter()
            .filter(|(_, counts)| counts.events > 0)
            .map(|(day, _)| *day)
            .collect()
    }

    pub fn line_weekday_hour(
        &self,
    ) -> &BTreeMap<String, BTreeMap<(u32, u32), BTreeSet<NaiveDate>>> {
        &self.line_weekday_hour
    }

    pub fn daily_rows(&self, start: NaiveDate, end: NaiveDate) -> Vec<DailyRow> {
        calendar::iter_dates(start, end)
            .map(|day| {
                let counts = self.daily.get(&day).copied().unwrap_or_default();
                DailyRow {
                    date_local: day.to_string(),
                    check_message_count: counts.messages,
                    check_event_count: counts.events,
                }
            })
            .collect()
    }

    pub fn weekday_rows(&self, start: NaiveDate, end: NaiveDate) -> Vec<WeekdayRow> {
        let mut occurrences = [0_u64; 7];
        for day in calendar::iter_dates(start, end) {
            occurrences[day.weekday().num_days_from_monday() as usize] += 1;
        }
        (0..7_u32)
            .map(|idx| {
                let counts = self.weekday.get(&idx).copied().unwrap_or_default();
                let occ = occurrences[idx as usize];
                WeekdayRow {
                    weekday: calendar::weekday_label(idx).to_string(),
                    weekday_idx: idx,
                    check_message_count: counts.messages,
                    check_event_count: counts.events,
                    weekday_occurrences: occ,
                    mean_messages_per_weekday: per_occurrence(counts.messages, occ),
                    mean_events_per_weekday: per_occurrence(counts.events, occ),
                }
            })
            .collect()
    }

    pub fn hour_rows(&self) -> Vec<HourRow> {
        (0..24_u32)
            .map(|hour| {
                let counts = self.hour.get(&hour).copied().unwrap_or_default();
                HourRow {
                    hour,
                    check_message_count: counts.messages,
                    check_event_count: counts.events,
                }
            })
            .collect()
    }

    pub fn weekday_hour_rows(&self) -> Vec<WeekdayHourRow> {
        let mut rows = Vec::with_capacity(7 * 24);
        for weekday_idx in 0..7_u32 {
            for hour in 0..24_u32 {
                let counts = self
                    .weekday_hour
                    .get(&(weekday_idx, hour))
                    .copied()
                    .unwrap_or_default();
                rows.push(WeekdayHourRow {
                    weekday: calendar::weekday_label(weekday_idx).to_string(),
                    weekday_idx,
                    hour,
                    check_message_count: counts.messages,
                    check_event_count: counts.events,
                });
            }
        }
        rows
    }

    pub fn day_hour_rows(&self) -> Vec<DayHourRow> {
        self.day_hour
            .iter()
            .map(|((day, hour), counts)| DayHourRow {
                date_local: day.to_string(),
                hour: *hour,
                check_message_count: counts.messages,
                check_event_count: counts.events,
            })
            .collect()
    }

    pub fn week_of_month_rows(&self) -> Vec<WeekOfMonthRow> {
        (1..=5_u32)
            .map(|week| {
                let counts = self.week_of_month.get(&week).copied().unwrap_or_default();
                WeekOfMonthRow {
                    week_of_month: week,
                    check_message_count: counts.messages,
                    check_event_count: counts.events,
                }
            })
            .collect()
    }

    pub fn month_week_rows(&self) -> Vec<MonthWeekRow> {
        self.month_week
            .iter()
            .map(|((month, week), counts)| MonthWeekRow {
                month: month.clone(),
                week_of_month: *week,
                check_message_count: counts.messages,
                check_event_count: counts.events,
            })
            .collect()
    }

    pub fn iso_week_rows(&self, start: NaiveDate, end: NaiveDate) -> Vec<IsoWeekRow> {
        let mut days_by_week: BTreeMap<(i32, u32), u64> = BTreeMap::new();
        for day in calendar::iter_dates(start, end) {
            let iso = day.iso_week();
            *days_by_week.entry((iso.year(), iso.week())).or_default() += 1;
        }
        days_by_week
            .into_iter()
            .map(|((iso_year, iso_week), days_in_range)| {
                let counts = self
                    .iso_week
                    .get(&(iso_year, iso_week))
                    .copied()
                    .unwrap_or_default();
                let week_start = NaiveDate::from_isoywd_opt(iso_year, iso_week, chrono::Weekday::Mon)
                    .map(|d| d.to_string())
                    .unwrap_or_default();
                IsoWeekRow {
                    iso_year,
                    iso_week,
                    iso_week_start_date_local: week_start,
                    days_in_week_in_range: days_in_range,
                    is_partial_week: days_in_range < 7,
                    check_message_count: counts.messages,
                    check_event_count: counts.events,
                }
            })
            .collect()
    }

    pub fn month_rows(&self, start: NaiveDate, end: NaiveDate) -> Vec<MonthRow> {
        let mut days_in_range: BTreeMap<(i32, u32), u64> = BTreeMap::new();
        for day in calendar::iter_dates(start, end) {
            *days_in_range.entry((day.year(), day.month())).or_default() += 1;
        }
        days_in_range
            .into_iter()
            .map(|((year, month_num), days)| {
                let month = format!("{year:04}-{month_num:02}");
                let counts = self.month.get(&month).copied().unwrap_or_default();
                let total_days = u64::from(calendar::days_in_calendar_month(year, month_num));
                MonthRow {
                    month,
                    month_message_count: counts.messages,
                    month_event_count: counts.events,
                    days_in_month_in_range: days,
                    is_partial_month: days < total_days,
                    messages_per_day_in_month: per_occurrence(counts.messages, days),
                    events_per_day_in_month: per_occurrence(counts.events, days),
                }
            })
            .collect()
    }
}

/// Mean per occurrence, rounded to six decimals, zero when unobserved.
fn per_occurrence(count: u64, occurrences: u64) -> f64 {
    if occurrences == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)] // counts stay far below 2^52
    let mean = count as f64 / occurrences as f64;
    (mean * 1e6).round() / 1e6
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyRow {
    pub date_local: String,
    pub check_message_count: u64,
    pub check_event_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekdayRow {
    pub weekday: String,
    pub weekday_idx: u32,
    pub check_message_count: u64,
    pub check_event_count: u64,
    pub weekday_occurrences: u64,
    pub mean_messages_per_weekday: f64,
    pub mean_events_per_weekday: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourRow {
    pub hour: u32,
    pub check_message_count: u64,
    pub check_event_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekdayHourRow {
    pub weekday: String,
    pub weekday_idx: u32,
    pub hour: u32,
    pub check_message_count: u64,
    pub check_event_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayHourRow {
    pub date_local: String,
    pub hour: u32,
    pub check_message_count: u64,
    pub check_event_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekOfMonthRow {
    pub week_of_month: u32,
    pub check_message_count: u64,
    pub check_event_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthWeekRow {
    pub month: String,
    pub week_of_month: u32,
    pub check_message_count: u64,
    pub check_event_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IsoWeekRow {
    pub iso_year: i32,
    pub iso_week: u32,
    pub iso_week_start_date_local: String,
    pub days_in_week_in_range: u64,
    pub is_partial_week: bool,
    pub check_message_count: u64,
    pub check_event_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthRow {
    pub month: String,
    pub month_message_count: u64,
    pub month_event_count: u64,
    pub days_in_month_in_range: u64,
    pub is_partial_month: bool,
    pub messages_per_day_in_month: f64,
    pub events_per_day_in_month: f64,
}
