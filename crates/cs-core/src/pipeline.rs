//! Single-pass analysis driver.
//!
//! Folds reader → normalizer → detector → stitcher → aggregator over the
//! export in one pass, then materializes the derived tables, the posterior
//! tables, and the run metadata. Auxiliary state is O(active senders);
//! everything else is counters. Identical input bytes and configuration
//! produce byte-identical tables.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, SecondsFormat, Utc};
use cs_math::{PosteriorEstimator, PosteriorSummary};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::aggregate::{
    Aggregator, DailyRow, DayHourRow, HourRow, IsoWeekRow, MonthRow, MonthWeekRow, WeekOfMonthRow,
    WeekdayHourRow, WeekdayRow,
};
use crate::calendar::{self, CalendarFields};
use crate::config::{AnalyzeConfig, K_MAX};
use crate::detect::{DetectorRules, KEYWORDS};
use crate::error::PipelineError;
use crate::event::CheckEvent;
use crate::reader;
use crate::record::{self, NormalizedMessage, SkipReason};
use crate::stitch::Stitcher;
use crate::types::MatchType;

/// Per-run audit counters. Every scanned record lands in exactly one of
/// the included/excluded buckets; nothing is dropped silently.
#[derive(Debug, Default, Clone, Serialize)]
pub struct AuditCounts {
    pub messages_scanned: u64,
    pub messages_included: u64,
    pub messages_excluded_no_message_id: u64,
    pub messages_excluded_duplicate_id: u64,
    pub messages_excluded_no_timestamp: u64,
    pub messages_excluded_invalid_timestamp: u64,
    pub messages_excluded_service: u64,
    pub messages_excluded_bot: u64,
    pub messages_excluded_forward: u64,
    pub messages_text_non_string: u64,
    pub messages_caption_non_string: u64,
    pub messages_stitched_followup: u64,
    pub naive_timestamp_count: u64,
    pub events_matched_total: u64,
    pub events_matched_k_token_only: u64,
    pub events_matched_keyword_only: u64,
    pub events_matched_both: u64,
    pub events_weight_total: u64,
    pub events_weight_k_token_only: u64,
    pub events_weight_keyword_only: u64,
    pub events_weight_both: u64,
}

impl AuditCounts {
    fn record_match(&mut self, match_type: MatchType, event_weight: u64) {
        self.events_matched_total += 1;
        self.events_weight_total += event_weight;
        match match_type {
            MatchType::KToken => {
                self.events_matched_k_token_only += 1;
                self.events_weight_k_token_only += event_weight;
            }
            MatchType::Keyword => {
                self.events_matched_keyword_only += 1;
                self.events_weight_keyword_only += event_weight;
            }
            MatchType::Both => {
                self.events_matched_both += 1;
                self.events_weight_both += event_weight;
            }
            MatchType::None => {}
        }
    }
}

/// All derived count tables, ready for serialization.
#[derive(Debug)]
pub struct DerivedTables {
    pub daily: Vec<DailyRow>,
    pub weekday: Vec<WeekdayRow>,
    pub hour: Vec<HourRow>,
    pub weekday_hour: Vec<WeekdayHourRow>,
    pub day_hour: Vec<DayHourRow>,
    pub week_of_month: Vec<WeekOfMonthRow>,
    pub month_week: Vec<MonthWeekRow>,
    pub iso_week: Vec<IsoWeekRow>,
    pub month: Vec<MonthRow>,
}

/// Posterior probability cells: all empty when no trials were observed.
/// The CSV layer writes `None` as an empty field, never a zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PosteriorCells {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub mean: Option<f64>,
    pub ci_low: Option<f64>,
    pub ci_high: Option<f64>,
}

impl From<PosteriorSummary> for PosteriorCells {
    fn from(summary: PosteriorSummary) -> Self {
        Self {
            alpha: Some(summary.alpha),
            beta: Some(summary.beta),
            mean: Some(summary.mean),
            ci_low: Some(summary.ci_low),
            ci_high: Some(summary.ci_high),
        }
    }
}

// Cell fields are spelled out per row; the CSV serializer cannot
// flatten nested structs.
#[derive(Debug, Clone, Serialize)]
pub struct PosteriorMonthRow {
    pub month: String,
    pub n_days: u32,
    pub s_event_days: u32,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub mean: Option<f64>,
    pub ci_low: Option<f64>,
    pub ci_high: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PosteriorMonthWeekdayRow {
    pub month: String,
    pub weekday: String,
    pub weekday_idx: u32,
    pub n_days: u32,
    pub s_event_days: u32,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub mean: Option<f64>,
    pub ci_low: Option<f64>,
    pub ci_high: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictLineRow {
    pub line_id: String,
    pub weekday: String,
    pub weekday_idx: u32,
    pub hour: u32,
    pub n_weekday_occurrences: u32,
    pub s_event_days: u32,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub mean: Option<f64>,
    pub ci_low: Option<f64>,
    pub ci_high: Option<f64>,
}

#[derive(Debug)]
pub struct PosteriorTables {
    pub month: Vec<PosteriorMonthRow>,
    pub month_weekday: Vec<PosteriorMonthWeekdayRow>,
    pub line_weekday_hour: Vec<PredictLineRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub analyzer: &'static str,
    pub analyzer_version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunTimestamps {
    pub analyze_started_utc: String,
    pub analyze_completed_utc: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputInfo {
    pub raw_export_path: PathBuf,
    pub raw_export_sha256: String,
    pub container_format: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigEcho {
    pub timezone: String,
    pub k_max: u32,
    pub keywords: &'static [&'static str],
    pub event_count_policy: &'static str,
    pub include_service: bool,
    pub include_bots: bool,
    pub include_forwards: bool,
    pub stitch_followups: bool,
    pub stitch_window_seconds: i64,
    pub text_trunc_len: usize,
    pub interval_method: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSpan {
    pub start_date_local: String,
    pub end_date_local: String,
    pub total_days_in_range: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assumptions {
    pub naive_timestamps_treated_as_utc: bool,
    pub naive_timestamp_count: u64,
}

/// Everything a reader needs to audit or reproduce a run. Never carries
/// credentials or raw message text.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub tool: ToolInfo,
    pub timestamps: RunTimestamps,
    pub input: InputInfo,
    pub config: ConfigEcho,
    pub counts: AuditCounts,
    pub dataset: DatasetSpan,
    pub assumptions: Assumptions,
}

/// The full result of one analysis pass.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub events: Vec<CheckEvent>,
    pub tables: DerivedTables,
    pub posterior: PosteriorTables,
    pub metadata: RunMetadata,
}

/// Runs the whole analysis over one export file.
pub fn run_analysis(
    input: &Path,
    cfg: &AnalyzeConfig,
    estimator: &PosteriorEstimator,
) -> Result<AnalysisOutput, PipelineError> {
    let started_utc = Utc::now();
    let rules = DetectorRules::new();

    let mut counts = AuditCounts::default();
    let mut events: Vec<CheckEvent> = Vec::new();
    let mut aggregator = Aggregator::new();
    let mut stitcher = Stitcher::new(cfg.stitch_window_seconds);
    let mut seen_ids: HashSet<i64> = HashSet::new();
    let mut span: Option<(NaiveDate, NaiveDate)> = None;

    let container_format = reader::read_messages(input, |raw| {
        counts.messages_scanned += 1;

        let Some(message_id) = record::extract_message_id(&raw) else {
            counts.messages_excluded_no_message_id += 1;
            return;
        };
        if !seen_ids.insert(message_id.value()) {
            counts.messages_excluded_duplicate_id += 1;
            return;
        }

        let msg = match NormalizedMessage::from_record(&raw) {
            Ok(msg) => msg,
            Err(SkipReason::NoTimestamp) => {
                counts.messages_excluded_no_timestamp += 1;
                return;
            }
            Err(SkipReason::InvalidTimestamp) => {
                counts.messages_excluded_invalid_timestamp += 1;
                return;
            }
            // Id presence was already checked above.
            Err(SkipReason::NoMessageId) => return,
        };
        if msg.assumed_utc {
            counts.naive_timestamp_count += 1;
        }

        let cal = CalendarFields::derive(msg.timestamp_utc, cfg.timezone);
        span = Some(match span {
            None => (cal.date_local, cal.date_local),
            Some((start, end)) => (start.min(cal.date_local), end.max(cal.date_local)),
        });

        if !cfg.include_service && msg.is_service {
            counts.messages_excluded_service += 1;
            return;
        }
        if !cfg.include_bots && msg.is_bot {
            counts.messages_excluded_bot += 1;
            return;
        }
        if !cfg.include_forwards && msg.is_forward {
            counts.messages_excluded_forward += 1;
            return;
        }
        counts.messages_included += 1;
        if msg.text_non_string {
            counts.messages_text_non_string += 1;
        }
        if msg.caption_non_string {
            counts.messages_caption_non_string += 1;
        }

        let detection = rules.classify(&msg.search_text);
        if !detection.match_type.is_match() {
            if cfg.stitch_followups && detection.is_detail_only() {
                if let Some(event_idx) =
                    stitcher.attach(msg.sender.as_ref(), msg.timestamp_utc)
                {
                    events[event_idx].merge_details(msg.message_id, &detection);
                    counts.messages_stitched_followup += 1;
                    debug!(
                        message_id = msg.message_id.value(),
                        event_id = %events[event_idx].event_id,
                        "stitched detail follow-up"
                    );
                }
            }
            return;
        }

        let event_weight = cfg
            .event_count_policy
            .event_weight(detection.k_token_hit_count);
        counts.record_match(detection.match_type, event_weight);
        aggregator.record(&cal, event_weight);

        let event = CheckEvent::new(
            msg.message_id,
            msg.timestamp_utc,
            cal,
            detection,
            event_weight,
            &msg.search_text,
            cfg.text_trunc_len,
        );
        if cfg.stitch_followups {
            stitcher.open(msg.sender.as_ref(), msg.timestamp_utc, events.len());
        }
        events.push(event);
    })?;

    events.sort_by(|a, b| {
        (a.timestamp_utc, a.message_id.value()).cmp(&(b.timestamp_utc, b.message_id.value()))
    });

    // Lines can arrive via stitched follow-ups, so line cells are only
    // known once the pass is complete.
    for event in &events {
        if let Some(line) = &event.detection.line {
            if line.validated {
                aggregator.record_line_event(&line.id, &event.calendar);
            }
        }
    }

    let (start, end) = span.unwrap_or_else(|| {
        let today = Utc::now().with_timezone(&cfg.timezone).date_naive();
        (today, today)
    });

    let tables = DerivedTables {
        daily: aggregator.daily_rows(start, end),
        weekday: aggregator.weekday_rows(start, end),
        hour: aggregator.hour_rows(),
        weekday_hour: aggregator.weekday_hour_rows(),
        day_hour: aggregator.day_hour_rows(),
        week_of_month: aggregator.week_of_month_rows(),
        month_week: aggregator.month_week_rows(),
        iso_week: aggregator.iso_week_rows(start, end),
        month: aggregator.month_rows(start, end),
    };

    let posterior = build_posterior_tables(&aggregator, start, end, estimator)?;

    let completed_utc = Utc::now();
    let naive_timestamp_count = counts.naive_timestamp_count;
    let metadata = RunMetadata {
        tool: ToolInfo {
            analyzer: env!("CARGO_PKG_NAME"),
            analyzer_version: env!("CARGO_PKG_VERSION"),
        },
        timestamps: RunTimestamps {
            analyze_started_utc: started_utc.to_rfc3339_opts(SecondsFormat::Secs, true),
            analyze_completed_utc: completed_utc.to_rfc3339_opts(SecondsFormat::Secs, true),
        },
        input: InputInfo {
            raw_export_path: input.to_path_buf(),
            raw_export_sha256: sha256_file_hex(input)?,
            container_format: container_format.as_str(),
        },
        config: ConfigEcho {
            timezone: cfg.timezone.name().to_string(),
            k_max: K_MAX,
            keywords: KEYWORDS,
            event_count_policy: cfg.event_count_policy.as_str(),
            include_service: cfg.include_service,
            include_bots: cfg.include_bots,
            include_forwards: cfg.include_forwards,
            stitch_followups: cfg.stitch_followups,
            stitch_window_seconds: cfg.stitch_window_seconds,
            text_trunc_len: cfg.text_trunc_len,
            interval_method: estimator.method().as_str(),
        },
        counts,
        dataset: DatasetSpan {
            start_date_local: start.to_string(),
            end_date_local: end.to_string(),
            total_days_in_range: (end - start).num_days() + 1,
        },
        assumptions: Assumptions {
            naive_timestamps_treated_as_utc: true,
            naive_timestamp_count,
        },
    };

    info!(
        scanned = metadata.counts.messages_scanned,
        included = metadata.counts.messages_included,
        events = events.len(),
        "analysis pass complete"
    );

    Ok(AnalysisOutput {
        events,
        tables,
        posterior,
        metadata,
    })
}

fn build_posterior_tables(
    aggregator: &Aggregator,
    start: NaiveDate,
    end: NaiveDate,
    estimator: &PosteriorEstimator,
) -> Result<PosteriorTables, PipelineError> {
    let event_dates = aggregator.event_dates();

    // Per month: trials are in-range days, successes are event days.
    let mut month_rows = Vec::new();
    let mut month_weekday_rows = Vec::new();
    let mut months: Vec<(i32, u32)> = Vec::new();
    for day in calendar::iter_dates(start, end) {
        let key = (day.year(), day.month());
        if months.last() != Some(&key) {
            months.push(key);
        }
    }
    for (year, month_num) in months {
        let month = format!("{year:04}-{month_num:02}");
        let in_month = |d: &NaiveDate| d.year() == year && d.month() == month_num;

        let mut n_days = 0_u32;
        let mut s_days = 0_u32;
        let mut n_by_weekday = [0_u32; 7];
        let mut s_by_weekday = [0_u32; 7];
        for day in calendar::iter_dates(start, end).filter(|d| in_month(d)) {
            let weekday = day.weekday().num_days_from_monday() as usize;
            n_days += 1;
            n_by_weekday[weekday] += 1;
            if event_dates.contains(&day) {
                s_days += 1;
                s_by_weekday[weekday] += 1;
            }
        }

        let cells = summarize_cells(estimator, n_days, s_days)?;
        month_rows.push(PosteriorMonthRow {
            month: month.clone(),
            n_days,
            s_event_days: s_days,
            alpha: cells.alpha,
            beta: cells.beta,
            mean: cells.mean,
            ci_low: cells.ci_low,
            ci_high: cells.ci_high,
        });
        for (weekday_idx, (&n, &s)) in n_by_weekday.iter().zip(&s_by_weekday).enumerate() {
            #[allow(clippy::cast_possible_truncation)] // 0..7
            let weekday_idx = weekday_idx as u32;
            let cells = summarize_cells(estimator, n, s)?;
            month_weekday_rows.push(PosteriorMonthWeekdayRow {
                month: month.clone(),
                weekday: calendar::weekday_label(weekday_idx).to_string(),
                weekday_idx,
                n_days: n,
                s_event_days: s,
                alpha: cells.alpha,
                beta: cells.beta,
                mean: cells.mean,
                ci_low: cells.ci_low,
                ci_high: cells.ci_high,
            });
        }
    }

    // Per observed line x weekday x hour: trials are that weekday's
    // occurrences over the whole range, successes the distinct dates with
    // at least one event of that line in that hour.
    let mut weekday_occurrences = [0_u32; 7];
    for day in calendar::iter_dates(start, end) {
        weekday_occurrences[day.weekday().num_days_from_monday() as usize] += 1;
    }
    let mut line_rows = Vec::new();
    for (line_id, by_cell) in aggregator.line_weekday_hour() {
        for (&(weekday_idx, hour), dates) in by_cell {
            let n = weekday_occurrences[weekday_idx as usize];
            let s = u32::try_from(dates.len()).unwrap_or(u32::MAX).min(n);
            let cells = summarize_cells(estimator, n, s)?;
            line_rows.push(PredictLineRow {
                line_id: line_id.clone(),
                weekday: calendar::weekday_label(weekday_idx).to_string(),
                weekday_idx,
                hour,
                n_weekday_occurrences: n,
                s_event_days: s,
                alpha: cells.alpha,
                beta: cells.beta,
                mean: cells.mean,
                ci_low: cells.ci_low,
                ci_high: cells.ci_high,
            });
        }
    }

    Ok(PosteriorTables {
        month: month_rows,
        month_weekday: month_weekday_rows,
        line_weekday_hour: line_rows,
    })
}

fn summarize_cells(
    estimator: &PosteriorEstimator,
    trials: u32,
    successes: u32,
) -> Result<PosteriorCells, PipelineError> {
    Ok(estimator
        .summarize(trials, successes)?
        .map(PosteriorCells::from)
        .unwrap_or_default())
}

/// SHA-256 of a file's bytes, streamed.
pub fn sha256_file_hex(path: &Path) -> Result<String, PipelineError> {
    let mut file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_math::{BetaPrior, IntervalMethod};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn estimator() -> PosteriorEstimator {
        PosteriorEstimator::new(BetaPrior::JEFFREYS, IntervalMethod::Exact).unwrap()
    }

    fn run(contents: &str, cfg: &AnalyzeConfig) -> AnalysisOutput {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        run_analysis(file.path(), cfg, &estimator()).unwrap()
    }

    #[test]
    fn counts_and_events_from_mixed_export() {
        let input = r#"[
            {"id": 1, "date": "2024-01-15T10:00:00+01:00", "from_id": 7, "text": "2k linie 11"},
            {"id": 1, "date": "2024-01-15T10:00:00+01:00", "text": "2k"},
            {"id": 2, "date": "2024-01-15T10:05:00+01:00", "text": "hallo"},
            {"id": 3, "text": "no timestamp"},
            {"date": "2024-01-15T10:06:00+01:00", "text": "no id"},
            {"id": 4, "date": "garbage", "text": "bad ts"},
            {"id": 5, "date": "2024-01-16T18:30:00+01:00", "from_id": 8, "text": "Kontrolle am Hbf"}
        ]"#;
        let out = run(input, &AnalyzeConfig::default());

        let c = &out.metadata.counts;
        assert_eq!(c.messages_scanned, 7);
        assert_eq!(c.messages_excluded_duplicate_id, 1);
        assert_eq!(c.messages_excluded_no_timestamp, 1);
        assert_eq!(c.messages_excluded_no_message_id, 1);
        assert_eq!(c.messages_excluded_invalid_timestamp, 1);
        assert_eq!(c.messages_included, 3);
        assert_eq!(c.events_matched_total, 2);
        assert_eq!(c.events_matched_k_token_only, 1);
        assert_eq!(c.events_matched_keyword_only, 1);

        assert_eq!(out.events.len(), 2);
        assert_eq!(out.events[0].event_id, "evt-1");
        assert_eq!(out.metadata.dataset.start_date_local, "2024-01-15");
        assert_eq!(out.metadata.dataset.end_date_local, "2024-01-16");
        assert_eq!(out.metadata.dataset.total_days_in_range, 2);
        assert_eq!(out.metadata.input.container_format, "array");
    }

    #[test]
    fn naive_timestamps_are_counted_and_assumed_utc() {
        let input = r#"[
            {"id": 1, "date": "2024-01-15T10:00:00+01:00", "text": "2k"},
            {"id": 2, "date": "2024-01-15T12:00:00", "text": "3k"},
            {"id": 3, "date": "2024-01-16", "text": "hallo"}
        ]"#;
        let out = run(input, &AnalyzeConfig::default());
        assert_eq!(out.metadata.counts.naive_timestamp_count, 2);
        assert_eq!(out.metadata.counts.messages_included, 3);
        // Assumed-UTC noon lands at 13:00 Berlin in January.
        assert_eq!(out.events[1].calendar.hour, 13);
    }

    #[test]
    fn tables_are_zero_filled_over_span() {
        let input = r#"[
            {"id": 1, "date": "2024-01-15T10:00:00+01:00", "text": "2k"},
            {"id": 2, "date": "2024-01-18T22:00:00+01:00", "text": "3k"}
        ]"#;
        let out = run(input, &AnalyzeConfig::default());
        assert_eq!(out.tables.daily.len(), 4);
        assert_eq!(out.tables.daily[1].check_event_count, 0);
        assert_eq!(out.tables.hour.len(), 24);
        assert_eq!(out.tables.weekday_hour.len(), 168);
        assert_eq!(out.tables.week_of_month.len(), 5);
        // Cross-invariant: events total matches daily sum.
        let daily_sum: u64 = out.tables.daily.iter().map(|r| r.check_event_count).sum();
        let hour_sum: u64 = out.tables.hour.iter().map(|r| r.check_event_count).sum();
        assert_eq!(daily_sum, out.metadata.counts.events_weight_total);
        assert_eq!(hour_sum, daily_sum);
    }

    #[test]
    fn stitched_follow_up_fills_line_and_predict_table() {
        let input = r#"[
            {"id": 1, "date": "2024-01-15T10:00:00+01:00", "from_id": 7, "text": "2k"},
            {"id": 2, "date": "2024-01-15T10:02:00+01:00", "from_id": 7, "text": "linie 11 am hbf"}
        ]"#;
        let out = run(input, &AnalyzeConfig::default());
        assert_eq!(out.events.len(), 1);
        let event = &out.events[0];
        assert_eq!(event.stitched_message_ids.len(), 1);
        let line = event.detection.line.as_ref().unwrap();
        assert_eq!(line.id, "11");
        assert!(line.validated);
        assert_eq!(out.metadata.counts.messages_stitched_followup, 1);

        // The stitched line reaches the predictive table.
        assert_eq!(out.posterior.line_weekday_hour.len(), 1);
        let row = &out.posterior.line_weekday_hour[0];
        assert_eq!(row.line_id, "11");
        assert_eq!(row.weekday, "Mon");
        assert_eq!(row.s_event_days, 1);
    }

    #[test]
    fn follow_up_after_window_is_not_stitched() {
        let input = r#"[
            {"id": 1, "date": "2024-01-15T10:00:00+01:00", "from_id": 7, "text": "2k"},
            {"id": 2, "date": "2024-01-15T10:06:00+01:00", "from_id": 7, "text": "linie 11"}
        ]"#;
        let out = run(input, &AnalyzeConfig::default());
        assert_eq!(out.events.len(), 1);
        assert!(out.events[0].stitched_message_ids.is_empty());
        assert!(out.events[0].detection.line.is_none());
        assert_eq!(out.metadata.counts.messages_stitched_followup, 0);
    }

    #[test]
    fn token_policy_weights_events() {
        let input = r#"[
            {"id": 1, "date": "2024-01-15T10:00:00+01:00", "text": "2k und 3k"}
        ]"#;
        let mut cfg = AnalyzeConfig::default();
        cfg.event_count_policy = crate::types::CountPolicy::Token;
        let out = run(input, &cfg);
        assert_eq!(out.events[0].event_weight, 2);
        assert_eq!(out.metadata.counts.events_weight_total, 2);
        assert_eq!(out.tables.daily[0].check_message_count, 1);
        assert_eq!(out.tables.daily[0].check_event_count, 2);
    }

    #[test]
    fn service_messages_excluded_by_default() {
        let input = r#"[
            {"id": 1, "date": "2024-01-15T10:00:00+01:00", "action": "pin", "text": "2k"},
            {"id": 2, "date": "2024-01-15T10:01:00+01:00", "text": "2k"}
        ]"#;
        let out = run(input, &AnalyzeConfig::default());
        assert_eq!(out.metadata.counts.messages_excluded_service, 1);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].message_id.value(), 2);
    }

    #[test]
    fn posterior_month_counts_event_days() {
        let input = r#"[
            {"id": 1, "date": "2024-01-15T10:00:00+01:00", "text": "2k"},
            {"id": 2, "date": "2024-01-15T18:00:00+01:00", "text": "3k"},
            {"id": 3, "date": "2024-01-18T10:00:00+01:00", "text": "2k"}
        ]"#;
        let out = run(input, &AnalyzeConfig::default());
        assert_eq!(out.posterior.month.len(), 1);
        let row = &out.posterior.month[0];
        assert_eq!(row.month, "2024-01");
        assert_eq!(row.n_days, 4);
        // Two events on the 15th still make one event day.
        assert_eq!(row.s_event_days, 2);
        let mean = row.mean.unwrap();
        assert!((mean - 2.5 / 5.0).abs() < 1e-12);
        assert_eq!(out.posterior.month_weekday.len(), 7);
    }

    #[test]
    fn empty_weekday_posterior_has_empty_cells() {
        let input = r#"[
            {"id": 1, "date": "2024-01-15T10:00:00+01:00", "text": "2k"}
        ]"#;
        let out = run(input, &AnalyzeConfig::default());
        // Single-day span: every other weekday has zero occurrences.
        let tuesday = out
            .posterior
            .month_weekday
            .iter()
            .find(|r| r.weekday_idx == 1)
            .unwrap();
        assert_eq!(tuesday.n_days, 0);
        assert!(tuesday.mean.is_none());
        assert!(tuesday.ci_low.is_none());
    }

    #[test]
    fn deterministic_across_runs() {
        let input = r#"[
            {"id": 1, "date": "2024-01-15T10:00:00+01:00", "from_id": 7, "text": "2k linie 11"},
            {"id": 2, "date": "2024-01-16T11:00:00+01:00", "from_id": 8, "text": "Kontrolle 3k"}
        ]"#;
        let cfg = AnalyzeConfig::default();
        let a = run(input, &cfg);
        let b = run(input, &cfg);
        let rows_a: Vec<String> = a.events.iter().map(|e| format!("{:?}", e.row())).collect();
        let rows_b: Vec<String> = b.events.iter().map(|e| format!("{:?}", e.row())).collect();
        assert_eq!(rows_a, rows_b);
        assert_eq!(format!("{:?}", a.tables.daily), format!("{:?}", b.tables.daily));
    }
}
