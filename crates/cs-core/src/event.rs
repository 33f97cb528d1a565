//! Check events.
//!
//! A [`CheckEvent`] is one matched message plus any stitched follow-up
//! details, carrying everything a downstream consumer needs: the local
//! calendar breakdown, the detection summary, and an audit trail back to
//! the raw text (bounded excerpt, length, digest).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::calendar::CalendarFields;
use crate::detect::Detection;
use crate::types::{MatchType, MessageId};

/// One detected check event.
#[derive(Debug, Clone)]
pub struct CheckEvent {
    pub event_id: String,
    pub message_id: MessageId,
    pub timestamp_utc: DateTime<Utc>,
    pub calendar: CalendarFields,
    pub detection: Detection,
    /// Token-vs-message weighting, fixed at creation from the primary
    /// message alone.
    pub event_weight: u64,
    pub stitched_message_ids: Vec<MessageId>,
    pub text_trunc: String,
    pub text_len: usize,
    pub text_sha256: String,
}

impl CheckEvent {
    /// Builds an event from a primary matched message.
    pub fn new(
        message_id: MessageId,
        timestamp_utc: DateTime<Utc>,
        calendar: CalendarFields,
        detection: Detection,
        event_weight: u64,
        search_text: &str,
        trunc_len: usize,
    ) -> Self {
        Self {
            event_id: format!("evt-{}", message_id.value()),
            message_id,
            timestamp_utc,
            calendar,
            detection,
            event_weight,
            stitched_message_ids: Vec::new(),
            text_trunc: truncate_chars(search_text, trunc_len),
            text_len: search_text.chars().count(),
            text_sha256: sha256_hex(search_text),
        }
    }

    /// Folds a detail-only follow-up into this event. Detail fields only
    /// fill gaps; an explicit value from the primary message wins.
    pub fn merge_details(&mut self, follow_up_id: MessageId, details: &Detection) {
        self.stitched_message_ids.push(follow_up_id);
        if self.detection.line.is_none() {
            self.detection.line = details.line.clone();
        }
        if self.detection.direction_text.is_none() {
            self.detection.direction_text = details.direction_text.clone();
            self.detection.direction_polarity = details.direction_polarity;
        }
        if self.detection.location_text.is_none() {
            self.detection.location_text = details.location_text.clone();
        }
        if self.detection.platform_text.is_none() {
            self.detection.platform_text = details.platform_text.clone();
        }
    }

    /// Flattens the event into its CSV row.
    pub fn row(&self) -> EventRow {
        let d = &self.detection;
        let (line_id, mode_guess, line_validated, line_confidence) = match &d.line {
            Some(line) => (
                line.id.clone(),
                line.mode.as_str().to_string(),
                line.validated.to_string(),
                line.confidence.as_str().to_string(),
            ),
            None => (String::new(), String::new(), String::new(), String::new()),
        };
        EventRow {
            event_id: self.event_id.clone(),
            message_id: self.message_id.value(),
            timestamp_utc: self.timestamp_utc.to_rfc3339(),
            timestamp_local: self.calendar.timestamp_local.to_rfc3339(),
            date_local: self.calendar.date_local.to_string(),
            weekday: self.calendar.weekday().to_string(),
            weekday_idx: self.calendar.weekday_idx,
            iso_year: self.calendar.iso_year,
            iso_week: self.calendar.iso_week,
            month: self.calendar.month.clone(),
            time_local: self.calendar.timestamp_local.format("%H:%M:%S").to_string(),
            hour: self.calendar.hour,
            week_of_month: self.calendar.week_of_month,
            match_type: d.match_type.as_str().to_string(),
            event_weight: self.event_weight,
            matched_k_values: compact_json(&d.matched_k_values),
            matched_keywords: compact_json(&d.matched_keywords),
            k_token_hit_count: d.k_token_hit_count,
            k_min: d.k_min.map(|v| v.to_string()).unwrap_or_default(),
            k_max: d.k_max.map(|v| v.to_string()).unwrap_or_default(),
            k_qualifier: d.k_qualifier.as_str().to_string(),
            line_id,
            mode_guess,
            line_validated,
            line_confidence,
            direction_text: d.direction_text.clone().unwrap_or_default(),
            direction_polarity: d.direction_polarity.as_str().to_string(),
            location_text: d.location_text.clone().unwrap_or_default(),
            platform_text: d.platform_text.clone().unwrap_or_default(),
            stitched_message_ids: compact_json(
                &self
                    .stitched_message_ids
                    .iter()
                    .map(|id| id.value())
                    .collect::<Vec<_>>(),
            ),
            text_trunc: self.text_trunc.clone(),
            text_len: self.text_len,
            text_sha256: self.text_sha256.clone(),
        }
    }
}

/// Flat, CSV-ready projection of a [`CheckEvent`]. Field order is the
/// column order.
#[derive(Debug, Clone, Serialize)]
pub struct EventRow {
    pub event_id: String,
    pub message_id: i64,
    pub timestamp_utc: String,
    pub timestamp_local: String,
    pub date_local: String,
    pub weekday: String,
    pub weekday_idx: u32,
    pub iso_year: i32,
    pub iso_week: u32,
    pub month: String,
    pub time_local: String,
    pub hour: u32,
    pub week_of_month: u32,
    pub match_type: String,
    pub event_weight: u64,
    pub matched_k_values: String,
    pub matched_keywords: String,
    pub k_token_hit_count: u32,
    pub k_min: String,
    pub k_max: String,
    pub k_qualifier: String,
    pub line_id: String,
    pub mode_guess: String,
    pub line_validated: String,
    pub line_confidence: String,
    pub direction_text: String,
    pub direction_polarity: String,
    pub location_text: String,
    pub platform_text: String,
    pub stitched_message_ids: String,
    pub text_trunc: String,
    pub text_len: usize,
    pub text_sha256: String,
}

impl CheckEvent {
    pub fn match_type(&self) -> MatchType {
        self.detection.match_type
    }
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Truncates to at most `max_chars` characters, never splitting a
/// multi-byte character.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

fn compact_json<T: Serialize>(values: &[T]) -> String {
    // Serializing a slice of numbers or strings cannot fail.
    serde_json::to_string(values).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TIMEZONE;
    use crate::detect::DetectorRules;

    fn event_for(text: &str) -> CheckEvent {
        let rules = DetectorRules::new();
        let detection = rules.classify(text);
        let ts = DateTime::parse_from_rfc3339("2024-01-15T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let calendar = CalendarFields::derive(ts, DEFAULT_TIMEZONE);
        CheckEvent::new(MessageId::new(101), ts, calendar, detection, 1, text, 500)
    }

    #[test]
    fn event_id_and_digest() {
        let event = event_for("2k linie 11");
        assert_eq!(event.event_id, "evt-101");
        assert_eq!(event.text_sha256.len(), 64);
        assert_eq!(event.text_sha256, sha256_hex("2k linie 11"));
    }

    #[test]
    fn row_carries_local_calendar() {
        let event = event_for("2k");
        let row = event.row();
        // 09:30 UTC is 10:30 in Berlin in January.
        assert_eq!(row.timestamp_local, "2024-01-15T10:30:00+01:00");
        assert_eq!(row.time_local, "10:30:00");
        assert_eq!(row.date_local, "2024-01-15");
        assert_eq!(row.weekday, "Mon");
        assert_eq!(row.hour, 10);
        assert_eq!(row.matched_k_values, "[2]");
    }

    #[test]
    fn merge_fills_gaps_without_overwriting() {
        let rules = DetectorRules::new();
        let mut event = event_for("2k linie 11");
        let primary_line = event.detection.line.clone().unwrap();

        let details = rules.classify("linie 15 am hbf");
        event.merge_details(MessageId::new(102), &details);

        // Primary line wins; the location gap is filled.
        assert_eq!(event.detection.line.as_ref().unwrap().id, primary_line.id);
        assert!(event.detection.location_text.is_some());
        assert_eq!(event.stitched_message_ids, vec![MessageId::new(102)]);
        assert_eq!(event.row().stitched_message_ids, "[102]");
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let text = format!("2k {}", "ü".repeat(600));
        let event = event_for(&text);
        assert_eq!(event.text_trunc.chars().count(), 500);
        assert_eq!(event.text_len, 603);
    }
}
