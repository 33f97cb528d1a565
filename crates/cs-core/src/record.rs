//! Raw record normalization.
//!
//! Chat export formats vary; nothing about a record's schema is guaranteed.
//! Fields are probed by name across the shapes seen in real exports, and a
//! record either normalizes into a typed [`NormalizedMessage`] or yields a
//! [`SkipReason`] that the pipeline tallies. Nothing is ever dropped
//! silently.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::{MessageId, SenderId};

/// Why a raw record did not become a [`NormalizedMessage`].
///
/// These are recoverable per-record outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No integer id under any known key.
    NoMessageId,
    /// No timestamp value under any known key.
    NoTimestamp,
    /// A timestamp value was present but unparseable.
    InvalidTimestamp,
}

/// A typed, timezone-aware message. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct NormalizedMessage {
    pub message_id: MessageId,
    pub timestamp_utc: DateTime<Utc>,
    /// True when the timestamp had no offset and UTC was assumed.
    pub assumed_utc: bool,
    pub sender: Option<SenderId>,
    /// Text and caption joined with a newline; may be empty.
    pub search_text: String,
    /// The text field was present but neither string nor list.
    pub text_non_string: bool,
    /// The caption field was present but neither string nor list.
    pub caption_non_string: bool,
    pub is_service: bool,
    pub is_bot: bool,
    pub is_forward: bool,
}

impl NormalizedMessage {
    /// Normalizes one raw record, probing fields by name.
    pub fn from_record(record: &Value) -> Result<Self, SkipReason> {
        let message_id = extract_message_id(record).ok_or(SkipReason::NoMessageId)?;
        let timestamp_value = extract_timestamp_value(record).ok_or(SkipReason::NoTimestamp)?;
        let (timestamp_utc, assumed_utc) =
            parse_timestamp(timestamp_value).ok_or(SkipReason::InvalidTimestamp)?;

        let (text, text_non_string) = normalize_text(record.get("text"));
        let (caption, caption_non_string) = normalize_text(record.get("caption"));

        Ok(Self {
            message_id,
            timestamp_utc,
            assumed_utc,
            sender: extract_sender(record),
            search_text: build_search_text(&text, &caption),
            text_non_string,
            caption_non_string,
            is_service: is_service_record(record),
            is_bot: is_bot_record(record),
            is_forward: is_forward_record(record),
        })
    }
}

/// Probes the known id keys. Exposed so the pipeline can run its
/// duplicate check before full normalization.
pub fn extract_message_id(record: &Value) -> Option<MessageId> {
    ["id", "message_id", "msg_id"]
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_i64))
        .map(MessageId::new)
}

fn extract_timestamp_value(record: &Value) -> Option<&Value> {
    ["date", "timestamp", "date_utc", "time", "created_at"]
        .iter()
        .find_map(|key| record.get(*key))
}

/// Parses a timestamp value: RFC 3339 / offset-aware strings, naive
/// strings (assumed UTC), or numeric epoch seconds.
fn parse_timestamp(value: &Value) -> Option<(DateTime<Utc>, bool)> {
    if let Some(s) = value.as_str() {
        if let Ok(aware) = DateTime::parse_from_rfc3339(s) {
            return Some((aware.with_timezone(&Utc), false));
        }
        // Naive forms seen in exports: "2024-01-15T10:00:00",
        // "2024-01-15 10:00:00" and date-only "2024-01-15" (midnight).
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, format) {
                return Some((naive.and_utc(), true));
            }
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some((date.and_time(chrono::NaiveTime::MIN).and_utc(), true));
        }
        return None;
    }
    if let Some(secs) = value.as_i64() {
        return DateTime::from_timestamp(secs, 0).map(|dt| (dt, false));
    }
    if let Some(secs) = value.as_f64() {
        let millis = (secs * 1000.0).round();
        if !millis.is_finite() {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)] // finite checked above
        return DateTime::from_timestamp_millis(millis as i64).map(|dt| (dt, false));
    }
    None
}

/// Extracts a stable-ish sender key from known fields.
///
/// Best-effort: export formats vary, and the key is only used to stitch
/// near-term follow-up messages into the previous event.
fn extract_sender(record: &Value) -> Option<SenderId> {
    for key in ["from_id", "sender_id", "user_id", "author_id"] {
        match record.get(key) {
            Some(Value::Number(n)) => return SenderId::new(n.to_string()).ok(),
            Some(Value::String(s)) => {
                if let Ok(id) = SenderId::new(s.clone()) {
                    return Some(id);
                }
            }
            Some(Value::Object(map)) => {
                for subkey in ["user_id", "id", "peer_id", "username"] {
                    match map.get(subkey) {
                        Some(Value::Number(n)) => return SenderId::new(n.to_string()).ok(),
                        Some(Value::String(s)) => {
                            if let Ok(id) = SenderId::new(s.clone()) {
                                return Some(id);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    match record.get("from") {
        Some(Value::String(s)) => SenderId::new(s.trim()).ok(),
        Some(Value::Object(map)) => {
            for subkey in ["id", "user_id", "username"] {
                match map.get(subkey) {
                    Some(Value::Number(n)) => return SenderId::new(n.to_string()).ok(),
                    Some(Value::String(s)) => {
                        if let Ok(id) = SenderId::new(s.clone()) {
                            return Some(id);
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        _ => None,
    }
}

/// Normalizes a text/caption value into a plain string.
///
/// Strings pass through; lists concatenate their string elements and the
/// `text` key of mapping elements; anything else is empty and flagged for
/// the audit counter.
fn normalize_text(value: Option<&Value>) -> (String, bool) {
    match value {
        None | Some(Value::Null) => (String::new(), false),
        Some(Value::String(s)) => (s.clone(), false),
        Some(Value::Array(items)) => {
            let mut parts = String::new();
            for item in items {
                match item {
                    Value::String(s) => parts.push_str(s),
                    Value::Object(map) => {
                        if let Some(Value::String(s)) = map.get("text") {
                            parts.push_str(s);
                        }
                    }
                    _ => {}
                }
            }
            (parts, false)
        }
        Some(_) => (String::new(), true),
    }
}

fn build_search_text(text: &str, caption: &str) -> String {
    if !text.is_empty() && !caption.is_empty() {
        format!("{text}\n{caption}")
    } else if !text.is_empty() {
        text.to_string()
    } else {
        caption.to_string()
    }
}

/// Service events carry an action marker.
fn is_service_record(record: &Value) -> bool {
    ["action", "action_type", "service"]
        .iter()
        .any(|key| record.get(*key).is_some())
}

fn is_bot_record(record: &Value) -> bool {
    if let Some(Value::Object(sender)) = record.get("from") {
        if sender.get("is_bot").and_then(Value::as_bool) == Some(true) {
            return true;
        }
    }
    record.get("is_bot").and_then(Value::as_bool) == Some(true)
}

fn is_forward_record(record: &Value) -> bool {
    ["forward_from", "fwd_from", "forward_date", "forwarded_from"]
        .iter()
        .any(|key| record.get(*key).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_minimal_record() {
        let record = json!({"id": 7, "date": "2024-01-15T10:00:00+01:00", "text": "2k"});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert_eq!(msg.message_id, MessageId::new(7));
        assert_eq!(msg.timestamp_utc.to_rfc3339(), "2024-01-15T09:00:00+00:00");
        assert!(!msg.assumed_utc);
        assert_eq!(msg.search_text, "2k");
    }

    #[test]
    fn alternate_id_keys_probed_in_order() {
        let record = json!({"message_id": 42, "date": 1_700_000_000});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert_eq!(msg.message_id, MessageId::new(42));

        let record = json!({"msg_id": 9, "timestamp": 1_700_000_000});
        assert!(NormalizedMessage::from_record(&record).is_ok());
    }

    #[test]
    fn missing_id_is_skipped() {
        let record = json!({"date": "2024-01-15T10:00:00Z", "text": "hi"});
        assert_eq!(
            NormalizedMessage::from_record(&record).unwrap_err(),
            SkipReason::NoMessageId
        );
        // Non-integer ids do not count.
        let record = json!({"id": "abc", "date": "2024-01-15T10:00:00Z"});
        assert_eq!(
            NormalizedMessage::from_record(&record).unwrap_err(),
            SkipReason::NoMessageId
        );
    }

    #[test]
    fn missing_and_invalid_timestamps_are_distinct() {
        let record = json!({"id": 1, "text": "hi"});
        assert_eq!(
            NormalizedMessage::from_record(&record).unwrap_err(),
            SkipReason::NoTimestamp
        );
        let record = json!({"id": 1, "date": "not a date"});
        assert_eq!(
            NormalizedMessage::from_record(&record).unwrap_err(),
            SkipReason::InvalidTimestamp
        );
    }

    #[test]
    fn naive_timestamp_assumed_utc() {
        let record = json!({"id": 1, "date": "2024-01-15T10:00:00"});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert!(msg.assumed_utc);
        assert_eq!(msg.timestamp_utc.to_rfc3339(), "2024-01-15T10:00:00+00:00");
    }

    #[test]
    fn date_only_timestamp_is_midnight_utc() {
        let record = json!({"id": 1, "date": "2023-04-01"});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert!(msg.assumed_utc);
        assert_eq!(msg.timestamp_utc.to_rfc3339(), "2023-04-01T00:00:00+00:00");
    }

    #[test]
    fn epoch_seconds_timestamp() {
        let record = json!({"id": 1, "date": 1_705_312_800});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert_eq!(msg.timestamp_utc.to_rfc3339(), "2024-01-15T10:00:00+00:00");
        assert!(!msg.assumed_utc);
    }

    #[test]
    fn rich_text_list_flattens() {
        let record = json!({
            "id": 1,
            "date": "2024-01-15T10:00:00Z",
            "text": ["3k ", {"type": "mention", "text": "@peter"}, 17, " hbf"]
        });
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert_eq!(msg.search_text, "3k @peter hbf");
        assert!(!msg.text_non_string);
    }

    #[test]
    fn non_string_text_flagged() {
        let record = json!({"id": 1, "date": "2024-01-15T10:00:00Z", "text": 42});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert_eq!(msg.search_text, "");
        assert!(msg.text_non_string);
    }

    #[test]
    fn text_and_caption_joined_with_newline() {
        let record = json!({
            "id": 1,
            "date": "2024-01-15T10:00:00Z",
            "text": "2k",
            "caption": "am Hbf"
        });
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert_eq!(msg.search_text, "2k\nam Hbf");

        let record = json!({"id": 2, "date": "2024-01-15T10:00:00Z", "caption": "nur caption"});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert_eq!(msg.search_text, "nur caption");
    }

    #[test]
    fn sender_extraction_variants() {
        let record = json!({"id": 1, "date": 0, "from_id": 12345});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert_eq!(msg.sender.unwrap().as_str(), "12345");

        let record = json!({"id": 2, "date": 0, "from_id": {"user_id": 678}});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert_eq!(msg.sender.unwrap().as_str(), "678");

        let record = json!({"id": 3, "date": 0, "from": "Alice"});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert_eq!(msg.sender.unwrap().as_str(), "Alice");

        let record = json!({"id": 4, "date": 0, "from": {"username": "bob"}});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert_eq!(msg.sender.unwrap().as_str(), "bob");

        let record = json!({"id": 5, "date": 0});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert!(msg.sender.is_none());
    }

    #[test]
    fn service_bot_forward_flags() {
        let record = json!({"id": 1, "date": 0, "action": "pin_message"});
        assert!(NormalizedMessage::from_record(&record).unwrap().is_service);

        let record = json!({"id": 2, "date": 0, "from": {"is_bot": true}});
        assert!(NormalizedMessage::from_record(&record).unwrap().is_bot);

        let record = json!({"id": 3, "date": 0, "is_bot": true});
        assert!(NormalizedMessage::from_record(&record).unwrap().is_bot);

        let record = json!({"id": 4, "date": 0, "forward_from": "someone"});
        assert!(NormalizedMessage::from_record(&record).unwrap().is_forward);

        let record = json!({"id": 5, "date": 0, "text": "plain"});
        let msg = NormalizedMessage::from_record(&record).unwrap();
        assert!(!msg.is_service && !msg.is_bot && !msg.is_forward);
    }
}
