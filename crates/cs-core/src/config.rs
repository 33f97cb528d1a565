//! Analysis configuration.
//!
//! Everything the pipeline needs is carried explicitly in this value; there
//! is no ambient state, which keeps runs reproducible and components
//! testable in isolation.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::types::CountPolicy;

/// The default project timezone for calendar derivation.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Berlin;

/// Upper bound of the numeric k-token range (inclusive).
pub const K_MAX: u32 = 20;

/// Immutable configuration for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeConfig {
    /// IANA timezone used for all local calendar fields.
    pub timezone: Tz,
    /// How matched messages contribute to `check_event_count`.
    pub event_count_policy: CountPolicy,
    /// Maximum length (in characters) of the stored text excerpt.
    pub text_trunc_len: usize,
    /// Include service messages (joins, pins, ...). Default: excluded.
    pub include_service: bool,
    /// Include messages from bot senders. Default: included.
    pub include_bots: bool,
    /// Include forwarded messages. Default: included.
    pub include_forwards: bool,
    /// Merge short-window detail-only follow-ups into the prior event.
    pub stitch_followups: bool,
    /// Stitch window in seconds, anchored at the primary event's timestamp.
    pub stitch_window_seconds: i64,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            event_count_policy: CountPolicy::Message,
            text_trunc_len: 500,
            include_service: false,
            include_bots: true,
            include_forwards: true,
            stitch_followups: true,
            stitch_window_seconds: 5 * 60,
        }
    }
}
