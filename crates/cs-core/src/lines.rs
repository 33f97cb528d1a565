//! Known transit line universe (tram, bus, regional bus, nightliner).
//!
//! A conservative, curated set of line identifiers used to validate line
//! mentions extracted from chat messages. Validation keeps bare numbers
//! (platform numbers, times, head counts) from being mistaken for lines.

/// Transport mode guessed for a validated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitMode {
    Tram,
    Bus,
    Night,
    Sev,
    Unknown,
}

impl TransitMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tram => "tram",
            Self::Bus => "bus",
            Self::Night => "night",
            Self::Sev => "sev",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TransitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const TRAM_LINES: &[&str] = &[
    "1", "2", "3", "4", "7", "8", "9", "10", "11", "12", "14", "15", "16",
];

const BUS_LINES: &[&str] = &[
    "60", "61", "62", "63", "65", "66", "67", "70", "71", "72", "73", "74", "75", "76", "77",
    "79", "80", "81", "82", "83", "84", "85", "86", "87", "88", "89", "90", "91", "E",
];

const REGIONALBUS_LINES: &[&str] = &["108", "131", "143", "162", "172", "173", "175", "176"];

const NIGHTLINER_LINES: &[&str] = &[
    "N1", "N2", "N3", "N4", "N5", "N6", "N7", "N8", "N9", "N10", "N17", "N60", "NXL",
];

/// Normalize a line identifier (trim + uppercase).
pub fn normalize_line_id(value: &str) -> String {
    value.trim().to_uppercase()
}

fn in_known_universe(normalized: &str) -> bool {
    TRAM_LINES.contains(&normalized)
        || BUS_LINES.contains(&normalized)
        || REGIONALBUS_LINES.contains(&normalized)
        || NIGHTLINER_LINES.contains(&normalized)
}

/// Returns true if `line_id` is in the known line universe.
///
/// `<base>E` variants (e.g. `11E`) are accepted when the base line is known:
/// replacement lines show up in real exports even though they are not
/// selectable timetable ids.
pub fn is_valid_line_id(line_id: &str) -> bool {
    let normalized = normalize_line_id(line_id);
    if in_known_universe(&normalized) {
        return true;
    }
    if normalized == "E" {
        return false;
    }
    normalized
        .strip_suffix('E')
        .is_some_and(in_known_universe)
}

/// Guess the transport mode from a line id, optionally overridden by an
/// explicit label from the message text.
pub fn guess_mode(line_id: &str, explicit_mode: Option<TransitMode>) -> TransitMode {
    if let Some(mode @ (TransitMode::Tram | TransitMode::Bus | TransitMode::Sev)) = explicit_mode {
        return mode;
    }

    let normalized = normalize_line_id(line_id);
    let n = if normalized == "E" {
        normalized.as_str()
    } else {
        normalized.strip_suffix('E').unwrap_or(&normalized)
    };
    if TRAM_LINES.contains(&n) {
        TransitMode::Tram
    } else if NIGHTLINER_LINES.contains(&n) {
        TransitMode::Night
    } else if BUS_LINES.contains(&n) || REGIONALBUS_LINES.contains(&n) {
        TransitMode::Bus
    } else {
        TransitMode::Unknown
    }
}
