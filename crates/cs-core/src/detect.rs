//! Detection and extraction rules for check events.
//!
//! Two independent rule families classify a message, either being
//! sufficient on its own:
//!
//! - **k-token**: an integer 1–20 (or a range like `3-5`) followed by a
//!   `k` marker, with strict boundary and trailing-delimiter contracts that
//!   reject currency/unit suffixes (`2k€`, `2kB`, `2k/m`) and glued
//!   alphanumerics (`abc2k`).
//! - **keyword**: case-insensitive word-boundary matches against a fixed
//!   closed list of inspector slang terms.
//!
//! The detector also extracts supplemental transit detail (line, direction,
//! location, platform) used by the stitcher; a message carrying only such
//! detail is "detail-only" and never becomes an event row by itself.

use regex::Regex;

use crate::lines::{self, TransitMode};
use crate::types::MatchType;

/// Canonical keyword list; matches are reported with these spellings.
pub const KEYWORDS: &[&str] = &["Kontrollettis", "Kontrolleure", "Kontis", "Kontrolle"];

/// Trailing delimiter set for the k marker (besides end-of-text and
/// whitespace).
const K_DELIMITERS: &str = ".,!?;:)]}'\"-";

/// How the primary k mention was phrased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KQualifier {
    /// A single value, e.g. `3k`.
    Exact,
    /// A range, e.g. `3-5k`.
    Range,
    /// No k mention.
    Unknown,
}

impl KQualifier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Range => "range",
            Self::Unknown => "unknown",
        }
    }
}

/// Direction of travel relative to the city center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionPolarity {
    Inbound,
    Outbound,
    Unknown,
}

impl DirectionPolarity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
            Self::Unknown => "unknown",
        }
    }
}

/// How confidently a line id was extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineConfidence {
    /// Labeled mention, e.g. `Tram 10`.
    Explicit,
    /// Unlabeled mention validated against the line universe.
    Inferred,
}

impl LineConfidence {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Inferred => "inferred",
        }
    }
}

/// An extracted transit line reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRef {
    /// Normalized line id (trimmed, uppercased).
    pub id: String,
    pub mode: TransitMode,
    pub validated: bool,
    pub confidence: LineConfidence,
}

/// Classification result for one message text. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub match_type: MatchType,
    /// Distinct matched k values, ascending.
    pub matched_k_values: Vec<u32>,
    /// All matched k values in encounter order (ranges contribute both
    /// endpoints), with multiplicity.
    pub matched_k_values_all: Vec<u32>,
    /// Number of k mentions; a range counts as one.
    pub k_token_hit_count: u32,
    /// Matched canonical keywords, in canonical list order.
    pub matched_keywords: Vec<&'static str>,
    pub k_min: Option<u32>,
    pub k_max: Option<u32>,
    pub k_qualifier: KQualifier,
    pub line: Option<LineRef>,
    pub direction_text: Option<String>,
    pub direction_polarity: DirectionPolarity,
    pub location_text: Option<String>,
    pub platform_text: Option<String>,
}

impl Detection {
    /// True when the message carries only supplemental detail (a line,
    /// direction, or location) and no k-token/keyword trigger. Such
    /// messages are candidates for stitching, never event rows.
    pub fn is_detail_only(&self) -> bool {
        self.match_type == MatchType::None
            && (self.line.is_some()
                || self.direction_text.is_some()
                || self.direction_polarity != DirectionPolarity::Unknown
                || self.location_text.is_some())
    }
}

/// Compiled detection rules.
///
/// Compiled once and threaded explicitly into each classification call; no
/// ambient global state.
#[derive(Debug)]
pub struct DetectorRules {
    k_token: Regex,
    keywords: Vec<(&'static str, Regex)>,
    line_explicit: Regex,
    line_in_der: Regex,
    bare_line_context: Regex,
    bare_line: Regex,
    direction_phrase: Regex,
    direction_polarity: Regex,
    location: Regex,
    platform: Regex,
}

impl Default for DetectorRules {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorRules {
    pub fn new() -> Self {
        // The regex crate has no lookaround; the boundary contract of the
        // k-token rule (not preceded by a word character, followed by a
        // delimiter) is enforced manually in `find_k_mentions`.
        let num = "(?:[1-9]|1[0-9]|20)";
        let k_token = Regex::new(&format!(
            r"(?:(?P<a>{num})\s*[-/]\s*(?P<b>{num})|(?P<n>{num}))\s*[kK]"
        ))
        .expect("static pattern compiles");

        let keywords = KEYWORDS
            .iter()
            .map(|word| {
                let pattern =
                    Regex::new(&format!(r"(?i)\b{word}\b")).expect("static pattern compiles");
                (*word, pattern)
            })
            .collect();

        Self {
            k_token,
            keywords,
            line_explicit: Regex::new(
                r"(?i)\b(?P<label>linie|tram|straßenbahn|str|bus|sev)\s*(?P<line>[0-9]{1,3}[a-zA-Z]?|N[0-9]{1,2}|NXL)\b",
            )
            .expect("static pattern compiles"),
            line_in_der: Regex::new(r"(?i)\b(?:in\s+der|in)\s+(?P<line>\d{1,3}[a-zA-Z]?)\b")
                .expect("static pattern compiles"),
            bare_line_context: Regex::new(
                r"(?i)\b(?:richtung|hbf|haltestelle|steigen|bahn|tram|bus|linie|sev|stadteinwärts|stadtauswärts|innenstadt|stadtwärts)\b",
            )
            .expect("static pattern compiles"),
            bare_line: Regex::new(r"\b(?P<line>\d{1,3}[A-Z]?)\b").expect("static pattern compiles"),
            direction_phrase: Regex::new(
                r"(?i)\b(?:richtung|ri\.?|fahrtrichtung|rt)\s*[:\-–]?\s*(?P<dir>[^\n.,;]+)",
            )
            .expect("static pattern compiles"),
            direction_polarity: Regex::new(
                r"(?i)\b(stadteinwärts|stadtauswärts|innenstadt|stadtwärts|stadtausw)\b",
            )
            .expect("static pattern compiles"),
            location: Regex::new(r"(?i)\b(?:am|bei|an\s+der|haltestelle|hbf)\s+(?P<loc>[^\n.,;]+)")
                .expect("static pattern compiles"),
            platform: Regex::new(r"(?i)\b(?P<kind>steig|gleis)\s*(?P<p>[a-z0-9]+)\b")
                .expect("static pattern compiles"),
        }
    }

    /// Classify a message's search text. Pure function of the text.
    pub fn classify(&self, search_text: &str) -> Detection {
        let mentions = self.find_k_mentions(search_text);
        let matched_keywords = self.find_keywords(search_text);

        let mut all_values: Vec<u32> = Vec::new();
        for mention in &mentions {
            match mention {
                KMention::Exact(n) => all_values.push(*n),
                KMention::Range(a, b) => {
                    all_values.push(*a);
                    all_values.push(*b);
                }
            }
        }
        let mut distinct = all_values.clone();
        distinct.sort_unstable();
        distinct.dedup();

        let (k_min, k_max, k_qualifier) = primary_k_info(&mentions);

        let has_k = !mentions.is_empty();
        let has_kw = !matched_keywords.is_empty();
        let match_type = match (has_k, has_kw) {
            (true, true) => MatchType::Both,
            (true, false) => MatchType::KToken,
            (false, true) => MatchType::Keyword,
            (false, false) => MatchType::None,
        };

        let line = self.extract_line(search_text);
        let (direction_text, direction_polarity) = self.extract_direction(search_text);
        let (location_text, platform_text) = self.extract_location_and_platform(search_text);

        Detection {
            match_type,
            matched_k_values: distinct,
            matched_k_values_all: all_values,
            k_token_hit_count: u32::try_from(mentions.len()).unwrap_or(u32::MAX),
            matched_keywords,
            k_min,
            k_max,
            k_qualifier,
            line,
            direction_text,
            direction_polarity,
            location_text,
            platform_text,
        }
    }

    /// All k mentions satisfying the boundary and delimiter contracts.
    fn find_k_mentions(&self, text: &str) -> Vec<KMention> {
        let mut mentions = Vec::new();
        for caps in self.k_token.captures_iter(text) {
            let whole = caps.get(0).expect("group 0 always present");

            // Not preceded by a word character (rejects "abc2k", "21k").
            if text[..whole.start()]
                .chars()
                .next_back()
                .is_some_and(is_word_char)
            {
                continue;
            }
            // Followed by end-of-text, whitespace, or a delimiter
            // (rejects "2k€", "2kB", "2k/m").
            if !text[whole.end()..]
                .chars()
                .next()
                .is_none_or(is_k_delimiter)
            {
                continue;
            }

            if let Some(n) = caps.name("n") {
                let value: u32 = n.as_str().parse().expect("pattern guarantees 1-20");
                mentions.push(KMention::Exact(value));
            } else {
                let a: u32 = caps.name("a").expect("range branch").as_str().parse().expect("pattern guarantees 1-20");
                let b: u32 = caps.name("b").expect("range branch").as_str().parse().expect("pattern guarantees 1-20");
                mentions.push(KMention::Range(a.min(b), a.max(b)));
            }
        }
        mentions
    }

    /// Matched canonical keywords, in canonical list order.
    fn find_keywords(&self, text: &str) -> Vec<&'static str> {
        self.keywords
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(word, _)| *word)
            .collect()
    }

    fn extract_line(&self, text: &str) -> Option<LineRef> {
        if let Some(caps) = self.line_explicit.captures(text) {
            let label = caps["label"].to_lowercase();
            let id = lines::normalize_line_id(&caps["line"]);
            let explicit_mode = match label.as_str() {
                "sev" => TransitMode::Sev,
                "bus" => TransitMode::Bus,
                _ => TransitMode::Tram,
            };
            let validated = lines::is_valid_line_id(&id);
            let mode = lines::guess_mode(&id, Some(explicit_mode));
            return Some(LineRef {
                id,
                mode,
                validated,
                confidence: LineConfidence::Explicit,
            });
        }

        if let Some(caps) = self.line_in_der.captures(text) {
            let id = lines::normalize_line_id(&caps["line"]);
            if lines::is_valid_line_id(&id) {
                let mode = lines::guess_mode(&id, None);
                return Some(LineRef {
                    id,
                    mode,
                    validated: true,
                    confidence: LineConfidence::Inferred,
                });
            }
            return None;
        }

        // Bare numbers only count with other transit context around them.
        if !self.bare_line_context.is_match(text) {
            return None;
        }
        for caps in self.bare_line.captures_iter(text) {
            let id = lines::normalize_line_id(&caps["line"]);
            if lines::is_valid_line_id(&id) {
                let mode = lines::guess_mode(&id, None);
                return Some(LineRef {
                    id,
                    mode,
                    validated: true,
                    confidence: LineConfidence::Inferred,
                });
            }
        }
        None
    }

    fn extract_direction(&self, text: &str) -> (Option<String>, DirectionPolarity) {
        let polarity_caps = self.direction_polarity.captures(text);
        let polarity = polarity_caps.as_ref().map_or(
            DirectionPolarity::Unknown,
            |caps| match caps[1].to_lowercase().as_str() {
                "stadteinwärts" | "innenstadt" | "stadtwärts" => DirectionPolarity::Inbound,
                "stadtauswärts" | "stadtausw" => DirectionPolarity::Outbound,
                _ => DirectionPolarity::Unknown,
            },
        );

        let direction_text = self
            .direction_phrase
            .captures(text)
            .map(|caps| caps["dir"].trim().to_string())
            .or_else(|| polarity_caps.map(|caps| caps[1].trim().to_string()));
        (direction_text, polarity)
    }

    fn extract_location_and_platform(&self, text: &str) -> (Option<String>, Option<String>) {
        let location_text = self
            .location
            .captures(text)
            .map(|caps| caps["loc"].trim().to_string());
        let platform_text = self.platform.captures(text).map(|caps| {
            let kind = capitalize(caps["kind"].trim());
            format!("{kind} {}", caps["p"].trim())
        });
        (location_text, platform_text)
    }
}

/// One k mention in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KMention {
    Exact(u32),
    Range(u32, u32),
}

/// Primary (k_min, k_max, qualifier) summary: the first range wins,
/// otherwise the first mention.
fn primary_k_info(mentions: &[KMention]) -> (Option<u32>, Option<u32>, KQualifier) {
    for mention in mentions {
        if let KMention::Range(a, b) = mention {
            return (Some(*a), Some(*b), KQualifier::Range);
        }
    }
    match mentions.first() {
        Some(KMention::Exact(n)) => (Some(*n), Some(*n), KQualifier::Exact),
        _ => (None, None, KQualifier::Unknown),
    }
}

/// Word characters per the original boundary contract (`\w`).
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Valid character after the k marker: whitespace or a delimiter.
fn is_k_delimiter(c: char) -> bool {
    c.is_whitespace() || K_DELIMITERS.contains(c)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
    })
}
