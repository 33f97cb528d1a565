//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid match type value.
    #[error("invalid match type: {value}")]
    InvalidMatchType { value: String },

    /// Invalid event counting policy value.
    #[error("invalid count policy: {value}")]
    InvalidCountPolicy { value: String },
}

/// A message identifier from the chat export.
///
/// Export formats use small-to-large integers here; uniqueness is enforced
/// by the pipeline's first-seen-wins rule, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated sender identifier.
///
/// Sender keys are best-effort strings extracted from varying export shapes
/// (numeric ids, usernames, display names). They must be non-empty; they are
/// only used to stitch short-window follow-up messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SenderId(String);

impl SenderId {
    /// Creates a new sender ID after validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Empty {
                field: "sender ID",
            });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SenderId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SenderId> for String {
    fn from(id: SenderId) -> Self {
        id.0
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SenderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which rule family classified a message as a check event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// No rule matched.
    None,
    /// Only the numeric k-token rule matched.
    KToken,
    /// Only the keyword rule matched.
    Keyword,
    /// Both rule families matched.
    Both,
}

impl MatchType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::KToken => "k_token",
            Self::Keyword => "keyword",
            Self::Both => "both",
        }
    }

    pub const fn is_match(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MatchType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "k_token" => Ok(Self::KToken),
            "keyword" => Ok(Self::Keyword),
            "both" => Ok(Self::Both),
            _ => Err(ValidationError::InvalidMatchType {
                value: s.to_string(),
            }),
        }
    }
}

/// How a matched message contributes to `check_event_count`.
///
/// The policy never changes the number of event rows, only the weight
/// column: `Message` is always 1, `Token` lets one message stand for
/// multiple simultaneous reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountPolicy {
    /// Every matched message counts as one event.
    #[default]
    Message,
    /// A matched message counts as `max(1, k_token_hit_count)` events.
    Token,
}

impl CountPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Token => "token",
        }
    }

    /// Event weight for a message with the given number of k-token hits.
    pub const fn event_weight(&self, k_token_hit_count: u32) -> u64 {
        match self {
            Self::Message => 1,
            Self::Token => {
                if k_token_hit_count > 1 {
                    k_token_hit_count as u64
                } else {
                    1
                }
            }
        }
    }
}

impl fmt::Display for CountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CountPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "token" => Ok(Self::Token),
            _ => Err(ValidationError::InvalidCountPolicy {
                value: s.to_string(),
            }),
        }
    }
}
