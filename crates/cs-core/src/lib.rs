//! Core domain logic for the check-stats analyzer.
//!
//! This crate contains the fundamental types and logic for:
//! - Reading: streaming chat export containers (array, object, NDJSON)
//! - Detection: k-token and keyword matching with supplemental details
//! - Calendar: localized date/week/month derivation
//! - Aggregation: zero-filled count tables and posterior scope inputs
//! - Pipeline: the single-pass driver tying it all together

pub mod aggregate;
pub mod calendar;
pub mod config;
pub mod detect;
pub mod error;
pub mod event;
pub mod lines;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod stitch;
pub mod types;

pub use aggregate::Aggregator;
pub use config::AnalyzeConfig;
pub use detect::{Detection, DetectorRules};
pub use error::PipelineError;
pub use event::CheckEvent;
pub use pipeline::{AnalysisOutput, RunMetadata, run_analysis};
pub use record::NormalizedMessage;
pub use types::{CountPolicy, MatchType, MessageId, SenderId};
