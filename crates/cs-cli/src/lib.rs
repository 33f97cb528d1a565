//! Check-stats analyzer CLI library.
//!
//! This crate provides the CLI interface for the analyzer.

mod cli;
pub mod commands;
mod config;

pub use cli::{AnalyzeArgs, Cli, Commands, CountPolicyArg, IntervalMethodArg};
pub use config::Config;
