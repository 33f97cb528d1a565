//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cs_core::types::CountPolicy;
use cs_math::IntervalMethod;

/// Offline chat check-stats analyzer.
///
/// Reads a chat export, detects ticket-inspection reports, and writes
/// deterministic count and posterior tables.
#[derive(Debug, Parser)]
#[command(name = "checkstats", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze an export file and write derived tables.
    Analyze(AnalyzeArgs),
}

/// Arguments for `checkstats analyze`.
#[derive(Debug, clap::Args)]
pub struct AnalyzeArgs {
    /// Path to the chat export (JSON array, messages object, or NDJSON).
    #[arg(long)]
    pub input: PathBuf,

    /// Output run directory.
    #[arg(long)]
    pub out: PathBuf,

    /// How a multi-token message counts toward event totals.
    #[arg(long, value_enum, default_value_t = CountPolicyArg::Message)]
    pub event_count_policy: CountPolicyArg,

    /// Include service messages (excluded by default).
    #[arg(long)]
    pub include_service: bool,

    /// Include bot messages (default).
    #[arg(long, overrides_with = "exclude_bots")]
    pub include_bots: bool,

    /// Exclude bot messages.
    #[arg(long, overrides_with = "include_bots")]
    pub exclude_bots: bool,

    /// Include forwarded messages (default).
    #[arg(long, overrides_with = "exclude_forwards")]
    pub include_forwards: bool,

    /// Exclude forwarded messages.
    #[arg(long, overrides_with = "include_forwards")]
    pub exclude_forwards: bool,

    /// Maximum characters kept in the events.csv text excerpt.
    #[arg(long)]
    pub text_trunc_len: Option<usize>,

    /// Credible interval computation strategy.
    #[arg(long, value_enum, default_value_t = IntervalMethodArg::Exact)]
    pub interval_method: IntervalMethodArg,

    /// Overwrite an existing derived/ directory.
    #[arg(long)]
    pub force: bool,
}

/// Event counting policy as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CountPolicyArg {
    Message,
    Token,
}

impl From<CountPolicyArg> for CountPolicy {
    fn from(arg: CountPolicyArg) -> Self {
        match arg {
            CountPolicyArg::Message => Self::Message,
            CountPolicyArg::Token => Self::Token,
        }
    }
}

/// Interval strategy as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IntervalMethodArg {
    Exact,
    NormalApprox,
}

impl From<IntervalMethodArg> for IntervalMethod {
    fn from(arg: IntervalMethodArg) -> Self {
        match arg {
            IntervalMethodArg::Exact => Self::Exact,
            IntervalMethodArg::NormalApprox => Self::NormalApprox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_minimal_analyze() {
        let cli = Cli::parse_from(["checkstats", "analyze", "--input", "a.json", "--out", "run"]);
        let Commands::Analyze(args) = cli.command;
        assert_eq!(args.input, PathBuf::from("a.json"));
        assert_eq!(args.event_count_policy, CountPolicyArg::Message);
        assert_eq!(args.interval_method, IntervalMethodArg::Exact);
        assert!(!args.force);
        assert!(!args.exclude_bots);
    }

    #[test]
    fn parses_full_analyze() {
        let cli = Cli::parse_from([
            "checkstats",
            "analyze",
            "--input",
            "a.json",
            "--out",
            "run",
            "--event-count-policy",
            "token",
            "--include-service",
            "--exclude-bots",
            "--exclude-forwards",
            "--text-trunc-len",
            "120",
            "--interval-method",
            "normal-approx",
            "--force",
        ]);
        let Commands::Analyze(args) = cli.command;
        assert_eq!(args.event_count_policy, CountPolicyArg::Token);
        assert!(args.include_service);
        assert!(args.exclude_bots);
        assert!(args.exclude_forwards);
        assert_eq!(args.text_trunc_len, Some(120));
        assert_eq!(args.interval_method, IntervalMethodArg::NormalApprox);
        assert!(args.force);
    }

    #[test]
    fn include_flag_overrides_earlier_exclude() {
        let cli = Cli::parse_from([
            "checkstats",
            "analyze",
            "--input",
            "a.json",
            "--out",
            "run",
            "--exclude-bots",
            "--include-bots",
        ]);
        let Commands::Analyze(args) = cli.command;
        assert!(args.include_bots);
        assert!(!args.exclude_bots);
    }
}
