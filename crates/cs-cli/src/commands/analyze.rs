//! Implementation of the `checkstats analyze` command.
//!
//! Runs the single-pass analysis and writes the derived tables. Nothing
//! is written until the pass has succeeded, so a failed run never leaves
//! a half-populated `derived/` directory behind.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;
use cs_core::pipeline::AnalysisOutput;
use cs_core::{AnalyzeConfig, run_analysis};
use cs_math::{BetaPrior, PosteriorEstimator};
use serde::Serialize;

use crate::cli::AnalyzeArgs;
use crate::config::Config;

/// Run the analyze command.
pub fn run(args: &AnalyzeArgs, config: &Config) -> Result<()> {
    let timezone: Tz = config
        .timezone
        .parse()
        .map_err(|err| anyhow::anyhow!("{err}"))
        .with_context(|| format!("invalid timezone {:?}", config.timezone))?;

    let core_defaults = AnalyzeConfig::default();
    let cfg = AnalyzeConfig {
        timezone,
        event_count_policy: args.event_count_policy.into(),
        text_trunc_len: args.text_trunc_len.unwrap_or(config.text_trunc_len),
        include_service: args.include_service,
        include_bots: !args.exclude_bots,
        include_forwards: !args.exclude_forwards,
        stitch_window_seconds: config.stitch_window_seconds,
        ..core_defaults
    };

    let estimator = PosteriorEstimator::new(BetaPrior::JEFFREYS, args.interval_method.into())
        .context("invalid posterior prior")?;

    let derived_dir = args.out.join("derived");
    if derived_dir.exists() && !args.force {
        bail!(
            "output directory {} already contains a derived/ run; pass --force to overwrite",
            args.out.display()
        );
    }

    let output = run_analysis(&args.input, &cfg, &estimator)
        .with_context(|| format!("failed to analyze {}", args.input.display()))?;

    // A previous run may carry artifacts the new run does not write (other
    // span, other config); replace the directory wholesale instead of
    // merging into it.
    if derived_dir.exists() {
        fs::remove_dir_all(&derived_dir)
            .with_context(|| format!("failed to clear {}", derived_dir.display()))?;
    }

    write_run(&args.out, &derived_dir, &output)?;

    tracing::info!(
        out = %args.out.display(),
        events = output.events.len(),
        "analysis written"
    );
    Ok(())
}

/// Writes every artifact of a completed run.
fn write_run(out_dir: &Path, derived_dir: &Path, output: &AnalysisOutput) -> Result<()> {
    fs::create_dir_all(derived_dir)
        .with_context(|| format!("failed to create {}", derived_dir.display()))?;

    let event_rows: Vec<_> = output.events.iter().map(cs_core::CheckEvent::row).collect();
    write_csv(&derived_dir.join("events.csv"), &event_rows)?;

    let t = &output.tables;
    write_csv(&derived_dir.join("daily_counts.csv"), &t.daily)?;
    write_csv(&derived_dir.join("weekday_counts.csv"), &t.weekday)?;
    write_csv(&derived_dir.join("hour_counts.csv"), &t.hour)?;
    write_csv(&derived_dir.join("weekday_hour_counts.csv"), &t.weekday_hour)?;
    write_csv(&derived_dir.join("day_hour_counts.csv"), &t.day_hour)?;
    write_csv(&derived_dir.join("week_of_month_counts.csv"), &t.week_of_month)?;
    write_csv(
        &derived_dir.join("month_week_of_month_counts.csv"),
        &t.month_week,
    )?;
    write_csv(&derived_dir.join("iso_week_counts.csv"), &t.iso_week)?;
    write_csv(&derived_dir.join("month_counts_normalized.csv"), &t.month)?;

    let p = &output.posterior;
    write_csv(&derived_dir.join("posterior_month.csv"), &p.month)?;
    write_csv(
        &derived_dir.join("posterior_month_weekday.csv"),
        &p.month_weekday,
    )?;
    write_csv(
        &derived_dir.join("predict_line_weekday_hour.csv"),
        &p.line_weekday_hour,
    )?;

    write_json(&out_dir.join("run_metadata.json"), &output.metadata)?;
    Ok(())
}

/// Writes rows as CSV with a header derived from the row type.
fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

/// Writes pretty JSON with a trailing newline.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut file = fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let payload =
        serde_json::to_string_pretty(value).context("failed to serialize run metadata")?;
    file.write_all(payload.as_bytes())
        .and_then(|()| file.write_all(b"\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
