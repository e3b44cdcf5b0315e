use super::CliError;
use aas4wrf_core::pipeline::{RunSummary, ZeroFileRequest, run_from_config_path, write_zero_file};
use aas4wrf_core::temporal::parse_timestamp;
use anyhow::Context;
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(clap::Args)]
pub(super) struct ZerosArgs {
    /// WRF input file providing the target grid (wrfinput_d01)
    #[arg(long)]
    template: PathBuf,

    /// First hour, e.g. "2018-06-21 00:00"
    #[arg(long, value_parser = parse_hour)]
    start: NaiveDateTime,

    /// Last hour, inclusive
    #[arg(long, value_parser = parse_hour)]
    end: NaiveDateTime,

    /// Output file path
    #[arg(long, default_value = "wrfchemi_d01_zero")]
    output: PathBuf,

    /// Species to write (repeatable or comma separated); defaults to the RADM2/MADE-SORGAM list
    #[arg(long = "species", value_delimiter = ',')]
    species: Vec<String>,
}

fn parse_hour(value: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(value).ok_or_else(|| {
        format!("'{}' is not a timestamp like '2018-06-21 00:00'", value)
    })
}

pub(super) fn run_config_command(config: &Path, summary: Option<PathBuf>) -> Result<i32, CliError> {
    let report = run_from_config_path(config)?;
    finish(&report, summary.as_deref())
}

pub(super) fn run_zeros_command(
    args: ZerosArgs,
    summary: Option<PathBuf>,
) -> Result<i32, CliError> {
    let request = ZeroFileRequest {
        template_path: args.template,
        output_path: args.output,
        start: args.start,
        end: args.end,
        species: args
            .species
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect(),
    };
    let report = write_zero_file(&request)?;
    finish(&report, summary.as_deref())
}

fn finish(report: &RunSummary, summary: Option<&Path>) -> Result<i32, CliError> {
    print!("{}", report.render_human());
    if let Some(path) = summary {
        write_summary(report, path)?;
        println!("JSON summary: {}", path.display());
    }
    Ok(0)
}

fn write_summary(report: &RunSummary, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create summary directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("failed to serialise run summary")?;
    fs::write(path, json).with_context(|| format!("failed to write summary '{}'", path.display()))?;
    info!(summary = %path.display(), "wrote run summary");
    Ok(())
}
