mod commands;

use aas4wrf_core::domain::AasError;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    match run(std::env::args().skip(1)) {
        Ok(code) => code,
        Err(error) => {
            let error = error.as_aas_error();
            eprintln!("{}", error.diagnostic_line());
            eprintln!("{}", error.fatal_exit_line());
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("aas4wrf".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_logging(cli.log_level.as_deref());
            dispatch_parsed(cli)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "aas4wrf",
    version,
    about = "Regrid local emission inventories onto a WRF-Chem grid"
)]
struct Cli {
    /// YAML run configuration
    #[arg(value_name = "config.yml")]
    config: Option<PathBuf>,

    /// Also write the run summary as JSON to this path
    #[arg(long, global = true, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. info, debug, aas4wrf_core=trace)
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Write an all-zero wrfchemi file for a template grid
    Zeros(commands::ZerosArgs),
}

fn dispatch_parsed(cli: Cli) -> Result<i32, CliError> {
    match (cli.command, cli.config) {
        (Some(CliCommand::Zeros(args)), _) => commands::run_zeros_command(args, cli.summary),
        (None, Some(config)) => commands::run_config_command(&config, cli.summary),
        (None, None) => Err(CliError::Usage(
            "missing configuration file; usage: aas4wrf <config.yml> | aas4wrf zeros [options]"
                .to_string(),
        )),
    }
}

/// RUST_LOG wins over `--log-level`; both fall back to `info`. Logs go to
/// stderr so stdout only carries the run summary.
fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Pipeline(AasError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_aas_error(&self) -> AasError {
        match self {
            Self::Usage(message) => AasError::config("CONFIG.CLI_USAGE", message.trim_end()),
            Self::Pipeline(error) => error.clone(),
            Self::Internal(error) => AasError::io("IO.CLI", format!("{error:#}")),
        }
    }
}

impl From<AasError> for CliError {
    fn from(error: AasError) -> Self {
        Self::Pipeline(error)
    }
}
