//! Tumen CLI - operator interface for the decimal hierarchy
//!
//! Runs scripted build-ups of the hierarchy against an in-memory store and
//! prints what they produced:
//! - Found a Base unit
//! - Build a Mid unit and appoint its leader by quorum
//! - Build a full Top unit and appoint its leader
//! - Verify a member through peer attestation

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tumen_runtime::HierarchyConfig;

mod commands;
mod error;
mod output;

use commands::simulate;
pub use error::{CliError, CliResult};
pub use output::OutputFormat;

/// Tumen CLI application
#[derive(Parser, Debug)]
#[command(name = "tumen")]
#[command(about = "Tumen - decimal hierarchy and quorum documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TUMEN_CONFIG")]
    config: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scripted flow and print the result
    Simulate {
        #[command(subcommand)]
        command: simulate::SimulateCommands,
    },

    /// Show the effective configuration
    Config,
}

/// Run using the current process arguments.
pub fn run() -> CliResult<()> {
    run_with_args(std::env::args_os())
}

/// Run using the provided argument iterator.
pub fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let filter = if cli.verbose { "debug" } else { "info" };
    // a subscriber may already be installed when embedded
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .try_init();

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(
        peer_threshold = config.verification.peer_threshold,
        authorities = config.verification.authorities.len(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Simulate { command } => simulate::execute(command, config, cli.output),
        Commands::Config => commands::config::execute(&config, cli.output),
    }
}

/// The configuration at `path`, or defaults when no path is given
pub fn load_config(path: Option<&str>) -> CliResult<HierarchyConfig> {
    let config = match path {
        Some(path) => HierarchyConfig::load(Path::new(path))?,
        None => HierarchyConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_simulate() {
        let cli = Cli::try_parse_from(["tumen", "-o", "json", "simulate", "mid", "--unit", "zun-9"])
            .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Simulate {
                command: simulate::SimulateCommands::Mid { unit },
            } => assert_eq!(unit, "zun-9"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_top_appointment_default_unit() {
        let cli = Cli::try_parse_from(["tumen", "simulate", "top-appointment"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Simulate {
                command: simulate::SimulateCommands::TopAppointment { ref unit }
            } if unit == "tumen-1"
        ));
    }

    #[test]
    fn test_unknown_scenario_rejected() {
        assert!(Cli::try_parse_from(["tumen", "simulate", "galaxy"]).is_err());
    }

    #[test]
    fn test_load_config_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.verification.peer_threshold, 3);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[verification]\npeer_threshold = 5").unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.verification.peer_threshold, 5);
        assert_eq!(config.verification.authorities.len(), 10);
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[verification]\npeer_threshold = 0").unwrap();

        assert!(matches!(
            load_config(file.path().to_str()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_run_config_command() {
        run_with_args(["tumen", "config"]).unwrap();
    }
}
