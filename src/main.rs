//! hostprep - main entry point
//!
//! Loads the configuration once, builds the real host collaborators, runs the
//! default step list and prints the summary. Exit code 0 unless a fatal
//! precondition failed or the configuration could not be loaded.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use hostprep::cli::Cli;
use hostprep::config::{Configuration, DEFAULT_CONFIG_PATH};
use hostprep::privilege::invoking_user_homes;
use hostprep::{ConsoleSink, Host, Orchestrator, default_steps, render};

/// Initialize the logger with appropriate settings
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };

    // RUST_LOG overrides the default filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Main application entry point
fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    info!("hostprep starting up");

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<u8> {
    let config = load_configuration(cli.config.as_deref())?;

    if let Some(path) = &cli.write_config {
        write_configuration(&config, path)?;
        println!("✓ Configuration written to {}", path.display());
        return Ok(0);
    }

    let config = config.resolve_alias_homes(invoking_user_homes);
    debug!("Alias homes resolved to {:?}", config.alias_homes);

    let host = Host::system();
    let steps = default_steps();

    let mut orchestrator = Orchestrator::with_sink(&host, Box::new(ConsoleSink));
    let report = orchestrator
        .run(&config, &steps)
        .context("Orchestrator was already used")?;

    println!();
    print!("{}", render(&report));

    u8::try_from(report.exit_code()).context("Exit code out of range")
}

/// Load and validate the configuration. Empty `alias-homes` stays empty here so a
/// written configuration keeps resolving them at startup.
fn load_configuration(path: Option<&Path>) -> Result<Configuration> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Configuration::load_from_file(path)?
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG_PATH);
            Configuration::load_from_file(DEFAULT_CONFIG_PATH)?
        }
        None => {
            debug!("No configuration file, using built-in defaults");
            Configuration::default()
        }
    };

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn write_configuration(config: &Configuration, path: &Path) -> Result<()> {
    config.save_to_file(path)
}
