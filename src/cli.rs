use clap::Parser;
use std::path::PathBuf;

/// hostprep - apply workstation hardening and tuning in one pass
#[derive(Parser, Debug)]
#[command(name = "hostprep")]
#[command(about = "Apply a fixed, toggleable sequence of configuration steps to this workstation")]
#[command(version)]
pub struct Cli {
    /// Path to a JSON configuration file.
    ///
    /// Defaults to /etc/hostprep/config.json when that file exists, otherwise the
    /// built-in defaults are used. Keys that are not present take their default.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the effective configuration to PATH and exit without changing the host
    #[arg(long, value_name = "PATH")]
    pub write_config: Option<PathBuf>,

    /// Verbose logging (debug level). RUST_LOG overrides this.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
