use std::path::PathBuf;

use clap::Parser;

/// Watches a systemd service and alerts when it goes down or recovers.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Probe, decide and persist as usual but only log the alerts.
    #[arg(long)]
    pub dry_run: bool,

    /// Run a single check and exit with 0 when the service is up.
    #[arg(long)]
    pub once: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long)]
    pub debug: bool,
}
