//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// difcprobe -- verifies that a stream-processing engine build exposes the
/// DIFC extension.
///
/// Use `difcprobe <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "difcprobe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the difcprobe.toml configuration file.
    #[arg(short, long, default_value = "difcprobe.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one capability probe against the configured engine build.
    Check(CheckArgs),

    /// Print the inert topology the probe subscribes with.
    Topology,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- check ----

/// Run one capability probe.
///
/// Every flag overrides the matching configuration value.
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Broker address list (comma-separated host:port).
    #[arg(long)]
    pub bootstrap_servers: Option<String>,

    /// Engine application identity.
    #[arg(long)]
    pub application_id: Option<String>,

    /// Version string the extension must report.
    #[arg(long)]
    pub expected_version: Option<String>,

    /// Flag value the extension must report.
    #[arg(long)]
    pub expected_enabled: Option<bool>,

    /// Upper bound for waiting on the engine to reach RUNNING.
    #[arg(long)]
    pub settle_timeout_ms: Option<u64>,

    /// Wait a fixed duration instead of polling the engine state.
    #[arg(long)]
    pub fixed_settle: bool,
}

// ---- config ----

/// Manage difcprobe configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, engine, probe).
        #[arg(long)]
        section: Option<String>,
    },
}
