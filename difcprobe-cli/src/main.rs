use std::process::ExitCode;

use clap::Parser;

use difcprobe_cli::cli::{Cli, Commands};
use difcprobe_cli::commands;
use difcprobe_cli::error::CliError;
use difcprobe_cli::logging;
use difcprobe_cli::output::OutputWriter;
use difcprobe_core::config::{DifcProbeConfig, GeneralConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli).await {
        eprintln!("warning: {:#}", e);
    }

    tracing::debug!(config = %cli.config.display(), "difcprobe starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Install the tracing subscriber from `[general]`, falling back to defaults
/// when the file cannot be loaded. The command reports load errors itself.
async fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let mut general = DifcProbeConfig::load_layered(&cli.config)
        .await
        .map(|config| config.general)
        .unwrap_or_else(|_| GeneralConfig::default());

    if let Some(ref level) = cli.log_level {
        general.log_level = level.clone();
    }

    logging::init_tracing(&general)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Check(args) => commands::check::execute(args, &cli.config, &writer).await,
        Commands::Topology => commands::topology::execute(&cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}
