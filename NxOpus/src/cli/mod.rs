//! NxOpus CLI - Command-line interface for Switch Opus containers

pub mod commands;

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;

use crate::config::ResolverConfig;

#[derive(Parser)]
#[command(name = "nxopus")]
#[command(about = "NxOpus: Switch Opus container tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Resolver configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Run the NxOpus CLI
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => ResolverConfig::load(path)?,
        None => ResolverConfig::default(),
    };

    cli.command.execute(&config)?;

    Ok(())
}
