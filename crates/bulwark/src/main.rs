//! Bulwark CLI binary.
//!
//! This binary drives the moderation engine from the command line:
//! - Process reports, room events and operator commands from stdin
//! - Print the protection catalog

use bulwark::{BulwarkConfig, init_telemetry};
use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, list_protections, run_engine};

    let _ = dotenvy::dotenv();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = BulwarkConfig::load(cli.config.as_deref())?;
    init_telemetry(*config.log_format(), cli.verbose)?;

    // Execute the requested command
    match cli.command {
        Commands::Run => run_engine(&config).await?,
        Commands::Protections => list_protections(&config).await?,
    }

    Ok(())
}
