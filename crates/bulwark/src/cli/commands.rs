//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bulwark - moderation-policy engine for chat rooms
#[derive(Parser, Debug)]
#[command(name = "bulwark")]
#[command(about = "Moderation-policy engine with pluggable protections", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Additional configuration file, overriding discovered ones
    #[arg(long, global = true, env = "BULWARK_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read newline-delimited JSON reports, events and commands from stdin
    Run,

    /// Print the protection catalog and exit
    Protections,
}
