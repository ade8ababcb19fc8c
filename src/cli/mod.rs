//! CLI command definitions for compliance-tracker.
//!
//! Defined with clap's derive macros. `Cli` carries global options and an
//! optional subcommand; with no subcommand the HTTP server starts.

use clap::{Args, Parser, Subcommand};

/// Compliance form, recurring task and analytics service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// HTTP port (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API (default if no subcommand given)
    Serve,

    /// Create an administrator account
    CreateAdmin(CreateAdminArgs),

    /// Mark past-due pending tasks overdue and exit
    Sweep,
}

#[derive(Args, Debug)]
pub struct CreateAdminArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub password: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,
}
