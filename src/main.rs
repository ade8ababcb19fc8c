//! Compliance Tracker
//!
//! HTTP service for compliance forms, recurring task assignment and
//! completion analytics.

use anyhow::Result;
use clap::Parser;
use compliance_tracker::api::{self, AppState};
use compliance_tracker::auth::TokenService;
use compliance_tracker::cli::{Cli, Command, CreateAdminArgs};
use compliance_tracker::config::{Config, ConfigLoader};
use compliance_tracker::db::Database;
use compliance_tracker::logging::{self, LogTarget};
use compliance_tracker::types::{CreateUserInput, UserRole};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut loader = ConfigLoader::load(cli.config.as_ref().map(PathBuf::from))?;
    if let Some(path) = loader.config_path() {
        info!("Config: {}", path.display());
    }

    // CLI flags are the highest tier
    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let config = loader.into_config();

    match cli.command {
        Some(Command::CreateAdmin(args)) => run_create_admin(&config, args),
        Some(Command::Sweep) => run_sweep(&config),
        Some(Command::Serve) | None => run_server(config).await,
    }
}

fn open_database(config: &Config) -> Result<Database> {
    config.ensure_db_dir()?;
    info!("Database: {}", config.server.db_path.display());
    Database::open(&config.server.db_path)
}

fn run_create_admin(config: &Config, args: CreateAdminArgs) -> Result<()> {
    let db = open_database(config)?;
    let user = db.create_user(CreateUserInput {
        email: args.email,
        password: args.password,
        first_name: args.first_name,
        last_name: args.last_name,
        role: UserRole::Admin,
    })?;
    println!("Created admin {} (id {})", user.email, user.id);
    Ok(())
}

fn run_sweep(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let moved = db.sweep_overdue_tasks()?;
    println!("Marked {} task(s) overdue", moved);
    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    if config.uses_dev_secret() {
        warn!(
            "Using the built-in development token secret. \
             Set auth.token_secret or COMPLIANCE_TOKEN_SECRET before deploying."
        );
    }

    let db = Arc::new(open_database(&config)?);
    let tokens = TokenService::new(&config.auth.token_secret, config.auth.token_ttl_hours);
    let state = AppState::new(db, tokens);

    api::start_server(state, &config.bind_addr(), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}
