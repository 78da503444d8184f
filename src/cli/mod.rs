//! Command-line entry points for the server binary.

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use crate::app::{self, AppState};
use crate::config::AppConfig;
use crate::database::{Backend, DatabaseManager};
use crate::services::accounts::SeedOutcome;

#[derive(Parser)]
#[command(name = "carelink-api")]
#[command(about = "CareLink API - healthcare coordination backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Bind address, overrides API_HOST")]
        host: Option<String>,
        #[arg(long, help = "Port, overrides API_PORT")]
        port: Option<u16>,
    },

    #[command(about = "Create the configured super admin account and exit")]
    SeedAdmin,
}

pub async fn run(cli: Cli, mut config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { host: None, port: None }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.api.host = host;
            }
            if let Some(port) = port {
                config.api.port = port;
            }
            serve(config).await
        }
        Commands::SeedAdmin => {
            let backend = DatabaseManager::connect(&config.database).await?;
            let state = AppState::new(config, backend.store())?;
            seed(&state).await?;
            backend.close().await;
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting CareLink API in {:?} mode", config.environment);
    if config.uses_memory_store() {
        tracing::warn!("DATABASE_URL=memory: data is lost on restart");
    }

    let backend: Backend = DatabaseManager::connect(&config.database).await?;
    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    let state = AppState::new(config, backend.store())?;
    seed(&state).await?;

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    backend.close().await;
    info!("Server stopped");
    Ok(())
}

async fn seed(state: &AppState) -> anyhow::Result<()> {
    match state
        .services
        .accounts
        .seed_super_admin(&state.config.bootstrap)
        .await?
    {
        SeedOutcome::Created(id) => info!(account = id, "Seeded super admin"),
        SeedOutcome::AlreadyPresent(id) => info!(account = id, "Super admin already present"),
        SeedOutcome::NotConfigured => info!("SUPERADMIN_EMAIL/SUPERADMIN_PASSWORD not set, skipping seed"),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
