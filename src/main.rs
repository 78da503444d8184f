use clap::Parser;
use tracing_subscriber::EnvFilter;

use carelink_api::cli::{self, Cli};
use carelink_api::config::{AppConfig, Environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let default_filter = match config.environment {
        Environment::Development => "debug,tower_http=debug,sqlx=warn",
        _ => "info,tower_http=info,sqlx=warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    config.validate()?;
    cli::run(cli, config).await
}
