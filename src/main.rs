use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conduit_core::adapters::PostgresTransferRepository;
use conduit_core::cli::{Cli, Commands, DbCommands, TxCommands};
use conduit_core::config::Config;
use conduit_core::domain::SystemClock;
use conduit_core::rail::{RailClient, RateClient};
use conduit_core::services::ExpirySweeper;
use conduit_core::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let pool = connect(&config).await?;
            serve(config, pool).await
        }
        Commands::Db(DbCommands::Migrate) => {
            let pool = connect(&config).await?;
            conduit_core::cli::handle_db_migrate(&pool).await
        }
        Commands::Tx(TxCommands::ForceStatus {
            tx_id,
            status,
            reason,
        }) => {
            let pool = connect(&config).await?;
            conduit_core::cli::handle_tx_force_status(&pool, tx_id, status, &reason).await
        }
        Commands::Config => conduit_core::cli::handle_config_validate(&config),
    }
}

async fn connect(config: &Config) -> anyhow::Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

async fn serve(config: Config, pool: sqlx::PgPool) -> anyhow::Result<()> {
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let repo = Arc::new(PostgresTransferRepository::new(pool));
    let rail = Arc::new(RailClient::with_circuit_breaker(
        config.rail_base_url.clone(),
        Duration::from_secs(config.rail_timeout_secs),
        5,
        30,
    ));
    let rates = Arc::new(RateClient::new(
        config.rates_base_url.clone(),
        Duration::from_secs(config.rail_timeout_secs),
    ));

    let state = AppState::new(repo, rail, rates, Arc::new(SystemClock), &config);

    let sweeper = ExpirySweeper::new(state.repo.clone(), state.locks.clone(), state.clock.clone());
    tokio::spawn(sweeper.run(Duration::from_secs(config.expiry_sweep_secs)));

    let app = create_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
