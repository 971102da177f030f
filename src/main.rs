use std::sync::Arc;

use anyhow::Context;
use rewear_points_service::{
    adapters::database::{memory::MemoryDatabase, postgres::PostgresDatabase},
    commands::DomainLogic,
    config::{AppConfig, DatabaseBackend},
    domain::AdminUser,
    http,
    password::hash_password,
    ports::{admin::AdminPort, ledger::LedgerPort},
    telemetry,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Fatal, the defaults would select the in-memory ledger
    let config = AppConfig::load().context("loading configuration")?;
    telemetry::init(&config.log)?;

    match config.database.backend {
        DatabaseBackend::Postgres => {
            let database = PostgresDatabase::connect(&config.database)
                .await
                .context("connecting to database")?;
            database.run_migrations().await?;
            let database = Arc::new(database);
            serve(&config, DomainLogic::new(database.clone(), database)).await
        }
        DatabaseBackend::Memory => {
            warn!("using the in-memory ledger, data is lost on restart");
            let database = MemoryDatabase::default();
            bootstrap_admin(&database)?;
            let database = Arc::new(database);
            serve(&config, DomainLogic::new(database.clone(), database)).await
        }
    }
}

/// Register an admin from `REWEAR_BOOTSTRAP_ADMIN_EMAIL` / `REWEAR_BOOTSTRAP_ADMIN_PASSWORD`
fn bootstrap_admin(database: &MemoryDatabase) -> anyhow::Result<()> {
    let (Ok(email), Ok(password)) = (
        std::env::var("REWEAR_BOOTSTRAP_ADMIN_EMAIL"),
        std::env::var("REWEAR_BOOTSTRAP_ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };

    database.insert_admin(AdminUser {
        user_id: Uuid::new_v4(),
        name: "Administrator".to_string(),
        password_hash: hash_password(&password)?,
        email,
        is_admin: true,
    })?;
    info!("bootstrap admin registered");

    Ok(())
}

async fn serve<L, A>(config: &AppConfig, domain: DomainLogic<L, A>) -> anyhow::Result<()>
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, environment = %config.environment, "listening");

    axum::serve(listener, http::router(domain))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
