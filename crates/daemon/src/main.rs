//! QLess Daemon - Main Entry Point
//! Hosts the SQLite queue store, seeds configuration and logs the live board

mod settings;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use settings::{DaemonConfig, LogFormat, DEFAULT_CONFIG_FILE};
use qless_core::application::{shutdown_channel, BoardMonitor, RegistrationService};
use qless_core::port::id_provider::RandomTokenProvider;
use qless_core::port::time_provider::SystemTimeProvider;
use qless_core::port::TimeProvider;
use qless_infra_sqlite::{
    create_pool, run_migrations, SqliteCategorySource, SqliteIdentityGate, SqliteQueueStore,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging(config: &DaemonConfig) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("qless=info"))
        .context("Failed to create env filter")?;

    let (writer, guard) = match config.log_dir() {
        Some(dir) => {
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "qless.log"))
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(writer))
            .try_init(),
    }
    .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config_path =
        std::env::var("QLESS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let config = DaemonConfig::load(&config_path)?;
    let _log_guard = init_logging(&config)?;

    info!(version = VERSION, config = %config_path, "QLess daemon starting");

    // 2. Database
    if let Some(dir) = config.database_dir() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let database_url = config.database_url();
    info!(database = %database_url, "Initializing database");

    let pool = create_pool(&database_url)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. Seed categories and operators
    let time_provider = Arc::new(SystemTimeProvider);
    let category_source = Arc::new(SqliteCategorySource::new(pool.clone()));
    for document in &config.category_documents {
        category_source
            .put_category_document(&document.name, &document.categories)
            .await
            .with_context(|| format!("Failed to seed category document {}", document.name))?;
    }

    let identity_gate = SqliteIdentityGate::new(pool.clone());
    for account in &config.operators {
        identity_gate
            .register_operator(&account.username, &account.password, time_provider.now_millis())
            .await
            .with_context(|| format!("Failed to provision operator {}", account.username))?;
    }

    // 4. Wiring
    let store = Arc::new(SqliteQueueStore::new(pool.clone()));
    let registration = RegistrationService::new(
        store.clone(),
        category_source,
        Arc::new(RandomTokenProvider),
        time_provider,
    );
    match registration.load_categories().await {
        Ok(categories) if categories.is_empty() => {
            warn!("No categories configured; registrations will be rejected")
        }
        Ok(categories) => info!(categories = ?categories.as_slice(), "Categories available"),
        Err(e) => error!(error = %e, "Failed to load categories"),
    }

    // 5. Board monitor
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let monitor_handle = tokio::spawn(BoardMonitor::new(store.clone()).run(shutdown_rx));

    info!("System ready. Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    shutdown_tx.shutdown();
    if tokio::time::timeout(Duration::from_secs(5), monitor_handle)
        .await
        .is_err()
    {
        warn!("Board monitor did not stop in time");
    }
    pool.close().await;

    info!("Shutdown complete");
    Ok(())
}
