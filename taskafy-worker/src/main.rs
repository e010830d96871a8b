//! # TaskAfy Worker
//!
//! Runs the recurring booking scheduler until Ctrl-C.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/taskafy cargo run -p taskafy-worker
//! ```

use std::time::Duration;
use taskafy_shared::db::{
    migrations::run_migrations,
    pool::{create_pool, DatabaseConfig},
};
use taskafy_worker::{
    config::WorkerConfig,
    scheduler::{RecurringScheduler, SchedulerConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskafy_worker=debug,taskafy_shared=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("TaskAfy Worker v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env()?;

    let pool = create_pool(DatabaseConfig {
        max_connections: config.database_max_connections,
        ..DatabaseConfig::with_url(config.database_url.clone())
    })
    .await?;
    run_migrations(&pool).await?;

    let scheduler = RecurringScheduler::new(
        pool.clone(),
        SchedulerConfig {
            poll_interval: Duration::from_secs(config.scheduler_poll_interval_secs),
            batch_size: config.scheduler_batch_size,
        },
    );

    let shutdown = scheduler.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        shutdown.cancel();
    });

    scheduler.run().await;

    pool.close().await;
    tracing::info!("Worker stopped");

    Ok(())
}
