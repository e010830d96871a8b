//! # TaskAfy API Server
//!
//! REST and WebSocket backend for the TaskAfy services marketplace.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/taskafy JWT_SECRET=... cargo run -p taskafy-api
//! ```
//!
//! Set `LOG_FORMAT=json` for structured log lines.

use std::{sync::Arc, time::Duration};
use taskafy_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskafy_shared::{
    db::{
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
    },
    paydunya::client::{PaydunyaClient, PaydunyaConfig, PaydunyaMode},
    redis::{RedisClient, RedisConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskafy_api=debug,taskafy_shared=info,tower_http=debug".into());

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

    tracing::info!("TaskAfy API v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let db_config = DatabaseConfig {
        max_connections: config.database.max_connections,
        ..DatabaseConfig::with_url(config.database.url.clone())
    };
    let pool = create_pool(db_config).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let gateway = PaydunyaClient::new(PaydunyaConfig {
        master_key: config.paydunya.master_key.clone(),
        private_key: config.paydunya.private_key.clone(),
        token: config.paydunya.token.clone(),
        mode: PaydunyaMode::parse(&config.paydunya.mode),
        store_name: config.paydunya.store_name.clone(),
        timeout: Duration::from_secs(30),
    })?;

    let redis = match config.redis_url.as_deref() {
        Some(url) => match RedisClient::new(RedisConfig::from_url(url)).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, rate limiting disabled");
                None
            }
        },
        None => None,
    };

    let bind_address = config.bind_address();

    let mut state = AppState::new(pool.clone(), config, Arc::new(gateway));
    if let Some(redis) = redis {
        state = state.with_redis(redis);
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
