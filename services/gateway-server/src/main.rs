//! Gateway server - process entry point.
//!
//! Wires persistence, auth, the transaction/intent engines, the settlement
//! schedulers, and the HTTP boundary into one running process.
//!
//! # Usage
//!
//! ```bash
//! gateway-server
//! gateway-server --port 8080 --dev-mode
//! DATABASE_URL=postgres://... WEBHOOK_SIGNING_SECRET=... gateway-server
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gateway_adapters::issuer::{HttpIssuerAdapter, MockIssuerAdapter, DEFAULT_ISSUER_TIMEOUT};
use gateway_adapters::tokenization::MockTokenizationAdapter;
use gateway_api::{create_router, AppState};
use gateway_auth::AuthService;
use gateway_db::Database;
use gateway_engine::{Clock, Engines, SystemClock};
use gateway_settlement::scheduler::{run_intent_expiry_loop, run_settlement_loop, run_webhook_retry_loop};
use gateway_settlement::{SettlementEngine, WebhookDispatcher};

use crate::config::ServerConfig;

/// Payment gateway server.
#[derive(Parser, Debug)]
#[command(name = "gateway-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "GATEWAY_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "GATEWAY_PORT")]
    port: Option<u16>,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Redis connection URL
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Enable development mode (relaxes secret validation, skips migrations guard)
    #[arg(long, env = "GATEWAY_DEV_MODE")]
    dev_mode: bool,

    /// Run pending migrations on startup
    #[arg(long, env = "GATEWAY_RUN_MIGRATIONS")]
    run_migrations: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut server_config = ServerConfig::load();

    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(url) = args.database_url {
        server_config.database.postgres_url = url;
    }
    if let Some(url) = args.redis_url {
        server_config.database.redis_url = url;
    }

    init_logging(&server_config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting gateway server");

    if let Err(errors) = server_config.validate(args.dev_mode) {
        for error in &errors {
            tracing::error!(%error, "invalid configuration");
        }
        anyhow::bail!("configuration validation failed");
    }

    let db = Arc::new(Database::connect(&server_config.database).await?);
    if args.run_migrations {
        db.migrate().await?;
    }

    let health = db.health_check().await?;
    if !health.healthy {
        anyhow::bail!("database health check failed (postgres={}, redis={})", health.postgres, health.redis);
    }
    tracing::info!(postgres = health.postgres, redis = health.redis, "database connected");

    let auth = Arc::new(AuthService::new(db.pg.clone(), Arc::new(db.cache()), server_config.auth.clone()));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let issuer: Arc<dyn gateway_adapters::issuer::IssuerAdapter> = if server_config.issuer.base_url.is_empty() {
        tracing::warn!("ISSUER_BASE_URL not set, using in-memory issuer fake");
        Arc::new(MockIssuerAdapter)
    } else {
        Arc::new(HttpIssuerAdapter::new(server_config.issuer.base_url.clone(), DEFAULT_ISSUER_TIMEOUT))
    };
    let tokenizer = Arc::new(MockTokenizationAdapter::default());

    let engines = Arc::new(Engines::new(
        db.transaction_repo(),
        db.transaction_event_repo(),
        db.issuer_response_repo(),
        db.payment_intent_repo(),
        db.idempotency_repo(),
        Arc::new(db.cache()),
        Arc::new(db.fx_rate_repo()),
        issuer,
        tokenizer,
        clock.clone(),
    ));

    let webhooks = Arc::new(WebhookDispatcher::new(
        db.webhook_delivery_repo(),
        db.merchant_repo(),
        clock.clone(),
        server_config.webhook.signing_secret.clone().into_bytes(),
    ));

    let settlement_engine = Arc::new(SettlementEngine::new(
        db.transaction_repo(),
        db.transaction_event_repo(),
        db.settlement_batch_repo(),
        clock.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let settlement_handle = tokio::spawn(run_settlement_loop(settlement_engine, shutdown_rx.clone()));
    let webhook_handle = tokio::spawn(run_webhook_retry_loop(webhooks.clone(), shutdown_rx.clone()));
    let intent_expiry_handle = tokio::spawn(run_intent_expiry_loop(engines.intents.clone(), shutdown_rx.clone()));

    if server_config.metrics.enabled {
        start_metrics_server(server_config.metrics.port)?;
    }

    let state = Arc::new(AppState::new(db, auth, engines, webhooks));
    let app = create_router(state);

    let addr = server_config.server.socket_addr();
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down background schedulers");
    let _ = shutdown_tx.send(true);
    let shutdown_timeout = server_config.server.shutdown_timeout();
    let _ = tokio::time::timeout(shutdown_timeout, async {
        let _ = tokio::join!(settlement_handle, webhook_handle, intent_expiry_handle);
    })
    .await;

    tracing::info!("server shutdown complete");
    Ok(())
}

fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => subscriber.with(fmt::layer().json().with_target(true)).init(),
        _ => subscriber.with(fmt::layer().pretty().with_target(true)).init(),
    }

    Ok(())
}

/// Starts the Prometheus exporter on a separate port from the main API.
fn start_metrics_server(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(port, "starting metrics server");

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => tracing::info!("received SIGTERM, initiating graceful shutdown"),
    }

    // Let in-flight requests drain before the outer timeout in main() fires.
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_port_override() {
        let args = Args::parse_from(["gateway-server", "--port", "9000"]);
        assert_eq!(args.port, Some(9000));
    }
}
