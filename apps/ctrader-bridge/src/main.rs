//! cTrader Bridge Binary
//!
//! Starts the protocol bridge and its HTTP facade.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin ctrader-bridge
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `CTRADER_CLIENT_ID`: application client id
//! - `CTRADER_CLIENT_SECRET`: application client secret
//!
//! ## Optional
//! - `CTRADER_DEMO_HOST` / `CTRADER_DEMO_PORT`: demo endpoint
//! - `CTRADER_LIVE_HOST` / `CTRADER_LIVE_PORT`: live endpoint
//! - `BRIDGE_HTTP_PORT`: facade port (default: 8080)
//! - `BRIDGE_POOL_IDLE_TIMEOUT_SECS` / `BRIDGE_POOL_MAX_AGE_SECS`: recycling
//! - `RUST_LOG`: log filter (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ctrader_bridge::{AppState, Bridge, BridgeConfig, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    tracing::info!("Starting cTrader bridge");

    let config = BridgeConfig::from_env()?;
    log_config(&config);

    let shutdown = CancellationToken::new();

    let bridge = Arc::new(Bridge::new(config.clone()));
    bridge.spawn_sweeper(shutdown.clone());

    let state = AppState {
        bridge: Arc::clone(&bridge),
    };
    let router = create_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.server.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Facade server listening");

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        await_shutdown(signal_token).await;
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("Bridge stopped");
    Ok(())
}

/// Initialize tracing with an env-filter (`RUST_LOG`, default `info`).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Load .env file from the current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &BridgeConfig) {
    tracing::info!(
        demo_host = %config.endpoints.demo_host,
        live_host = %config.endpoints.live_host,
        http_port = config.server.http_port,
        "Configuration loaded"
    );
    tracing::debug!(
        heartbeat_secs = config.connection.heartbeat_interval.as_secs(),
        idle_timeout_secs = config.pool.idle_timeout.as_secs(),
        max_age_secs = config.pool.max_age.as_secs(),
        "Connection tunables"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
