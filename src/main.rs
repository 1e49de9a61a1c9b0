//! Road Dogs Game Server - Authoritative loot-collecting game server
//!
//! This is the main entry point for the game server. It handles:
//! - Loading maps from the game config file
//! - HTTP endpoints for joining, moving and observing sessions
//! - The optional simulation ticker
//! - Restoring and saving world state across restarts

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use road_dogs_server::app::{persistence, ticker, AppState, GameEngine};
use road_dogs_server::config::{load_game_config, Config, LogFormat};
use road_dogs_server::game::WorldSettings;
use road_dogs_server::http::build_router;
use road_dogs_server::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level, config.log_format);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Road Dogs Server");
    info!("Server address: {}", config.server_addr);

    let game_config = load_game_config(&config.game_config_path)?;
    let engine = Arc::new(GameEngine::new(
        game_config.maps,
        WorldSettings {
            loot_generator: game_config.loot_generator,
            seed: config.seed,
        },
    )?);

    if let Some(path) = &config.state_file {
        match persistence::load_state(path)? {
            Some(snapshot) => engine
                .restore(snapshot)
                .with_context(|| format!("restoring state from {}", path.display()))?,
            None => info!(path = %path.display(), "No saved state, starting fresh"),
        }
    }

    // Spawn the simulation ticker
    if let Some(period) = config.tick_period {
        let engine = engine.clone();
        tokio::spawn(async move {
            ticker::run(engine, period).await;
        });
    } else {
        info!("No tick period configured, time advances through /api/v1/game/tick");
    }

    // Build router
    let state = AppState::new(config.clone(), engine.clone());
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(path) = &config.state_file {
        if let Err(e) = persistence::save_state(path, &engine.snapshot()) {
            warn!(error = %e, "Failed to save world state");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Plain => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
