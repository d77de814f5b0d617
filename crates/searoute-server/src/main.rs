//! searoute server - maritime route generation and segment storage

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use searoute_server::config::Config;
use searoute_server::state::AppState;
use searoute_server::{api, loops, persistence};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(config.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.log_json).then(tracing_subscriber::fmt::layer))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("searoute_server=debug".parse()?)
                .add_directive("searoute_core=info".parse()?),
        )
        .init();

    tracing::info!("Starting searoute server...");

    let db = persistence::init_database(&config.database_path, config.database_max_connections).await?;
    let port = config.server_port;
    let state = Arc::new(AppState::new(db, config));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let prune_loop = tokio::spawn(loops::cache_prune_loop::run_cache_prune_loop(
        state.clone(),
        shutdown_tx.subscribe(),
    ));

    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", err);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
        })
        .await?;

    let failed = loops::shutdown_loops(&shutdown_tx, vec![("cache prune loop", prune_loop)]).await;
    if failed > 0 {
        tracing::warn!("{} background loop(s) did not stop cleanly", failed);
    }
    tracing::info!("Shutdown complete");

    Ok(())
}
