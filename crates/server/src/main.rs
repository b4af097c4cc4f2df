use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use moviewatch_core::catalog::{CatalogSource, JsonFileSource};
use moviewatch_core::store::MemoryStore;
use moviewatch_server::config::ServerConfig;
use moviewatch_server::state::{AppState, ServerEvent};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env();
    info!(catalog = %config.catalog_path.display(), "loading catalog");

    let catalog = JsonFileSource::new(&config.catalog_path)
        .load_catalog()
        .with_context(|| format!("failed to load catalog {}", config.catalog_path.display()))?;
    info!(items = catalog.len(), categories = catalog.categories().len() - 1, "catalog loaded");

    // Event broadcast channel
    let (events_tx, _) = tokio::sync::broadcast::channel::<ServerEvent>(256);

    let bind_addr = config.bind.clone();
    let state = AppState::new(catalog, config, Arc::new(MemoryStore::default()), events_tx.clone());
    let shutdown = CancellationToken::new();

    // Reap idle browsing sessions
    {
        let sessions = state.sessions.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(std::time::Duration::from_secs(60)) => {
                        sessions.cleanup_idle().await;
                    }
                }
            }
        });
    }

    // Spawn heartbeat emitter
    {
        let tx = events_tx.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut seq = 0u64;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(std::time::Duration::from_secs(30)) => {
                        let _ = tx.send(ServerEvent::Heartbeat { seq });
                        seq += 1;
                    }
                }
            }
        });
    }

    let app = moviewatch_server::routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %bind_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
        shutdown.cancel();
    })
    .await?;
    Ok(())
}
