use habit_tracker::{AppConfig, AppState, HabitTracker, config::RemoteBackend, router};
use std::net::SocketAddr;
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::from_env()?;
    if let Some(parent) = config.cache_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    if let RemoteBackend::File(path) = &config.remote {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
    }

    let tracker = HabitTracker::with_cache(config.record_backend(), config.cache_path.clone()).await;
    if let Err(err) = tracker.refresh().await {
        warn!("initial sync failed, serving cached habits: {err}");
    }

    let app = router(AppState::new(tracker));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
