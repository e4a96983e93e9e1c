//! Jobsync Server binary.

use std::sync::Arc;

use jobsync_server::config::Config;
use jobsync_server::local::LocalStore;
use jobsync_server::remote::PgRemote;
use jobsync_server::{build_router, spawn_broadcasts, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobsync_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Jobsync Server on {}:{}", config.host, config.port);

    let remote = PgRemote::connect(&config.remote_database_url).await?;
    let local = LocalStore::open(&config.cache_path).await?;
    tracing::info!(
        cache = %config.cache_path.display(),
        cached_jobs = local.job_count().await,
        "local cache opened"
    );

    let state = AppState::new(Arc::new(remote), local, &config);
    let broadcasts = spawn_broadcasts(&state);

    // Cached data is served while the first passes run.
    let session = state.clone();
    tokio::spawn(async move {
        session.engine.start_session().await;
        session.scheduler.start();
        if let Err(e) = session.notifications.start().await {
            tracing::warn!("Notification listener not started: {}", e);
        }
    });

    let app = build_router(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.scheduler.stop();
    state.notifications.stop();
    for task in broadcasts {
        task.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
