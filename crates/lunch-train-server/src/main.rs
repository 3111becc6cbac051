use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::FixedOffset;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use mockable::DefaultClock;

use lunch_train_api::{AppState, AppStateInner, TrainService};

const DEFAULT_LOG_FILTER: &str = "lunch_train=debug,lunch_train_api=debug,lunch_train_db=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    // Config
    let db_path = std::env::var("LUNCH_TRAIN_DB_PATH").unwrap_or_else(|_| "lunch-train.db".into());
    let host = std::env::var("LUNCH_TRAIN_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("LUNCH_TRAIN_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    // "Today" for listings is evaluated at this offset, e.g. "+03:00".
    let utc_offset: FixedOffset = std::env::var("LUNCH_TRAIN_UTC_OFFSET")
        .unwrap_or_else(|_| "+00:00".into())
        .parse()
        .context("LUNCH_TRAIN_UTC_OFFSET must look like +HH:MM")?;

    // Init database
    let db = Arc::new(lunch_train_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let trains = TrainService::new(db, Arc::new(DefaultClock), utc_offset);
    let state: AppState = Arc::new(AppStateInner { trains });

    let app = lunch_train_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Lunch train server listening on {} (day boundary at UTC{})", addr, utc_offset);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
