mod config;
mod errors;
mod http;
mod inventory;
mod models;
mod uploads;

pub use config::ServerConfig;
pub use errors::{AppError, AppResult};
pub use http::{router, AppState};
pub use inventory::InventoryStore;
pub use models::{ImageUpload, Item, ItemDraft};
pub use uploads::UploadStore;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Wires storage and the HTTP router, binds the listener, and serves until
/// the process is stopped. The item collection is fully loaded before the
/// first request is accepted.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let uploads = UploadStore::new(config.uploads_dir.clone());
    uploads.ensure_dir().await?;

    let inventory = InventoryStore::load(config.db_file.clone(), uploads.clone()).await?;
    let state = AppState { inventory, uploads };
    let app = router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        db = %config.db_file.display(),
        uploads = %config.uploads_dir.display(),
        "inventory server listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Console logging honoring `RUST_LOG`. When a log directory is configured,
/// log lines instead go to a daily-rolling JSON file through a non-blocking
/// appender whose flush guard lives for the rest of the process.
pub fn init_tracing(log_dir: Option<&Path>) -> Result<(), String> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|error| error.to_string())?;
            let file_appender = tracing_appender::rolling::daily(dir, "stockroom.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .json()
                .with_writer(non_blocking)
                .try_init()
                .map_err(|error| error.to_string())
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .try_init()
            .map_err(|error| error.to_string()),
    }
}
