// Chit Ledger - Web Server
// REST API with Axum over the SQLite record store

use anyhow::{Context, Result};
use tracing::info;

use chit_ledger::api::{router, AppState};
use chit_ledger::logging::init_tracing;
use chit_ledger::{AppConfig, ChitBook, SqliteStore, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;

    init_tracing(&config.log_level);

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("opening database {:?}", config.database_path))?;
    info!(path = ?config.database_path, "Database opened");

    let book = ChitBook::with_config(store, SystemClock, &config.guard, &config.ledger)?;
    let app = router(AppState::new(book));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!(%addr, "🚀 Server running, API under /api");

    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}
