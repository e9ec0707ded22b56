// Bookstore Inventory - Web Server

use anyhow::{Context, Result};
use std::fs::File;

use bookstore_inventory::{
    api, default_catalog, load_books_csv, logging, seed_books, Config, Store,
};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env()?;

    let store = Store::open(&config.db_path, config.opening_balance)
        .with_context(|| format!("Failed to open database {:?}", config.db_path))?;
    tracing::info!(path = ?config.db_path, "database opened");

    seed_if_empty(&store, &config)?;

    let app = api::build_app(store, config.credentials.clone());

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        user = config.credentials.username(),
        "server listening"
    );

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}

/// First start: load the configured CSV, or the built-in catalog
fn seed_if_empty(store: &Store, config: &Config) -> Result<()> {
    let existing = store.with_connection(bookstore_inventory::catalog::count_books)??;
    if existing > 0 {
        return Ok(());
    }

    let books = match &config.seed_csv {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
            load_books_csv(file)?
        }
        None => default_catalog()?,
    };

    store.with_connection(|conn| seed_books(conn, &books))??;
    Ok(())
}
