//! Bookstore API server.
//!
//! Run from repo root: `cargo run -p bookstore-server`
//! Settings come from the environment or `.env` (`DATABASE_URL`, `BIND_ADDR`, ...).

use axum::{extract::Request, ServiceExt};
use bookstore_api::{build_app, ensure_database_exists, ensure_tables, init_tracing, AppState, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    init_tracing();

    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&settings.database_url)
        .await?;
    ensure_tables(&pool).await?;

    let bind_addr = settings.bind_addr;
    let app = build_app(AppState::new(pool, settings));
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Bookstore API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;
    Ok(())
}
