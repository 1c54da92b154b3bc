use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

/// Opens the connection pool and applies pending migrations.
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;

    match sqlx::migrate!("./migrations").run(&db).await {
        Ok(()) => info!("migrations applied"),
        Err(e) => {
            warn!(error = %e, "migrations folder not found or migration failed; continuing")
        }
    }
    Ok(db)
}
