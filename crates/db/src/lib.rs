//! PostgreSQL persistence for the log relay.
//!
//! Holds the connection pool helpers and [`PgCheckpointStore`], the
//! database-backed [`CheckpointStore`](logrelay_core::CheckpointStore).

use sqlx::postgres::PgPoolOptions;

pub mod checkpoint_store;

pub use checkpoint_store::PgCheckpointStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
