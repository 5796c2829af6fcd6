//! PostgreSQL persistence for the bulk salary adjustment backend.
//!
//! - [`models`]: `FromRow` row structs and their conversions to domain types.
//! - [`repositories`]: zero-sized repos with async query methods taking
//!   `&PgPool` (or a transaction) as the first argument.
//! - [`store`]: implementations of the `payroll-core` store traits on top
//!   of the repositories.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod store;

pub use store::{PgEmployeeDirectory, PgHistoryStore, PgTemplateStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply any pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
