//! `geoload-db` -- PostgreSQL/PostGIS access for the ingestion job.
//!
//! Two handles are used: a single [`PgConnection`] for schema DDL and the
//! geoprocessing script, and a [`DbPool`] reserved for bulk table writes.

pub mod error;
pub mod ident;
pub mod repositories;
pub mod script;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection};

pub use error::DbError;

pub type DbPool = sqlx::PgPool;

/// Open a single direct connection.
pub async fn connect(options: &PgConnectOptions) -> Result<PgConnection, sqlx::Error> {
    PgConnection::connect_with(options).await
}

/// Create the bulk-load connection pool.
pub async fn create_pool(
    options: PgConnectOptions,
    max_connections: u32,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// Round-trip a trivial query through the pool.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
