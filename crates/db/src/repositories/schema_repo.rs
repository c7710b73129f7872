//! Schema and extension bootstrap.

use sqlx::{Connection, PgConnection};

use crate::error::DbError;
use crate::ident::quote_ident;

/// Ensures schemas and the PostGIS extension exist.
pub struct SchemaRepo;

impl SchemaRepo {
    /// `CREATE SCHEMA IF NOT EXISTS`. Safe to call repeatedly.
    pub async fn ensure_schema(conn: &mut PgConnection, name: &str) -> Result<(), DbError> {
        let query = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(name)?);
        sqlx::query(&query).execute(&mut *conn).await?;
        tracing::debug!(schema = name, "Schema ensured");
        Ok(())
    }

    /// Enable PostGIS inside a transaction, rolling back on failure.
    pub async fn enable_postgis(conn: &mut PgConnection) -> Result<(), DbError> {
        let mut tx = conn.begin().await?;
        match sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis")
            .execute(&mut *tx)
            .await
        {
            Ok(_) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "CREATE EXTENSION failed, rolling back");
                tx.rollback().await?;
                Err(e.into())
            }
        }
    }

    /// Whether a schema named `name` exists.
    pub async fn schema_exists(conn: &mut PgConnection, name: &str) -> Result<bool, DbError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
        )
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
        Ok(exists.0)
    }
}
