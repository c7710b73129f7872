//! Execution of the geoprocessing SQL script.

use std::path::Path;

use sqlx::{Connection, PgConnection};

use crate::error::DbError;

/// Run the SQL file at `path` as one batch inside a transaction.
///
/// The transaction is opened before the file is read, so an unreadable
/// file and a failing statement both end in a rollback. Statements go
/// through the simple query protocol and may therefore be many per file.
/// Returns the rows affected across the batch.
pub async fn run_script(conn: &mut PgConnection, path: &Path) -> Result<u64, DbError> {
    let mut tx = conn.begin().await?;

    let script = match tokio::fs::read_to_string(path).await {
        Ok(script) => script,
        Err(source) => {
            tracing::warn!(path = %path.display(), error = %source, "Could not read SQL script");
            tx.rollback().await?;
            return Err(DbError::Script {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    match sqlx::raw_sql(&script).execute(&mut *tx).await {
        Ok(result) => {
            tx.commit().await?;
            tracing::debug!(
                path = %path.display(),
                rows_affected = result.rows_affected(),
                "SQL script committed"
            );
            Ok(result.rows_affected())
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "SQL script failed, rolling back");
            tx.rollback().await?;
            Err(e.into())
        }
    }
}
