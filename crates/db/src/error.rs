use std::path::PathBuf;

/// Errors raised by database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Failed to read SQL script {}: {source}", .path.display())]
    Script {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid identifier {0:?}")]
    InvalidIdentifier(String),
}
