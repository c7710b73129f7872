use std::path::PathBuf;

use geoload_core::error::LayerError;
use geoload_db::DbError;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("DATABASE_URL is not a valid connection string: {0}")]
    DatabaseUrl(#[source] sqlx::Error),
}

/// Errors raised while loading a dataset manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Manifest {} lists no datasets", .0.display())]
    Empty(PathBuf),

    #[error("Manifest entry {index} has an empty table name")]
    EmptyTable { index: usize },
}

/// Errors raised by an ingestion step.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Could not connect to the database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Could not create the bulk-load engine: {0}")]
    Engine(#[source] sqlx::Error),

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Shapefile reader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
