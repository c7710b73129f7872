use std::path::PathBuf;

/// Errors raised while decoding a dBase (`.dbf`) attribute table.
#[derive(Debug, thiserror::Error)]
pub enum DbfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Header is truncated: expected at least {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    #[error("Record {index} is truncated")]
    TruncatedRecord { index: usize },

    #[error("Header length {0} is shorter than the table header")]
    InvalidHeaderLength(usize),

    #[error("Record length {declared} cannot hold the fields ({required} bytes needed)")]
    InvalidRecordLength { declared: usize, required: usize },

    #[error("Field '{field}' has an invalid {kind} value: {raw:?}")]
    InvalidValue {
        field: String,
        kind: &'static str,
        raw: String,
    },
}

/// Errors raised while resolving or applying a coordinate reference system.
#[derive(Debug, thiserror::Error)]
pub enum CrsError {
    #[error("EPSG:{0} is not a known coordinate reference system")]
    UnknownEpsg(u32),

    #[error("Could not translate WKT into a projection definition: {0}")]
    Wkt(String),

    #[error("Invalid projection definition '{definition}': {message}")]
    Projection { definition: String, message: String },

    #[error("Coordinate transformation failed: {0}")]
    Transform(String),
}

/// Errors raised while reading a shapefile into a [`Layer`](crate::layer::Layer).
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("Shapefile not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read geometry from {}: {source}", .path.display())]
    Shapes {
        path: PathBuf,
        #[source]
        source: shapefile::Error,
    },

    #[error("Failed to read attributes from {}: {source}", .path.display())]
    Attributes {
        path: PathBuf,
        #[source]
        source: DbfError,
    },

    #[error("Failed to read projection from {}: {source}", .path.display())]
    Projection {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Geometry and attribute counts differ: {shapes} shapes, {records} records")]
    CountMismatch { shapes: usize, records: usize },

    #[error("Unsupported shape type: {0}")]
    UnsupportedShape(String),

    #[error("{} has no .prj and no fallback SRID is configured", .0.display())]
    MissingCrs(PathBuf),

    #[error(transparent)]
    Crs(#[from] CrsError),
}
