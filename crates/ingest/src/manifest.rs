//! JSON dataset manifest.
//!
//! ```json
//! [
//!   { "path": "SERVICIO/GASOLINERA.shp", "table": "GASOLINERA" },
//!   { "path": "/srv/extra/RIOS.shp", "table": "RIOS", "schema": "extra" }
//! ]
//! ```
//!
//! Relative paths are resolved against the data directory; entries without
//! a schema go to the input schema.

use std::path::{Path, PathBuf};

use geoload_core::dataset::DatasetDescriptor;
use serde::Deserialize;

use crate::error::ManifestError;

/// One manifest entry as written in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
}

/// Read the manifest at `path` into dataset descriptors.
pub fn load_manifest(
    path: &Path,
    data_dir: &Path,
    default_schema: &str,
) -> Result<Vec<DatasetDescriptor>, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let entries: Vec<ManifestEntry> =
        serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if entries.is_empty() {
        return Err(ManifestError::Empty(path.to_path_buf()));
    }
    resolve(entries, data_dir, default_schema)
}

fn resolve(
    entries: Vec<ManifestEntry>,
    data_dir: &Path,
    default_schema: &str,
) -> Result<Vec<DatasetDescriptor>, ManifestError> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let table = entry.table.trim();
            if table.is_empty() {
                return Err(ManifestError::EmptyTable { index });
            }
            let schema = entry
                .schema
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| default_schema.to_owned());
            Ok(DatasetDescriptor::new(data_dir.join(&entry.path), schema, table))
        })
        .collect()
}
