//! Dataset descriptors: which shapefile goes into which table.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Schema that receives the raw input layers.
pub const INPUT_SCHEMA: &str = "entradas";

/// Schema reserved for the geoprocessing results produced by the SQL script.
pub const RESULT_SCHEMA: &str = "resultados";

/// Default SQL script, relative to the data directory.
pub const DEFAULT_SQL_SCRIPT: &str = "CONSULTAS/GEOPROCESOS.sql";

/// Built-in `(relative path, table)` pairs loaded when no manifest is given.
pub const DEFAULT_DATASETS: &[(&str, &str)] = &[
    // Vacant parcels
    ("PrediosEstacionCentral/SITIOERIAZO_13106.shp", "SITIOERIAZO_13106"),
    // Communal zoning plan
    ("PRC/PRC13106.shp", "PRC13106"),
    // Fuel stations
    ("SERVICIO/GASOLINERA.shp", "GASOLINERA"),
    // Census blocks
    ("MANZANAS/MANZANA13106.shp", "MANZANA13106"),
];

/// One shapefile and the table it is loaded into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Path to the `.shp` file. Sidecars are looked up next to it.
    pub path: PathBuf,
    /// Target schema.
    pub schema: String,
    /// Target table name. Case is preserved.
    pub table: String,
}

impl DatasetDescriptor {
    pub fn new(path: impl Into<PathBuf>, schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// The built-in datasets, resolved against `data_dir` and placed in `schema`.
    pub fn defaults(data_dir: &Path, schema: &str) -> Vec<Self> {
        DEFAULT_DATASETS
            .iter()
            .map(|(path, table)| Self::new(data_dir.join(path), schema, *table))
            .collect()
    }
}

impl fmt::Display for DatasetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_four_input_layers() {
        let datasets = DatasetDescriptor::defaults(Path::new("/data"), INPUT_SCHEMA);

        let tables: Vec<_> = datasets.iter().map(|d| d.table.as_str()).collect();
        assert_eq!(
            tables,
            ["SITIOERIAZO_13106", "PRC13106", "GASOLINERA", "MANZANA13106"]
        );
        assert!(datasets.iter().all(|d| d.schema == "entradas"));
        assert_eq!(
            datasets[1].path,
            PathBuf::from("/data/PRC/PRC13106.shp")
        );
    }

    #[test]
    fn display_is_schema_qualified() {
        let d = DatasetDescriptor::new("a.shp", "entradas", "GASOLINERA");
        assert_eq!(d.to_string(), "entradas.GASOLINERA");
    }
}
