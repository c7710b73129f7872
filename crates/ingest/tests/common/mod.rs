//! Shared helpers for geoload-ingest integration tests.

use std::collections::HashMap;
use std::path::Path;

use geoload_core::fixture::{PointShapefile, UTM_19S_PRJ, WGS84_PRJ};
use geoload_ingest::config::IngestConfig;

/// Build a config from explicit variables, ignoring the process environment.
pub fn config(vars: &[(&str, String)]) -> IngestConfig {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect();
    IngestConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

/// Lay out a data directory with two layers and a script, and return a
/// manifest path pointing at them.
pub fn data_dir(dir: &Path, script: &str) -> std::path::PathBuf {
    std::fs::create_dir_all(dir.join("SERVICIO")).unwrap();
    std::fs::create_dir_all(dir.join("PrediosEstacionCentral")).unwrap();
    std::fs::create_dir_all(dir.join("CONSULTAS")).unwrap();

    PointShapefile::new()
        .field("NOMBRE", b'C', 20, 0)
        .point(-70.68, -33.45, &["COPEC"])
        .point(-70.69, -33.46, &["SHELL"])
        .prj(WGS84_PRJ)
        .write(&dir.join("SERVICIO"), "GASOLINERA")
        .unwrap();
    PointShapefile::new()
        .field("ROL", b'C', 12, 0)
        .point(343_000.0, 6_297_000.0, &["1234-5"])
        .prj(UTM_19S_PRJ)
        .write(&dir.join("PrediosEstacionCentral"), "SITIOERIAZO_13106")
        .unwrap();
    std::fs::write(dir.join("CONSULTAS").join("GEOPROCESOS.sql"), script).unwrap();

    let manifest = dir.join("manifest.json");
    std::fs::write(
        &manifest,
        r#"[
            {"path": "PrediosEstacionCentral/SITIOERIAZO_13106.shp", "table": "SITIOERIAZO_13106"},
            {"path": "SERVICIO/GASOLINERA.shp", "table": "GASOLINERA"}
        ]"#,
    )
    .unwrap();
    manifest
}
