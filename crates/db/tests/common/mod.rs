//! Shared helpers for geoload-db integration tests.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use geoload_core::fixture::PointShapefile;
use geoload_core::layer::{read_layer, Layer, ReadOptions};
use geoload_db::repositories::SchemaRepo;
use sqlx::PgPool;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

pub const SCHEMA: &str = "entradas";

/// Enable PostGIS and create the input schema on a pooled connection.
pub async fn bootstrap(pool: &PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    SchemaRepo::enable_postgis(&mut conn).await.unwrap();
    SchemaRepo::ensure_schema(&mut conn, SCHEMA).await.unwrap();
}

/// Write a point shapefile into `dir` and return its path.
pub fn write(dir: &Path, stem: &str, shapefile: PointShapefile) -> PathBuf {
    shapefile.write(dir, stem).unwrap()
}

/// Read a shapefile with default options.
pub fn load(path: &Path) -> Layer {
    read_layer(path, &ReadOptions::default()).unwrap()
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events at `DEBUG` and above here until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
