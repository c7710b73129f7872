//! The ingestion run.
//!
//! Steps are awaited strictly in order: connection, engine, schemas, one
//! load per dataset, then the SQL script. Connection and engine failures
//! end the run with an error; every other failure is recorded in the
//! [`RunReport`] and the run moves on, unless `halt_on_error` is set.

use std::future::Future;
use std::time::Instant;

use geoload_core::dataset::DatasetDescriptor;
use geoload_core::layer::read_layer;
use geoload_db::repositories::{LayerRepo, SchemaRepo};
use geoload_db::script::run_script;
use geoload_db::DbPool;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::report::{Criticality, Outcome, RunReport, Step, StepReport};

/// Run the whole job against the database described by `options`.
///
/// Returns `Err` only for fatal failures (connection or engine); the
/// connection is closed before returning in every case.
pub async fn run(
    config: &IngestConfig,
    options: PgConnectOptions,
    datasets: &[DatasetDescriptor],
) -> Result<RunReport, IngestError> {
    let started = Instant::now();
    let mut conn = geoload_db::connect(&options)
        .await
        .map_err(IngestError::Connect)?;
    tracing::info!("Database connection opened");

    let mut runner = Runner::new(config.halt_on_error);
    runner.record(Step::Connect, started, Ok(None));

    let started = Instant::now();
    let pool = match open_engine(options, config.database.max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            close_connection(conn).await;
            return Err(e);
        }
    };
    tracing::info!(
        max_connections = config.database.max_connections,
        "Bulk-load engine created"
    );
    runner.record(Step::Engine, started, Ok(None));

    for name in config.schemas(datasets) {
        let step = Step::Schema { name: name.clone() };
        runner
            .step(step, async {
                SchemaRepo::ensure_schema(&mut conn, &name).await?;
                Ok::<_, IngestError>(None)
            })
            .await;
    }

    for dataset in datasets {
        let step = Step::Load {
            path: dataset.path.clone(),
            target: dataset.to_string(),
        };
        runner
            .step(step, load_dataset(&mut conn, &pool, dataset, config))
            .await;
    }

    let step = Step::Script {
        path: config.sql_script.clone(),
    };
    runner
        .step(step, async {
            let rows = run_script(&mut conn, &config.sql_script).await?;
            Ok::<_, IngestError>(Some(format!("{rows} rows affected")))
        })
        .await;

    close_connection(conn).await;
    pool.close().await;
    tracing::info!("Database connection and engine closed");

    Ok(runner.report)
}

/// Load one shapefile into its table.
///
/// A failure to enable PostGIS is logged and the load goes ahead; if the
/// extension is really missing, creating the table fails instead.
async fn load_dataset(
    conn: &mut PgConnection,
    pool: &DbPool,
    dataset: &DatasetDescriptor,
    config: &IngestConfig,
) -> Result<Option<String>, IngestError> {
    if let Err(e) = SchemaRepo::enable_postgis(conn).await {
        tracing::warn!(table = %dataset, error = %e, "Could not enable PostGIS");
    }

    let path = dataset.path.clone();
    let options = config.read_options();
    let layer = tokio::task::spawn_blocking(move || read_layer(&path, &options)).await??;

    let rows = LayerRepo::replace(
        pool,
        &dataset.schema,
        &dataset.table,
        &layer,
        config.insert_batch_rows,
    )
    .await?;

    tracing::info!(
        table = %dataset,
        rows,
        geometry = layer.geometry_kind.postgis_name(),
        source_srid = ?layer.source_crs.epsg,
        reprojected = layer.reprojected,
        "Shapefile loaded"
    );

    let source = match layer.source_crs.epsg {
        Some(code) => format!("EPSG:{code}"),
        None => "custom CRS".to_owned(),
    };
    Ok(Some(if layer.reprojected {
        format!("{rows} rows, reprojected from {source}")
    } else {
        format!("{rows} rows")
    }))
}

/// Create the pool and check that it can reach the database.
async fn open_engine(
    options: PgConnectOptions,
    max_connections: u32,
) -> Result<DbPool, IngestError> {
    let pool = geoload_db::create_pool(options, max_connections)
        .await
        .map_err(IngestError::Engine)?;
    if let Err(e) = geoload_db::health_check(&pool).await {
        pool.close().await;
        return Err(IngestError::Engine(e));
    }
    Ok(pool)
}

async fn close_connection(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "Failed to close database connection");
    }
}

/// Applies step criticality and the halt policy while building the report.
struct Runner {
    report: RunReport,
    halt_on_error: bool,
}

impl Runner {
    fn new(halt_on_error: bool) -> Self {
        Self {
            report: RunReport::default(),
            halt_on_error,
        }
    }

    /// Run `work` unless the run has been halted, and record its result.
    async fn step<F>(&mut self, step: Step, work: F)
    where
        F: Future<Output = Result<Option<String>, IngestError>>,
    {
        if self.report.halted {
            tracing::info!(step = %step, "Skipping step");
            self.report.push(StepReport {
                step,
                outcome: Outcome::Skipped,
                error: None,
                detail: None,
                elapsed: Default::default(),
            });
            return;
        }

        tracing::info!(step = %step, "Starting step");
        let halts = self.halt_on_error || step.criticality() == Criticality::Fatal;
        let started = Instant::now();
        let result = work.await;
        let failed = result.is_err();
        self.record(step, started, result);

        if failed && halts {
            tracing::warn!("Halting run after failed step");
            self.report.halted = true;
        }
    }

    fn record(
        &mut self,
        step: Step,
        started: Instant,
        result: Result<Option<String>, IngestError>,
    ) {
        let elapsed = started.elapsed();
        let report = match result {
            Ok(detail) => {
                tracing::info!(
                    step = %step,
                    elapsed_ms = elapsed.as_millis() as u64,
                    detail = detail.as_deref().unwrap_or(""),
                    "Step succeeded"
                );
                StepReport {
                    step,
                    outcome: Outcome::Succeeded,
                    error: None,
                    detail,
                    elapsed,
                }
            }
            Err(e) => {
                tracing::error!(step = %step, error = %e, "Step failed");
                StepReport {
                    step,
                    outcome: Outcome::Failed,
                    error: Some(e.to_string()),
                    detail: None,
                    elapsed,
                }
            }
        };
        self.report.push(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoload_core::fixture::{PointShapefile, WGS84_PRJ};
    use sqlx::PgPool;

    // ---------------------------------------------------------------------------
    // Test: A failed CREATE EXTENSION does not stop the load
    // ---------------------------------------------------------------------------

    #[sqlx::test(migrations = false)]
    async fn load_continues_when_the_extension_cannot_be_enabled(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let path = PointShapefile::new()
            .field("NOMBRE", b'C', 20, 0)
            .point(-70.68, -33.45, &["COPEC"])
            .prj(WGS84_PRJ)
            .write(dir.path(), "GASOLINERA")
            .unwrap();
        let config = IngestConfig::from_lookup(|_| None).unwrap();
        let dataset = DatasetDescriptor::new(path, "public", "GASOLINERA");

        let mut conn = pool.acquire().await.unwrap();
        SchemaRepo::enable_postgis(&mut *conn).await.unwrap();

        // The bulk load runs on the pool, so only the direct connection
        // refuses DDL.
        sqlx::query("SET SESSION CHARACTERISTICS AS TRANSACTION READ ONLY")
            .execute(&mut *conn)
            .await
            .unwrap();
        assert!(SchemaRepo::enable_postgis(&mut *conn).await.is_err());

        let detail = load_dataset(&mut *conn, &pool, &dataset, &config)
            .await
            .unwrap();

        assert_eq!(detail.as_deref(), Some("1 rows"));
        assert_eq!(LayerRepo::count(&pool, "public", "GASOLINERA").await.unwrap(), 1);
    }
}
