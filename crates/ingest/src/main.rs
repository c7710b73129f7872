use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geoload_ingest::config::IngestConfig;
use geoload_ingest::pipeline;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geoload_ingest=info,geoload_db=info,geoload_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = match IngestConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(
        host = %config.database.host,
        port = config.database.port,
        database = %config.database.name,
        data_dir = %config.data_dir.display(),
        "Loaded ingestion configuration"
    );

    let options = match config.database.connect_options() {
        Ok(options) => options,
        Err(e) => {
            tracing::error!(error = %e, "Invalid database configuration");
            std::process::exit(1);
        }
    };

    let datasets = match config.datasets() {
        Ok(datasets) => datasets,
        Err(e) => {
            tracing::error!(error = %e, "Failed to resolve datasets");
            std::process::exit(1);
        }
    };
    tracing::info!(count = datasets.len(), "Datasets resolved");

    // --- Run ---
    match pipeline::run(&config, options, &datasets).await {
        Ok(report) => report.log_summary(),
        Err(e) => {
            tracing::error!(error = %e, "Ingestion aborted");
            std::process::exit(1);
        }
    }
}
