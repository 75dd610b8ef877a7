use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use polregio_gtfs::api::{Endpoint, MockEndpoint, TimetableSource};
use polregio_gtfs::pipeline::{PipelineConfig, PipelineError, run};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match build().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn build() -> Result<(), PipelineError> {
    let config = PipelineConfig::from_env()?;

    // Replay canned responses instead of calling the live API
    match std::env::var("POLREGIO_MOCK_DATA") {
        Ok(path) if !path.is_empty() => {
            info!(%path, "using mock API data");
            build_from(&MockEndpoint::from_json_file(path)?, &config).await
        }
        _ => build_from(&Endpoint::new(config.endpoint.clone())?, &config).await,
    }
}

async fn build_from<S: TimetableSource>(
    source: &S,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    let registry = config.registry.load().await?;
    info!(stations = registry.len(), "loaded station registry");

    let mut store = config.open_store()?;
    let summary = run(source, &registry, &mut store, config).await?;

    for (file, rows) in &summary.export.files {
        info!(file, rows, "wrote");
    }
    Ok(())
}
