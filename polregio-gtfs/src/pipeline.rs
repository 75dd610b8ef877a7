//! End-to-end feed build.
//!
//! Phases run in order, each writing inside its own transaction:
//!
//! 1. check the carrier is served, then replace the store's contents with a
//!    fresh scrape of it
//! 2. reconcile stations against the registry
//! 3. curate platform labels, trip names and headsigns
//! 4. split trips into rail and bus legs
//!
//! and the result is exported as GTFS text files.

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::api::{ApiError, EndpointConfig, TimetableSource, ensure_carrier};
use crate::curate::{CurateError, CurateSummary, curate};
use crate::domain::{Agency, AnnotatorConfig, FeedInfo};
use crate::export::{ExportError, ExportSummary, export_gtfs};
use crate::scrape::{ScrapeError, ScrapeSummary, scrape_carrier};
use crate::segment::{SegmentError, SplitSummary, split_bus_legs};
use crate::stations::{
    DEFAULT_REGISTRY_URL, ReconcileError, ReconcileSummary, RegistryError, RegistryStation,
    fetch_registry, load_registry, reconcile_stations,
};
use crate::store::{Store, StoreError, clear_schedule, insert_agency, insert_feed_info};

/// Carrier scraped by default.
pub const DEFAULT_CARRIER: &str = "polregio-przewozy-regionalne";

/// Output directory used when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "polregio-gtfs";

/// Errors aborting a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid {var}: {message}")]
    Config { var: &'static str, message: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("scrape failed: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("station registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("station reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("curation failed: {0}")]
    Curate(#[from] CurateError),

    #[error("leg segmentation failed: {0}")]
    Segment(#[from] SegmentError),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

impl From<rusqlite::Error> for PipelineError {
    fn from(e: rusqlite::Error) -> Self {
        PipelineError::Store(e.into())
    }
}

/// Where the station registry is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    File(PathBuf),
    Url(String),
}

impl RegistrySource {
    pub async fn load(&self) -> Result<Vec<RegistryStation>, RegistryError> {
        match self {
            RegistrySource::File(path) => load_registry(path),
            RegistrySource::Url(url) => fetch_registry(url).await,
        }
    }
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Slug of the carrier to scrape
    pub carrier_slug: String,
    pub agency: Agency,
    /// Publisher row; its version is stamped when the config is built
    pub feed_info: FeedInfo,
    pub endpoint: EndpointConfig,
    pub annotator: AnnotatorConfig,
    pub registry: RegistrySource,
    /// SQLite file; in-memory when unset
    pub database: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            carrier_slug: DEFAULT_CARRIER.to_string(),
            agency: Agency::default(),
            feed_info: FeedInfo::default(),
            endpoint: EndpointConfig::default(),
            annotator: AnnotatorConfig::default(),
            registry: RegistrySource::Url(DEFAULT_REGISTRY_URL.to_string()),
            database: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl PipelineConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from `lookup`, which returns a variable's value if set.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `POLREGIO_BASE_URL` | ticketing API base URL |
    /// | `POLREGIO_CARRIER` | carrier slug |
    /// | `POLREGIO_PAUSE_MS` | minimum pause between API calls |
    /// | `POLREGIO_ROAD_ATTRIBUTE_IDS` | comma-separated attribute ids marking bus stretches |
    /// | `PLRAILMAP_PATH` | local registry file; takes precedence over `PLRAILMAP_URL` |
    /// | `PLRAILMAP_URL` | registry download URL |
    /// | `POLREGIO_DB` | SQLite database file |
    /// | `GTFS_OUTPUT_DIR` | export directory |
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("POLREGIO_BASE_URL") {
            config.endpoint = config.endpoint.with_base_url(url);
        }
        if let Some(pause) = get("POLREGIO_PAUSE_MS") {
            let ms: u64 = pause.trim().parse().map_err(|e| PipelineError::Config {
                var: "POLREGIO_PAUSE_MS",
                message: format!("{pause:?}: {e}"),
            })?;
            config.endpoint = config.endpoint.with_pause(Duration::from_millis(ms));
        }
        if let Some(slug) = get("POLREGIO_CARRIER") {
            config.carrier_slug = slug;
        }
        if let Some(ids) = get("POLREGIO_ROAD_ATTRIBUTE_IDS") {
            let ids = ids
                .split(',')
                .map(|id| id.trim().parse::<i64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| PipelineError::Config {
                    var: "POLREGIO_ROAD_ATTRIBUTE_IDS",
                    message: format!("{ids:?}: {e}"),
                })?;
            config.annotator = config.annotator.with_road_attribute_ids(ids);
        }

        if let Some(path) = get("PLRAILMAP_PATH") {
            config.registry = RegistrySource::File(PathBuf::from(path));
        } else if let Some(url) = get("PLRAILMAP_URL") {
            config.registry = RegistrySource::Url(url);
        }
        config.database = get("POLREGIO_DB").map(PathBuf::from);
        if let Some(dir) = get("GTFS_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Open the configured database.
    pub fn open_store(&self) -> Result<Store, StoreError> {
        match &self.database {
            Some(path) => Store::open(path),
            None => Store::open_in_memory(),
        }
    }
}

/// What one run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub scrape: ScrapeSummary,
    pub reconcile: ReconcileSummary,
    pub curate: CurateSummary,
    pub split: SplitSummary,
    pub export: ExportSummary,
}

/// Build the feed from `source` and `registry` into `store`, then export it.
pub async fn run<S: TimetableSource>(
    source: &S,
    registry: &[RegistryStation],
    store: &mut Store,
    config: &PipelineConfig,
) -> Result<RunSummary, PipelineError> {
    ensure_carrier(source, &config.carrier_slug).await?;

    let tx = store.transaction()?;
    clear_schedule(&tx)?;
    insert_agency(&tx, &config.agency)?;
    insert_feed_info(&tx, &config.feed_info)?;
    let scrape = scrape_carrier(
        source,
        &tx,
        &config.carrier_slug,
        &config.agency.id,
        &config.annotator,
    )
    .await?;
    tx.commit()?;

    let tx = store.transaction()?;
    let reconcile = reconcile_stations(&tx, registry)?;
    tx.commit()?;

    let tx = store.transaction()?;
    let curate = curate(&tx)?;
    tx.commit()?;

    let tx = store.transaction()?;
    let split = split_bus_legs(&tx, &config.annotator)?;
    tx.commit()?;

    let export = export_gtfs(store.connection(), &config.output_dir)?;
    info!(output = %config.output_dir.display(), "feed built");

    Ok(RunSummary {
        scrape,
        reconcile,
        curate,
        split,
        export,
    })
}
