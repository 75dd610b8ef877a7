//! Station curation.
//!
//! Scraped stations carry only the carrier's id and name. Positions come
//! from the PLRailMap registry, an OSM file keyed by the same ids, which
//! also records the alias ids under which the carrier serves some
//! stations twice.

mod error;
mod reconcile;
mod registry;

pub use error::{MissingStation, ReconcileError, RegistryError};
pub use reconcile::{ReconcileSummary, reconcile_stations};
pub use registry::{
    DEFAULT_REGISTRY_URL, RegistryStation, fetch_registry, load_registry, parse_registry,
};
