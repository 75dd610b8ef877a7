//! Station registry and reconciliation error types.

use std::fmt;
use std::path::PathBuf;

use crate::store::StoreError;

/// Errors that can occur when loading the station registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Registry file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Download failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Download returned an error status
    #[error("registry download from {url} failed with status {status}")]
    Status { status: u16, url: String },

    /// Document is not a valid OSM file
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// A scraped station the registry has no entry for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingStation {
    pub id: String,
    pub name: String,
}

impl fmt::Display for MissingStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing data for {} {:?}", self.id, self.name)
    }
}

/// Errors that can occur during reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Stations left uncurated, all of them
    #[error("{} stations without registry data:\n{}", .0.len(), render(.0))]
    MissingStations(Vec<MissingStation>),
}

fn render(missing: &[MissingStation]) -> String {
    missing
        .iter()
        .map(MissingStation::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
