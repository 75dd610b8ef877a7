//! Curated station registry (PLRailMap OSM file).
//!
//! Stations are OSM point nodes tagged `ref` (carrier station id),
//! optionally `ref:2` (an alias id the carrier also uses) and `name`.
//! Ways, relations and untagged nodes are ignored.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::error::RegistryError;

/// Where the registry is published.
pub const DEFAULT_REGISTRY_URL: &str =
    "https://raw.githubusercontent.com/MKuranowski/PLRailMap/master/plrailmap.osm";

/// A curated station.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryStation {
    pub id: String,
    pub alias_id: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
struct Osm {
    #[serde(default)]
    node: Vec<OsmNode>,
}

#[derive(Debug, Deserialize)]
struct OsmNode {
    #[serde(rename = "@id")]
    id: i64,
    #[serde(rename = "@lat")]
    lat: Option<f64>,
    #[serde(rename = "@lon")]
    lon: Option<f64>,
    #[serde(default)]
    tag: Vec<OsmTag>,
}

#[derive(Debug, Deserialize)]
struct OsmTag {
    #[serde(rename = "@k")]
    k: String,
    #[serde(rename = "@v")]
    v: String,
}

impl OsmNode {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tag
            .iter()
            .find(|t| t.k == key)
            .map(|t| t.v.as_str())
            .filter(|v| !v.is_empty())
    }

    fn into_station(self) -> Option<RegistryStation> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            debug!(node = self.id, "node without coordinates, skipping");
            return None;
        };
        let id = self.tag("ref")?.to_string();
        let name = self.tag("name")?.to_string();
        let alias_id = self.tag("ref:2").map(str::to_string);

        Some(RegistryStation {
            id,
            alias_id,
            name,
            lat,
            lon,
        })
    }
}

/// Parse a registry document.
pub fn parse_registry(xml: &str) -> Result<Vec<RegistryStation>, RegistryError> {
    let osm: Osm = quick_xml::de::from_str(xml)?;
    let stations: Vec<_> = osm
        .node
        .into_iter()
        .filter_map(OsmNode::into_station)
        .collect();
    info!(stations = stations.len(), "parsed station registry");
    Ok(stations)
}

/// Read and parse a registry file.
pub fn load_registry(path: impl AsRef<Path>) -> Result<Vec<RegistryStation>, RegistryError> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_registry(&xml)
}

/// Download and parse the registry.
pub async fn fetch_registry(url: &str) -> Result<Vec<RegistryStation>, RegistryError> {
    info!(url, "downloading station registry");
    let response = reqwest::get(url).await?;
    let status = response.status();

    if !status.is_success() {
        return Err(RegistryError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    parse_registry(&response.text().await?)
}
