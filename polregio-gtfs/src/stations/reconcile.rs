//! Reconciliation of scraped station stubs against the registry.
//!
//! The carrier sometimes serves one physical station under two ids. The
//! registry records the extra id as an alias; the stub carrying it is
//! either merged into the primary stub or, if the primary id was never
//! scraped, renamed to it. The registry's name and position are then
//! written onto the primary id.

use std::collections::{BTreeMap, HashSet};

use rusqlite::Connection;
use tracing::{debug, info};

use super::error::{MissingStation, ReconcileError};
use super::registry::RegistryStation;
use crate::domain::Stop;
use crate::store::{merge_stop, rename_stop, stops, update_stop};

/// Counts of what one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Stations that received registry data.
    pub curated: usize,
    /// Alias stubs folded into an existing primary stub.
    pub merged: usize,
    /// Alias stubs renamed to their primary id.
    pub renamed: usize,
    /// Registry entries matching no pending stub.
    pub unused: usize,
}

/// Curate every uncurated stop in `conn` from `registry`.
///
/// Fails with [`ReconcileError::MissingStations`] naming every stop still
/// uncurated once all registry entries have been applied.
pub fn reconcile_stations(
    conn: &Connection,
    registry: &[RegistryStation],
) -> Result<ReconcileSummary, ReconcileError> {
    let all = stops(conn)?;
    let mut known: HashSet<String> = all.iter().map(|s| s.id.clone()).collect();
    let mut pending: BTreeMap<String, String> = all
        .into_iter()
        .filter(|s| !s.is_curated())
        .map(|s| (s.id, s.name))
        .collect();
    info!(stops = known.len(), pending = pending.len(), "reconciling stations");

    let mut summary = ReconcileSummary::default();

    for station in registry {
        let alias = station
            .alias_id
            .as_deref()
            .filter(|alias| *alias != station.id);

        let alias_pending = alias.is_some_and(|a| pending.contains_key(a));
        if !alias_pending && !pending.contains_key(&station.id) {
            summary.unused += 1;
            continue;
        }

        if let Some(alias) = alias.filter(|_| alias_pending) {
            pending.remove(alias);
            known.remove(alias);

            if known.contains(&station.id) {
                debug!(alias, primary = %station.id, "merging alias stop");
                merge_stop(conn, alias, &station.id)?;
                summary.merged += 1;
            } else {
                debug!(alias, primary = %station.id, "renaming alias stop");
                rename_stop(conn, alias, &station.id)?;
                known.insert(station.id.clone());
                summary.renamed += 1;
            }
        }

        pending.remove(&station.id);
        update_stop(
            conn,
            &Stop {
                id: station.id.clone(),
                name: station.name.clone(),
                position: Some((station.lat, station.lon)),
            },
        )?;
        summary.curated += 1;
    }

    if !pending.is_empty() {
        return Err(ReconcileError::MissingStations(
            pending
                .into_iter()
                .map(|(id, name)| MissingStation { id, name })
                .collect(),
        ));
    }

    info!(?summary, "stations reconciled");
    Ok(summary)
}
