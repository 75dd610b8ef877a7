//! Leg segmentation of every trip in the record store.
//!
//! Trips run entirely by replacement bus are moved to a companion bus
//! route. Trips mixing rail and bus are replaced by one trip per leg,
//! linked by timed transfers at the stations where the mode changes.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::domain::{
    AnnotatorConfig, Leg, Route, RouteType, StopTime, Transfer, TransferType, Trip, compute_legs,
};
use crate::store::{
    StoreError, delete_trip, insert_route, insert_stop_time, insert_transfer, insert_trip, route,
    set_trip_route, stop_times_of, trip, trip_ids,
};

const PROGRESS_EVERY: usize = 500;

/// Suffix turning a rail route id into its companion bus route id.
pub const ROAD_ROUTE_SUFFIX: &str = "BUS";

/// Errors aborting segmentation.
#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one segmentation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// Trips moved whole onto a bus route.
    pub retagged: usize,
    /// Trips replaced by per-leg trips.
    pub split: usize,
    /// Per-leg trips created.
    pub legs: usize,
    pub transfers: usize,
    /// Companion bus routes created.
    pub road_routes: usize,
}

/// Segment every trip in `conn` by travel mode.
pub fn split_bus_legs(
    conn: &Connection,
    annotator: &AnnotatorConfig,
) -> Result<SplitSummary, SegmentError> {
    let ids = trip_ids(conn)?;
    let mut splitter = Splitter {
        conn,
        annotator,
        added_routes: HashSet::new(),
        summary: SplitSummary::default(),
    };

    for (i, trip_id) in ids.iter().enumerate() {
        splitter.process_trip(trip_id)?;
        if (i + 1) % PROGRESS_EVERY == 0 {
            info!(done = i + 1, total = ids.len(), "segmentation progress");
        }
    }

    let summary = splitter.summary;
    info!(?summary, "trips segmented");
    Ok(summary)
}

struct Splitter<'a> {
    conn: &'a Connection,
    annotator: &'a AnnotatorConfig,
    added_routes: HashSet<String>,
    summary: SplitSummary,
}

impl Splitter<'_> {
    fn process_trip(&mut self, trip_id: &str) -> Result<(), StoreError> {
        let Some(trip) = trip(self.conn, trip_id)? else {
            warn!(trip_id, "trip vanished during segmentation, skipping");
            return Ok(());
        };
        let stop_times = stop_times_of(self.conn, trip_id)?;
        let legs = compute_legs(&stop_times);

        let single_road_leg = matches!(legs.as_slice(), [leg] if leg.mode.is_road());
        if self.annotator.is_road_replacement(&trip.short_name) || single_road_leg {
            self.retag(&trip)
        } else if legs.len() > 1 {
            self.split(&trip, &legs)
        } else {
            if legs.is_empty() {
                warn!(trip_id, stops = stop_times.len(), "trip has fewer than two stops");
            }
            Ok(())
        }
    }

    fn retag(&mut self, trip: &Trip) -> Result<(), StoreError> {
        let road_route = self.road_route(&trip.route_id)?;
        if road_route == trip.route_id {
            return Ok(());
        }
        debug!(trip_id = %trip.id, route = %road_route, "moving trip to bus route");
        set_trip_route(self.conn, &trip.id, &road_route)?;
        self.summary.retagged += 1;
        Ok(())
    }

    fn split(&mut self, trip: &Trip, legs: &[Leg]) -> Result<(), StoreError> {
        debug!(trip_id = %trip.id, legs = legs.len(), "splitting trip into legs");
        delete_trip(self.conn, &trip.id)?;

        for (k, leg) in legs.iter().enumerate() {
            let leg_id = leg_trip_id(&trip.id, k);
            let route_id = if leg.mode.is_road() {
                self.road_route(&trip.route_id)?
            } else {
                trip.route_id.clone()
            };

            insert_trip(
                self.conn,
                &Trip {
                    id: leg_id.clone(),
                    route_id,
                    ..trip.clone()
                },
            )?;

            for (sequence, stop_time) in leg.stop_times.iter().enumerate() {
                insert_stop_time(
                    self.conn,
                    &StopTime {
                        trip_id: leg_id.clone(),
                        stop_sequence: sequence as u32,
                        ..stop_time.clone()
                    },
                )?;
            }
            self.summary.legs += 1;

            if k > 0 {
                self.link(&legs[k - 1], leg, leg_trip_id(&trip.id, k - 1), leg_id)?;
            }
        }

        self.summary.split += 1;
        Ok(())
    }

    /// Timed transfer from the end of `previous` to the start of `next`.
    fn link(
        &mut self,
        previous: &Leg,
        next: &Leg,
        from_trip_id: String,
        to_trip_id: String,
    ) -> Result<(), StoreError> {
        let (Some(from), Some(to)) = (previous.last(), next.first()) else {
            return Ok(());
        };

        let transfer = Transfer {
            from_stop_id: from.stop_id.clone(),
            to_stop_id: to.stop_id.clone(),
            from_trip_id,
            to_trip_id,
            transfer_type: TransferType::Timed,
        };
        if insert_transfer(self.conn, &transfer)? {
            self.summary.transfers += 1;
        }
        Ok(())
    }

    /// Id of the bus route accompanying `route_id`, created on first use.
    ///
    /// A bus route is its own companion.
    fn road_route(&mut self, route_id: &str) -> Result<String, StoreError> {
        let road_id = format!("{route_id}{ROAD_ROUTE_SUFFIX}");
        if self.added_routes.contains(&road_id) {
            return Ok(road_id);
        }

        let parent = route(self.conn, route_id)?;
        if parent
            .as_ref()
            .is_some_and(|p| p.route_type == RouteType::Bus)
        {
            return Ok(route_id.to_string());
        }

        if route(self.conn, &road_id)?.is_none() {
            let (agency_id, short_name) = match parent {
                Some(parent) => (parent.agency_id, parent.short_name),
                None => {
                    warn!(route_id, "trip references an unknown route");
                    (String::new(), String::new())
                }
            };
            insert_route(
                self.conn,
                &Route {
                    id: road_id.clone(),
                    agency_id,
                    short_name,
                    long_name: String::new(),
                    route_type: RouteType::Bus,
                },
            )?;
            info!(route_id = %road_id, "created bus route");
            self.summary.road_routes += 1;
        }

        self.added_routes.insert(road_id.clone());
        Ok(road_id)
    }
}

fn leg_trip_id(trip_id: &str, leg: usize) -> String {
    format!("{trip_id}_{leg}")
}
