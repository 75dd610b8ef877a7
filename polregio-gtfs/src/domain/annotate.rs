//! Road-transport annotation of a trip's stops.
//!
//! The carrier marks replacement bus stretches with free-text train
//! attributes naming a begin and an end station. Station names are not
//! unique within a trip (loops, reversals), so names are resolved through
//! an ordered index built once per trip.
//!
//! A marked position means "the trip leaves this stop by road". The stop
//! where the bus stretch ends is therefore left unmarked, except when it is
//! the final stop: nothing departs from there, so it takes the mode of the
//! stretch arriving at it.

use std::collections::{BTreeSet, HashMap};

use regex::Regex;
use tracing::warn;

/// Attribute ids denoting replacement road transport by default.
pub const DEFAULT_ROAD_ATTRIBUTE_IDS: [i64; 2] = [9, 10];

/// Word in a trip name marking a trip that runs entirely by road.
pub const DEFAULT_ROAD_MARKER: &str = "ZKA";

/// Configuration for road-transport annotation.
#[derive(Debug, Clone)]
pub struct AnnotatorConfig {
    /// Matches the road marker as a whole word, ignoring case.
    /// `None` when the marker is empty.
    road_marker: Option<Regex>,
    /// Attribute ids that denote a road-transport stretch.
    pub road_attribute_ids: BTreeSet<i64>,
}

/// Compile `marker` into a case-insensitive whole-word pattern.
fn marker_pattern(marker: &str) -> Option<Regex> {
    if marker.is_empty() {
        return None;
    }
    // An escaped literal always compiles
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(marker))).ok()
}

impl AnnotatorConfig {
    /// Replace the road marker. An empty marker disables whole-trip marking.
    pub fn with_road_marker(mut self, marker: impl AsRef<str>) -> Self {
        self.road_marker = marker_pattern(marker.as_ref());
        self
    }

    pub fn with_road_attribute_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.road_attribute_ids = ids.into_iter().collect();
        self
    }

    /// Whether a trip name marks the whole trip as road transport.
    ///
    /// The marker must stand as a word of its own, so station names that
    /// merely contain it ("Wieliczka") do not count.
    pub fn is_road_replacement(&self, trip_name: &str) -> bool {
        self.road_marker
            .as_ref()
            .is_some_and(|marker| marker.is_match(trip_name))
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            road_marker: marker_pattern(DEFAULT_ROAD_MARKER),
            road_attribute_ids: DEFAULT_ROAD_ATTRIBUTE_IDS.into_iter().collect(),
        }
    }
}

/// A train attribute spanning a range of stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRange<'a> {
    pub id: i64,
    pub begin_station: &'a str,
    pub end_station: &'a str,
}

/// Station name → every position it occupies, in stop order.
#[derive(Debug, Default)]
pub struct NamePositions<'a> {
    index: HashMap<&'a str, Vec<usize>>,
}

impl<'a> NamePositions<'a> {
    pub fn new<I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut index: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (position, name) in names.into_iter().enumerate() {
            index.entry(name).or_default().push(position);
        }
        Self { index }
    }

    /// All positions of `name`, in stop order.
    pub fn positions(&self, name: &str) -> &[usize] {
        self.index.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<usize> {
        self.positions(name).first().copied()
    }

    pub fn last(&self, name: &str) -> Option<usize> {
        self.positions(name).last().copied()
    }
}

/// Which end of an attribute is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Begin,
    End,
}

/// Compute the stop positions a trip leaves by road.
///
/// `stop_names` lists the trip's station names in stop order. Returns the
/// 0-based positions marked as road transport; all others are rail.
pub fn road_positions(
    config: &AnnotatorConfig,
    train_id: i64,
    trip_name: &str,
    stop_names: &[&str],
    attributes: &[AttributeRange<'_>],
) -> BTreeSet<usize> {
    if stop_names.is_empty() {
        return BTreeSet::new();
    }

    if config.is_road_replacement(trip_name) {
        return (0..stop_names.len()).collect();
    }

    let index = NamePositions::new(stop_names.iter().copied());
    let last_position = stop_names.len() - 1;
    let mut marked = BTreeSet::new();

    for attribute in attributes
        .iter()
        .filter(|a| config.road_attribute_ids.contains(&a.id))
    {
        let Some(begin) = resolve(&index, train_id, attribute, Boundary::Begin) else {
            continue;
        };
        let Some(end) = resolve(&index, train_id, attribute, Boundary::End) else {
            continue;
        };

        if end < begin {
            warn!(
                train_id,
                attribute = attribute.id,
                begin_station = attribute.begin_station,
                end_station = attribute.end_station,
                "road attribute ends before it begins, skipping"
            );
            continue;
        }

        let end_exclusive = if end == last_position { end + 1 } else { end };
        if end_exclusive == begin {
            warn!(
                train_id,
                attribute = attribute.id,
                station = attribute.begin_station,
                "road attribute begins and ends at the same stop, nothing to mark"
            );
            continue;
        }

        marked.extend(begin..end_exclusive);
    }

    marked
}

/// Resolve one boundary of an attribute to a stop position.
///
/// The begin boundary takes the first occurrence of its name and the end
/// boundary the last, so an ambiguous range covers as much as it can.
fn resolve(
    index: &NamePositions<'_>,
    train_id: i64,
    attribute: &AttributeRange<'_>,
    boundary: Boundary,
) -> Option<usize> {
    let name = match boundary {
        Boundary::Begin => attribute.begin_station,
        Boundary::End => attribute.end_station,
    };
    let positions = index.positions(name);

    if positions.is_empty() {
        warn!(
            train_id,
            attribute = attribute.id,
            station = name,
            ?boundary,
            "road attribute names a station the train does not call at, skipping"
        );
        return None;
    }

    if positions.len() > 1 {
        warn!(
            train_id,
            attribute = attribute.id,
            station = name,
            ?boundary,
            candidates = positions.len(),
            "ambiguous station name in road attribute"
        );
    }

    match boundary {
        Boundary::Begin => positions.first().copied(),
        Boundary::End => positions.last().copied(),
    }
}
