//! PolRegio GTFS builder.
//!
//! Scrapes the carrier's ticketing API into a SQLite store, reconciles its
//! stations against the PLRailMap registry, splits trips where the carrier
//! runs replacement buses and exports the result as a GTFS feed.

pub mod api;
pub mod curate;
pub mod domain;
pub mod export;
pub mod pipeline;
pub mod scrape;
pub mod segment;
pub mod stations;
pub mod store;
