//! SQLite-backed record store.
//!
//! Holds the schedule between phases. Every phase runs inside one
//! transaction from [`Store::transaction`]; the row helpers in this module
//! take a plain `&Connection`, which a `Transaction` derefs to.

mod error;
mod records;

use std::path::Path;

use rusqlite::{Connection, Transaction};

pub use error::StoreError;
pub use records::{
    add_service_dates, clear_schedule, delete_trip, insert_agency, insert_calendar,
    insert_feed_info, insert_route, insert_stop, insert_stop_time, insert_transfer, insert_trip,
    merge_stop, rename_stop, route, set_trip_route, stop, stop_times_of, stops, transfers, trip,
    trip_ids, update_stop,
};

/// Table definitions.
///
/// Stop-times follow their trip on delete and their stop on an id change.
/// Stubs keep `lat`/`lon` NULL until curated.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS agencies (
    agency_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    timezone TEXT NOT NULL,
    lang TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS feed_info (
    publisher_name TEXT NOT NULL,
    publisher_url TEXT NOT NULL,
    lang TEXT NOT NULL,
    version TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS routes (
    route_id TEXT PRIMARY KEY,
    agency_id TEXT NOT NULL,
    short_name TEXT NOT NULL DEFAULT '',
    long_name TEXT NOT NULL DEFAULT '',
    type INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS stops (
    stop_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    lat REAL,
    lon REAL
);
CREATE TABLE IF NOT EXISTS calendars (
    calendar_id TEXT PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS calendar_exceptions (
    calendar_id TEXT NOT NULL REFERENCES calendars(calendar_id)
        ON DELETE CASCADE ON UPDATE CASCADE,
    date TEXT NOT NULL,
    exception_type INTEGER NOT NULL,
    PRIMARY KEY (calendar_id, date)
);
CREATE TABLE IF NOT EXISTS trips (
    trip_id TEXT PRIMARY KEY,
    route_id TEXT NOT NULL REFERENCES routes(route_id)
        ON DELETE CASCADE ON UPDATE CASCADE,
    calendar_id TEXT NOT NULL REFERENCES calendars(calendar_id)
        ON DELETE CASCADE ON UPDATE CASCADE,
    headsign TEXT NOT NULL DEFAULT '',
    short_name TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS stop_times (
    trip_id TEXT NOT NULL REFERENCES trips(trip_id)
        ON DELETE CASCADE ON UPDATE CASCADE,
    stop_sequence INTEGER NOT NULL,
    stop_id TEXT NOT NULL REFERENCES stops(stop_id) ON UPDATE CASCADE,
    arrival_time INTEGER NOT NULL,
    departure_time INTEGER NOT NULL,
    platform TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (trip_id, stop_sequence)
);
CREATE INDEX IF NOT EXISTS idx_stop_times_stop_id ON stop_times (stop_id);
CREATE TABLE IF NOT EXISTS transfers (
    from_stop_id TEXT NOT NULL REFERENCES stops(stop_id) ON UPDATE CASCADE,
    to_stop_id TEXT NOT NULL REFERENCES stops(stop_id) ON UPDATE CASCADE,
    from_trip_id TEXT NOT NULL REFERENCES trips(trip_id)
        ON DELETE CASCADE ON UPDATE CASCADE,
    to_trip_id TEXT NOT NULL REFERENCES trips(trip_id)
        ON DELETE CASCADE ON UPDATE CASCADE,
    transfer_type INTEGER NOT NULL,
    UNIQUE (from_stop_id, to_stop_id, from_trip_id, to_trip_id)
);
";

/// The record store.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Read-only access outside a transaction.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin an atomic scope. Dropping it without `commit` rolls back.
    pub fn transaction(&mut self) -> Result<Transaction<'_>, StoreError> {
        Ok(self.conn.transaction()?)
    }
}
