//! Typed row helpers.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::domain::{
    Agency, Calendar, FeedInfo, Route, RouteType, ServiceTime, Stop, StopTime, Transfer,
    TransferType, Trip,
};

use super::error::StoreError;

/// `calendar_exceptions.exception_type` of an added service date.
const SERVICE_ADDED: i64 = 1;

/// Delete every schedule row, leaving the tables in place.
pub fn clear_schedule(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "DELETE FROM transfers;
         DELETE FROM stop_times;
         DELETE FROM trips;
         DELETE FROM calendar_exceptions;
         DELETE FROM calendars;
         DELETE FROM stops;
         DELETE FROM routes;
         DELETE FROM agencies;
         DELETE FROM feed_info;",
    )?;
    Ok(())
}

pub fn insert_agency(conn: &Connection, agency: &Agency) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO agencies (agency_id, name, url, timezone, lang, phone) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            agency.id,
            agency.name,
            agency.url,
            agency.timezone,
            agency.lang,
            agency.phone
        ],
    )?;
    Ok(())
}

pub fn insert_feed_info(conn: &Connection, info: &FeedInfo) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO feed_info (publisher_name, publisher_url, lang, version) \
         VALUES (?1, ?2, ?3, ?4)",
        params![info.publisher_name, info.publisher_url, info.lang, info.version],
    )?;
    Ok(())
}

pub fn insert_route(conn: &Connection, route: &Route) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO routes (route_id, agency_id, short_name, long_name, type) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            route.id,
            route.agency_id,
            route.short_name,
            route.long_name,
            route.route_type.code()
        ],
    )?;
    Ok(())
}

pub fn route(conn: &Connection, route_id: &str) -> Result<Option<Route>, StoreError> {
    let row = conn
        .query_row(
            "SELECT route_id, agency_id, short_name, long_name, type FROM routes \
             WHERE route_id = ?1",
            [route_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((id, agency_id, short_name, long_name, code)) = row else {
        return Ok(None);
    };
    let route_type = RouteType::from_code(code).ok_or_else(|| StoreError::InvalidValue {
        table: "routes",
        column: "type",
        value: code.to_string(),
    })?;

    Ok(Some(Route {
        id,
        agency_id,
        short_name,
        long_name,
        route_type,
    }))
}

pub fn insert_stop(conn: &Connection, stop: &Stop) -> Result<(), StoreError> {
    let (lat, lon) = match stop.position {
        Some((lat, lon)) => (Some(lat), Some(lon)),
        None => (None, None),
    };
    conn.execute(
        "INSERT INTO stops (stop_id, name, lat, lon) VALUES (?1, ?2, ?3, ?4)",
        params![stop.id, stop.name, lat, lon],
    )?;
    Ok(())
}

fn stop_from_row(row: &Row<'_>) -> rusqlite::Result<Stop> {
    let lat: Option<f64> = row.get(2)?;
    let lon: Option<f64> = row.get(3)?;
    Ok(Stop {
        id: row.get(0)?,
        name: row.get(1)?,
        position: lat.zip(lon),
    })
}

pub fn stop(conn: &Connection, stop_id: &str) -> Result<Option<Stop>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT stop_id, name, lat, lon FROM stops WHERE stop_id = ?1",
            [stop_id],
            stop_from_row,
        )
        .optional()?)
}

/// Overwrite a stop's name and position.
pub fn update_stop(conn: &Connection, stop: &Stop) -> Result<(), StoreError> {
    let (lat, lon) = match stop.position {
        Some((lat, lon)) => (Some(lat), Some(lon)),
        None => (None, None),
    };
    conn.execute(
        "UPDATE stops SET name = ?2, lat = ?3, lon = ?4 WHERE stop_id = ?1",
        params![stop.id, stop.name, lat, lon],
    )?;
    Ok(())
}

/// Change a stop's id; stop-times and transfers follow.
pub fn rename_stop(conn: &Connection, from: &str, to: &str) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE stops SET stop_id = ?2 WHERE stop_id = ?1",
        params![from, to],
    )?;
    Ok(())
}

/// Re-point everything referencing `from` to `into`, then delete `from`.
pub fn merge_stop(conn: &Connection, from: &str, into: &str) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE stop_times SET stop_id = ?2 WHERE stop_id = ?1",
        params![from, into],
    )?;
    conn.execute(
        "UPDATE OR IGNORE transfers SET from_stop_id = ?2 WHERE from_stop_id = ?1",
        params![from, into],
    )?;
    conn.execute(
        "UPDATE OR IGNORE transfers SET to_stop_id = ?2 WHERE to_stop_id = ?1",
        params![from, into],
    )?;
    conn.execute("DELETE FROM transfers WHERE from_stop_id = ?1 OR to_stop_id = ?1", [from])?;
    conn.execute("DELETE FROM stops WHERE stop_id = ?1", [from])?;
    Ok(())
}

/// Every stop, ordered by id.
pub fn stops(conn: &Connection) -> Result<Vec<Stop>, StoreError> {
    let mut stmt = conn.prepare("SELECT stop_id, name, lat, lon FROM stops ORDER BY stop_id")?;
    let stops = stmt
        .query_map([], stop_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(stops)
}

/// Insert a calendar and its dates as added-service exceptions.
pub fn insert_calendar(conn: &Connection, calendar: &Calendar) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO calendars (calendar_id) VALUES (?1)",
        [&calendar.id],
    )?;
    add_service_dates(conn, &calendar.id, &calendar.dates)?;
    Ok(())
}

/// Add service dates to an existing calendar. Dates it already has are
/// ignored. Returns how many were new.
pub fn add_service_dates(
    conn: &Connection,
    calendar_id: &str,
    dates: &[NaiveDate],
) -> Result<usize, StoreError> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO calendar_exceptions (calendar_id, date, exception_type) \
         VALUES (?1, ?2, ?3)",
    )?;
    let mut added = 0;
    for date in dates {
        added += stmt.execute(params![
            calendar_id,
            date.format("%Y-%m-%d").to_string(),
            SERVICE_ADDED
        ])?;
    }
    Ok(added)
}

pub fn insert_trip(conn: &Connection, trip: &Trip) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO trips (trip_id, route_id, calendar_id, headsign, short_name) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            trip.id,
            trip.route_id,
            trip.calendar_id,
            trip.headsign,
            trip.short_name
        ],
    )?;
    Ok(())
}

pub fn trip(conn: &Connection, trip_id: &str) -> Result<Option<Trip>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT trip_id, route_id, calendar_id, headsign, short_name FROM trips \
             WHERE trip_id = ?1",
            [trip_id],
            |row| {
                Ok(Trip {
                    id: row.get(0)?,
                    route_id: row.get(1)?,
                    calendar_id: row.get(2)?,
                    headsign: row.get(3)?,
                    short_name: row.get(4)?,
                })
            },
        )
        .optional()?)
}

/// Move a trip onto another route.
pub fn set_trip_route(conn: &Connection, trip_id: &str, route_id: &str) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE trips SET route_id = ?2 WHERE trip_id = ?1",
        params![trip_id, route_id],
    )?;
    Ok(())
}

/// Every trip id, ordered.
pub fn trip_ids(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT trip_id FROM trips ORDER BY trip_id")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Delete a trip together with its stop-times and transfers.
pub fn delete_trip(conn: &Connection, trip_id: &str) -> Result<(), StoreError> {
    conn.execute("DELETE FROM trips WHERE trip_id = ?1", [trip_id])?;
    Ok(())
}

pub fn insert_stop_time(conn: &Connection, stop_time: &StopTime) -> Result<(), StoreError> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO stop_times \
         (trip_id, stop_sequence, stop_id, arrival_time, departure_time, platform) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    stmt.execute(params![
        stop_time.trip_id,
        stop_time.stop_sequence,
        stop_time.stop_id,
        stop_time.arrival.total_seconds(),
        stop_time.departure.total_seconds(),
        stop_time.platform
    ])?;
    Ok(())
}

/// Stop-times of one trip in sequence order.
pub fn stop_times_of(conn: &Connection, trip_id: &str) -> Result<Vec<StopTime>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT trip_id, stop_sequence, stop_id, arrival_time, departure_time, platform \
         FROM stop_times WHERE trip_id = ?1 ORDER BY stop_sequence",
    )?;
    let stop_times = stmt
        .query_map([trip_id], |row| {
            Ok(StopTime {
                trip_id: row.get(0)?,
                stop_sequence: row.get(1)?,
                stop_id: row.get(2)?,
                arrival: ServiceTime::from_seconds(row.get(3)?),
                departure: ServiceTime::from_seconds(row.get(4)?),
                platform: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(stop_times)
}

/// Insert a transfer unless an identical one exists. Returns whether a row was added.
pub fn insert_transfer(conn: &Connection, transfer: &Transfer) -> Result<bool, StoreError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO transfers \
         (from_stop_id, to_stop_id, from_trip_id, to_trip_id, transfer_type) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            transfer.from_stop_id,
            transfer.to_stop_id,
            transfer.from_trip_id,
            transfer.to_trip_id,
            transfer.transfer_type.code()
        ],
    )?;
    Ok(inserted > 0)
}

/// Every transfer, ordered by the trips it links.
pub fn transfers(conn: &Connection) -> Result<Vec<Transfer>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT from_stop_id, to_stop_id, from_trip_id, to_trip_id, transfer_type \
         FROM transfers ORDER BY from_trip_id, to_trip_id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(from_stop_id, to_stop_id, from_trip_id, to_trip_id, code)| {
            let transfer_type =
                TransferType::from_code(code).ok_or_else(|| StoreError::InvalidValue {
                    table: "transfers",
                    column: "transfer_type",
                    value: code.to_string(),
                })?;
            Ok(Transfer {
                from_stop_id,
                to_stop_id,
                from_trip_id,
                to_trip_id,
                transfer_type,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn seed(conn: &Connection) {
        insert_route(
            conn,
            &Route {
                id: "21".into(),
                agency_id: "0".into(),
                short_name: "REGIO".into(),
                long_name: String::new(),
                route_type: RouteType::Rail,
            },
        )
        .unwrap();
        insert_calendar(
            conn,
            &Calendar {
                id: "7".into(),
                dates: vec![
                    NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(),
                    NaiveDate::from_ymd_opt(2024, 12, 16).unwrap(),
                ],
            },
        )
        .unwrap();
        insert_trip(
            conn,
            &Trip {
                id: "7".into(),
                route_id: "21".into(),
                calendar_id: "7".into(),
                headsign: String::new(),
                short_name: "4512".into(),
            },
        )
        .unwrap();
        for (id, name) in [("100", "Kraków Główny"), ("200", "Tarnów")] {
            insert_stop(conn, &Stop::stub(id, name)).unwrap();
        }
        for (seq, stop_id) in [(0u32, "100"), (1, "200")] {
            insert_stop_time(
                conn,
                &StopTime {
                    trip_id: "7".into(),
                    stop_sequence: seq,
                    stop_id: stop_id.into(),
                    arrival: ServiceTime::from_seconds(seq * 3600),
                    departure: ServiceTime::from_seconds(seq * 3600 + 60),
                    platform: String::new(),
                },
            )
            .unwrap();
        }
    }

    #[test]
    fn round_trip_records() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection();
        seed(conn);

        let route = route(conn, "21").unwrap().unwrap();
        assert_eq!(route.route_type, RouteType::Rail);

        let trip = trip(conn, "7").unwrap().unwrap();
        assert_eq!(trip.short_name, "4512");
        assert_eq!(trip_ids(conn).unwrap(), vec!["7"]);

        let stop_times = stop_times_of(conn, "7").unwrap();
        assert_eq!(stop_times.len(), 2);
        assert_eq!(stop_times[1].stop_id, "200");
        assert_eq!(stop_times[1].departure.total_seconds(), 3660);

        let stops = stops(conn).unwrap();
        assert_eq!(stops.len(), 2);
        assert!(stops.iter().all(|s| !s.is_curated()));

        let dates: i64 = conn
            .query_row("SELECT COUNT(*) FROM calendar_exceptions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(dates, 2);
    }

    #[test]
    fn delete_trip_cascades_to_stop_times() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection();
        seed(conn);

        delete_trip(conn, "7").unwrap();
        assert!(trip(conn, "7").unwrap().is_none());
        assert!(stop_times_of(conn, "7").unwrap().is_empty());
    }

    #[test]
    fn stop_rename_cascades_to_stop_times() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection();
        seed(conn);

        conn.execute("UPDATE stops SET stop_id = '300' WHERE stop_id = '200'", [])
            .unwrap();
        let stop_times = stop_times_of(conn, "7").unwrap();
        assert_eq!(stop_times[1].stop_id, "300");
    }

    #[test]
    fn referenced_stop_cannot_be_deleted() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection();
        seed(conn);

        assert!(conn.execute("DELETE FROM stops WHERE stop_id = '100'", []).is_err());
    }

    #[test]
    fn duplicate_transfer_ignored() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection();
        seed(conn);

        let transfer = Transfer {
            from_stop_id: "200".into(),
            to_stop_id: "200".into(),
            from_trip_id: "7".into(),
            to_trip_id: "7".into(),
            transfer_type: TransferType::Timed,
        };
        assert!(insert_transfer(conn, &transfer).unwrap());
        assert!(!insert_transfer(conn, &transfer).unwrap());
        assert_eq!(transfers(conn).unwrap(), vec![transfer]);
    }

    #[test]
    fn clear_schedule_empties_every_table() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection();
        seed(conn);
        insert_agency(conn, &Agency::default()).unwrap();
        insert_feed_info(conn, &FeedInfo::default()).unwrap();

        clear_schedule(conn).unwrap();
        assert!(trip_ids(conn).unwrap().is_empty());
        assert!(stops(conn).unwrap().is_empty());
        assert!(route(conn, "21").unwrap().is_none());
        let feeds: i64 = conn
            .query_row("SELECT COUNT(*) FROM feed_info", [], |r| r.get(0))
            .unwrap();
        assert_eq!(feeds, 0);

        // The same rows can be written again
        seed(conn);
        insert_agency(conn, &Agency::default()).unwrap();
    }

    #[test]
    fn service_dates_merge_into_existing_calendar() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection();
        seed(conn);

        let added = add_service_dates(
            conn,
            "7",
            &[
                NaiveDate::from_ymd_opt(2024, 12, 16).unwrap(),
                NaiveDate::from_ymd_opt(2024, 12, 17).unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(added, 1);

        let dates: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM calendar_exceptions WHERE calendar_id = '7'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(dates, 3);
    }

    #[test]
    fn rolled_back_transaction_leaves_nothing() {
        let mut store = Store::open_in_memory().unwrap();
        {
            let tx = store.transaction().unwrap();
            seed(&tx);
            // dropped without commit
        }
        assert!(trip_ids(store.connection()).unwrap().is_empty());

        let tx = store.transaction().unwrap();
        seed(&tx);
        tx.commit().unwrap();
        assert_eq!(trip_ids(store.connection()).unwrap().len(), 1);
    }

    #[test]
    fn open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.db");
        {
            let store = Store::open(&path).unwrap();
            seed(store.connection());
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(stops(store.connection()).unwrap().len(), 2);
    }
}
