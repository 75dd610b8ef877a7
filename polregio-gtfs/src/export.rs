//! GTFS feed export.
//!
//! Writes one CSV file per table into a directory. Stop-times are stored as
//! seconds and exported as `HH:MM:SS`, with hours past 24 for overnight
//! service; calendar dates are exported as `YYYYMMDD`.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::{debug, info};

use crate::domain::{ServiceTime, parse_service_date};
use crate::store::StoreError;

/// Errors that can occur while exporting.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to create {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for ExportError {
    fn from(e: rusqlite::Error) -> Self {
        ExportError::Store(e.into())
    }
}

/// How a column is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Plain,
    /// Seconds since service-day midnight.
    Time,
    /// `YYYY-MM-DD` as stored.
    Date,
}

struct Table {
    file: &'static str,
    columns: &'static [(&'static str, Format)],
    query: &'static str,
}

use Format::{Date, Plain, Time};

const TABLES: [Table; 8] = [
    Table {
        file: "agency.txt",
        columns: &[
            ("agency_id", Plain),
            ("agency_name", Plain),
            ("agency_url", Plain),
            ("agency_timezone", Plain),
            ("agency_lang", Plain),
            ("agency_phone", Plain),
        ],
        query: "SELECT agency_id, name, url, timezone, lang, phone FROM agencies \
                ORDER BY agency_id",
    },
    Table {
        file: "stops.txt",
        columns: &[
            ("stop_id", Plain),
            ("stop_name", Plain),
            ("stop_lat", Plain),
            ("stop_lon", Plain),
        ],
        query: "SELECT stop_id, name, lat, lon FROM stops ORDER BY stop_id",
    },
    Table {
        file: "routes.txt",
        columns: &[
            ("agency_id", Plain),
            ("route_id", Plain),
            ("route_short_name", Plain),
            ("route_long_name", Plain),
            ("route_type", Plain),
            ("route_color", Plain),
            ("route_text_color", Plain),
        ],
        query: "SELECT agency_id, route_id, short_name, long_name, type, NULL, NULL \
                FROM routes ORDER BY route_id",
    },
    Table {
        file: "trips.txt",
        columns: &[
            ("route_id", Plain),
            ("trip_id", Plain),
            ("service_id", Plain),
            ("trip_headsign", Plain),
            ("trip_short_name", Plain),
        ],
        query: "SELECT route_id, trip_id, calendar_id, headsign, short_name FROM trips \
                ORDER BY trip_id",
    },
    Table {
        file: "stop_times.txt",
        columns: &[
            ("trip_id", Plain),
            ("stop_sequence", Plain),
            ("stop_id", Plain),
            ("arrival_time", Time),
            ("departure_time", Time),
            ("platform", Plain),
        ],
        query: "SELECT trip_id, stop_sequence, stop_id, arrival_time, departure_time, platform \
                FROM stop_times ORDER BY trip_id, stop_sequence",
    },
    Table {
        file: "calendar_dates.txt",
        columns: &[
            ("service_id", Plain),
            ("date", Date),
            ("exception_type", Plain),
        ],
        query: "SELECT calendar_id, date, exception_type FROM calendar_exceptions \
                ORDER BY calendar_id, date",
    },
    Table {
        file: "transfers.txt",
        columns: &[
            ("from_stop_id", Plain),
            ("to_stop_id", Plain),
            ("from_trip_id", Plain),
            ("to_trip_id", Plain),
            ("transfer_type", Plain),
        ],
        query: "SELECT from_stop_id, to_stop_id, from_trip_id, to_trip_id, transfer_type \
                FROM transfers ORDER BY from_trip_id, to_trip_id",
    },
    Table {
        file: "feed_info.txt",
        columns: &[
            ("feed_publisher_name", Plain),
            ("feed_publisher_url", Plain),
            ("feed_lang", Plain),
            ("feed_version", Plain),
        ],
        query: "SELECT publisher_name, publisher_url, lang, version FROM feed_info",
    },
];

/// Rows written per file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub files: Vec<(&'static str, usize)>,
}

/// Write the feed tables from `conn` into `dir`, creating it if needed.
pub fn export_gtfs(conn: &Connection, dir: impl AsRef<Path>) -> Result<ExportSummary, ExportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut summary = ExportSummary::default();
    for table in &TABLES {
        let rows = export_table(conn, table, &dir.join(table.file))?;
        debug!(file = table.file, rows, "exported table");
        summary.files.push((table.file, rows));
    }

    info!(dir = %dir.display(), "feed exported");
    Ok(summary)
}

fn export_table(conn: &Connection, table: &Table, path: &Path) -> Result<usize, ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns.iter().map(|(header, _)| *header))?;

    let mut stmt = conn.prepare(table.query)?;
    let mut rows = stmt.query([])?;
    let mut count = 0;

    while let Some(row) = rows.next()? {
        let mut record = Vec::with_capacity(table.columns.len());
        for (idx, (header, format)) in table.columns.iter().enumerate() {
            let value: Value = row.get(idx)?;
            record.push(render(table.file, header, *format, value)?);
        }
        writer.write_record(&record)?;
        count += 1;
    }

    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(count)
}

fn render(
    table: &'static str,
    column: &'static str,
    format: Format,
    value: Value,
) -> Result<String, StoreError> {
    let invalid = |value: String| StoreError::InvalidValue {
        table,
        column,
        value,
    };

    match (format, value) {
        (_, Value::Null) => Ok(String::new()),
        (Plain, Value::Integer(i)) => Ok(i.to_string()),
        (Plain, Value::Real(f)) => Ok(f.to_string()),
        (Plain, Value::Text(s)) => Ok(s),
        (Time, Value::Integer(seconds)) => u32::try_from(seconds)
            .map(|s| ServiceTime::from_seconds(s).to_string())
            .map_err(|_| invalid(seconds.to_string())),
        (Date, Value::Text(s)) => match parse_service_date(&s) {
            Some(date) => Ok(date.format("%Y%m%d").to_string()),
            None => Err(invalid(s)),
        },
        (_, other) => Err(invalid(format!("{other:?}"))),
    }
}
