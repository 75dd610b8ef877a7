//! Clean-up of scraped labels.
//!
//! Runs between reconciliation and segmentation: platform numbers are
//! made Arabic, Title-Casing artifacts in trip names are undone and every
//! trip gets its last stop as headsign.

use std::borrow::Cow;

use regex::Regex;
use rusqlite::{Connection, params};
use tracing::info;

use crate::store::StoreError;

/// Trip-name fixes applied in order, as `(pattern, replacement)`.
const TRIP_NAME_FIXES: [(&str, &str); 4] = [
    ("Ska", "SKA"),
    ("Pkm", "PKM"),
    ("Zka", "ZKA"),
    (r"\bI\b", "i"),
];

/// Errors from the curation pass.
#[derive(Debug, thiserror::Error)]
pub enum CurateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid trip name pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Rows changed by one curation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurateSummary {
    pub platforms: usize,
    pub trip_names: usize,
    pub headsigns: usize,
}

/// Run every curation step.
pub fn curate(conn: &Connection) -> Result<CurateSummary, CurateError> {
    let rules = TripNameRules::new()?;
    let summary = CurateSummary {
        platforms: normalize_platforms(conn)?,
        trip_names: normalize_trip_names(conn, &rules)?,
        headsigns: generate_headsigns(conn)?,
    };
    info!(?summary, "curated schedule");
    Ok(summary)
}

/// Arabic form of a Roman platform label.
pub fn arabic_platform(label: &str) -> Option<&'static str> {
    let arabic = match label {
        "I" => "1",
        "Ia" => "1a",
        "Ib" => "1b",
        "II" => "2",
        "IIa" => "2a",
        "III" => "3",
        "IIIa" => "3a",
        "IV" => "4",
        "IVa" => "4a",
        "V" => "5",
        "VI" => "6",
        "VII" => "7",
        "VIII" => "8",
        "IX" => "9",
        "X" => "10",
        "XI" => "11",
        _ => return None,
    };
    Some(arabic)
}

/// Rewrite Roman platform labels. Returns the number of stop-times changed.
pub fn normalize_platforms(conn: &Connection) -> Result<usize, StoreError> {
    let mut stmt = conn.prepare("SELECT DISTINCT platform FROM stop_times")?;
    let labels = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut changed = 0;
    for label in labels {
        if let Some(arabic) = arabic_platform(&label) {
            changed += conn.execute(
                "UPDATE stop_times SET platform = ?2 WHERE platform = ?1",
                params![label, arabic],
            )?;
        }
    }
    Ok(changed)
}

/// Compiled trip-name fixes.
#[derive(Debug, Clone)]
pub struct TripNameRules {
    rules: Vec<(Regex, &'static str)>,
}

impl TripNameRules {
    pub fn new() -> Result<Self, regex::Error> {
        let rules = TRIP_NAME_FIXES
            .iter()
            .map(|(pattern, replacement)| Ok((Regex::new(pattern)?, *replacement)))
            .collect::<Result<_, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// Apply every fix to `name`.
    pub fn apply<'a>(&self, name: &'a str) -> Cow<'a, str> {
        let mut name = Cow::Borrowed(name);
        for (pattern, replacement) in &self.rules {
            let fixed = match pattern.replace_all(&name, *replacement) {
                Cow::Owned(fixed) => fixed,
                Cow::Borrowed(_) => continue,
            };
            name = Cow::Owned(fixed);
        }
        name
    }
}

/// Apply `rules` to every trip short name. Returns the number of trips changed.
pub fn normalize_trip_names(conn: &Connection, rules: &TripNameRules) -> Result<usize, StoreError> {
    let mut stmt = conn.prepare("SELECT trip_id, short_name FROM trips")?;
    let names = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut changed = 0;
    for (trip_id, name) in names {
        if let Cow::Owned(fixed) = rules.apply(&name) {
            changed += conn.execute(
                "UPDATE trips SET short_name = ?2 WHERE trip_id = ?1",
                params![trip_id, fixed],
            )?;
        }
    }
    Ok(changed)
}

/// Set each trip's headsign to the name of its last stop.
pub fn generate_headsigns(conn: &Connection) -> Result<usize, StoreError> {
    let changed = conn.execute(
        "UPDATE trips SET headsign = COALESCE(( \
             SELECT s.name FROM stop_times st JOIN stops s ON s.stop_id = st.stop_id \
             WHERE st.trip_id = trips.trip_id \
             ORDER BY st.stop_sequence DESC LIMIT 1 \
         ), '')",
        [],
    )?;
    Ok(changed)
}
