//! Schedule records as held by the record store.

use chrono::{Local, NaiveDate};

use super::{ServiceTime, TravelMode};

/// Platform label marking a stop-time served by road transport.
pub const BUS_PLATFORM: &str = "BUS";

/// The operating agency. The feed has exactly one.
#[derive(Debug, Clone, PartialEq)]
pub struct Agency {
    pub id: String,
    pub name: String,
    pub url: String,
    pub timezone: String,
    pub lang: String,
    pub phone: String,
}

impl Default for Agency {
    fn default() -> Self {
        Self {
            id: "0".to_string(),
            name: "PolRegio".to_string(),
            url: "https://polregio.pl/".to_string(),
            timezone: "Europe/Warsaw".to_string(),
            lang: "pl".to_string(),
            phone: "+48703202020".to_string(),
        }
    }
}

/// Publisher details of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedInfo {
    pub publisher_name: String,
    pub publisher_url: String,
    pub lang: String,
    /// Build timestamp, `YYYY-MM-DD HH:MM:SS` in local time by default.
    pub version: String,
}

impl FeedInfo {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

impl Default for FeedInfo {
    fn default() -> Self {
        Self {
            publisher_name: "Mikołaj Kuranowski".to_string(),
            publisher_url: "https://mkuran.pl/gtfs/".to_string(),
            lang: "pl".to_string(),
            version: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// GTFS route type of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteType {
    Rail,
    Bus,
}

impl RouteType {
    pub fn code(self) -> i64 {
        match self {
            RouteType::Rail => 2,
            RouteType::Bus => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            2 => Some(RouteType::Rail),
            3 => Some(RouteType::Bus),
            _ => None,
        }
    }
}

impl From<TravelMode> for RouteType {
    fn from(mode: TravelMode) -> Self {
        match mode {
            TravelMode::Rail => RouteType::Rail,
            TravelMode::Road => RouteType::Bus,
        }
    }
}

/// A route, one per carrier brand plus a companion road route where needed.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: String,
    pub agency_id: String,
    pub short_name: String,
    pub long_name: String,
    pub route_type: RouteType,
}

/// A station.
///
/// Stations are first inserted as stubs (id and name, no position) while
/// scraping and only receive coordinates during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub position: Option<(f64, f64)>,
}

impl Stop {
    /// Create an uncurated stub.
    pub fn stub(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position: None,
        }
    }

    pub fn is_curated(&self) -> bool {
        self.position.is_some()
    }
}

/// One dated realization of a carrier train.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub id: String,
    pub route_id: String,
    pub calendar_id: String,
    pub headsign: String,
    pub short_name: String,
}

/// Service dates of one calendar, all recorded as added service.
#[derive(Debug, Clone, PartialEq)]
pub struct Calendar {
    pub id: String,
    pub dates: Vec<NaiveDate>,
}

/// A trip's call at one station.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_sequence: u32,
    pub stop_id: String,
    pub arrival: ServiceTime,
    pub departure: ServiceTime,
    pub platform: String,
}

impl StopTime {
    /// Mode of travel away from this stop.
    pub fn mode(&self) -> TravelMode {
        if self.platform == BUS_PLATFORM {
            TravelMode::Road
        } else {
            TravelMode::Rail
        }
    }

    /// Set the platform label to agree with `mode`.
    ///
    /// A road stop carries the `BUS` sentinel; a rail stop drops it but
    /// keeps any real platform label.
    pub fn set_mode(&mut self, mode: TravelMode) {
        match mode {
            TravelMode::Road => self.platform = BUS_PLATFORM.to_string(),
            TravelMode::Rail => {
                if self.platform == BUS_PLATFORM {
                    self.platform.clear();
                }
            }
        }
    }
}

/// GTFS transfer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Recommended,
    Timed,
    MinimumTime,
    NotPossible,
}

impl TransferType {
    pub fn code(self) -> i64 {
        match self {
            TransferType::Recommended => 0,
            TransferType::Timed => 1,
            TransferType::MinimumTime => 2,
            TransferType::NotPossible => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TransferType::Recommended),
            1 => Some(TransferType::Timed),
            2 => Some(TransferType::MinimumTime),
            3 => Some(TransferType::NotPossible),
            _ => None,
        }
    }
}

/// A trip-to-trip transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub from_trip_id: String,
    pub to_trip_id: String,
    pub transfer_type: TransferType,
}
