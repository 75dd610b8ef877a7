//! PolRegio ticketing API response DTOs.
//!
//! These types map directly to the JSON served under
//! `https://bilety.polregio.pl/pl/`. Fields the normalizer never reads are
//! kept optional so schema drift in them doesn't break a scrape.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::{AttributeRange, ServiceTime, TimeError};

/// Response of `brands`.
#[derive(Debug, Clone, Deserialize)]
pub struct BrandsResponse {
    pub brands: Vec<Brand>,
}

/// A commercial brand of the carrier.
#[derive(Debug, Clone, Deserialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub carrier_id: Option<i64>,
}

/// Response of `carriers`.
#[derive(Debug, Clone, Deserialize)]
pub struct CarriersResponse {
    pub carriers: Vec<Carrier>,
}

/// A railway carrier known to the ticketing system.
#[derive(Debug, Clone, Deserialize)]
pub struct Carrier {
    pub id: i64,
    pub name: String,
    pub short_name: Option<String>,
    pub slug: String,
    pub update_date: Option<String>,
    pub update_time: Option<String>,
}

/// Response of `carrier_trains_lists?carrier=<slug>`.
#[derive(Debug, Clone, Deserialize)]
pub struct CarrierTrainsListsResponse {
    pub carrier_trains_lists: Vec<CarrierTrainsList>,
}

/// One brand of a carrier together with every train it runs.
#[derive(Debug, Clone, Deserialize)]
pub struct CarrierTrainsList {
    /// Brand id, used as the route id.
    pub id: i64,
    /// Brand name.
    pub name: String,
    pub trains: Vec<CarrierTrain>,
    pub signature: Option<String>,
}

/// A train number run under a brand. Used to request calendars.
#[derive(Debug, Clone, Deserialize)]
pub struct CarrierTrain {
    pub nr: i64,
    pub param_nr: Option<String>,
    pub name: Option<String>,
    pub brand: String,
}

impl CarrierTrain {
    /// Display name of trips run as this train.
    ///
    /// `"<number> <Title-Cased name>"`, or just the number for unnamed trains.
    pub fn trip_short_name(&self) -> String {
        match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => format!("{} {}", self.nr, title_case(name)),
            None => self.nr.to_string(),
        }
    }
}

/// Upper-case the first letter of every word and lower-case the rest.
///
/// A word starts after any non-alphabetic character.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Response of `train_calendars?brand=..&nr=..[&name=..]`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainCalendarsResponse {
    pub train_calendars: Vec<TrainCalendar>,
}

/// Running dates of one train number variant.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainCalendar {
    pub id: i64,
    pub train_nr: i64,
    pub train_name: Option<String>,
    #[serde(rename = "trainBrand")]
    pub train_brand: Option<String>,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub train_ids: Vec<i64>,
    /// Service date (`YYYY-MM-DD`) → instance id that ran on it.
    pub date_train_map: BTreeMap<String, i64>,
}

/// Response of `trains/<id>`.
#[derive(Debug, Clone, Deserialize)]
pub struct Train {
    pub train: TrainDetails,
    pub stops: Vec<TrainStop>,
}

/// Header of a train instance.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainDetails {
    pub id: i64,
    pub train_nr: i64,
    pub name: Option<String>,
    pub train_full_name: Option<String>,
    pub run_desc: Option<String>,
    pub carrier_id: Option<i64>,
    pub brand_id: Option<i64>,
    #[serde(default)]
    pub train_attributes: Vec<TrainAttribute>,
}

/// A free-text attribute spanning a range of the train's stations.
///
/// Served as a positional array:
/// `[id, description, begin_station_name, end_station_name, flag, text]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawTrainAttribute")]
pub struct TrainAttribute {
    pub id: i64,
    pub description: String,
    pub begin_station_name: String,
    pub end_station_name: String,
    pub flag: bool,
    pub text: Option<String>,
}

type RawTrainAttribute = (i64, String, String, String, bool, Option<String>);

impl From<RawTrainAttribute> for TrainAttribute {
    fn from(raw: RawTrainAttribute) -> Self {
        let (id, description, begin_station_name, end_station_name, flag, text) = raw;
        Self {
            id,
            description,
            begin_station_name,
            end_station_name,
            flag,
            text,
        }
    }
}

impl TrainAttribute {
    pub fn as_range(&self) -> AttributeRange<'_> {
        AttributeRange {
            id: self.id,
            begin_station: &self.begin_station_name,
            end_station: &self.end_station_name,
        }
    }
}

/// One call of a train instance.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainStop {
    pub id: Option<i64>,
    pub station_id: i64,
    pub station_name: String,
    pub station_slug: Option<String>,
    pub station_ibnr: Option<i64>,
    pub train_id: Option<i64>,
    pub distance: Option<i64>,
    pub arrival: ApiTime,
    pub departure: ApiTime,
    pub position: Option<i64>,
    pub brand_id: Option<i64>,
    #[serde(default)]
    pub platform: Option<String>,
    pub track: Option<i64>,
    #[serde(default)]
    pub entry_only: bool,
    #[serde(default)]
    pub exit_only: bool,
}

/// Clock time as served by the API, with no date or day component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ApiTime {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl ApiTime {
    pub fn to_service_time(self) -> Result<ServiceTime, TimeError> {
        ServiceTime::from_hms(self.hour, self.minute, self.second)
    }
}
