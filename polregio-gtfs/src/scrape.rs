//! Scrape of a carrier's timetable into the record store.
//!
//! For every brand of the carrier a rail route is created; for every train
//! number the calendars are expanded into per-instance trips, and every
//! instance's stops are fetched, normalized across midnight and annotated
//! with road-transport positions before their stop-times are written.
//!
//! The caller owns the transaction: pass a `Transaction` and commit it once
//! [`scrape_carrier`] returns.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::api::{ApiError, CarrierTrain, TimetableSource, Train, TrainAttribute, TrainStop};
use crate::domain::{
    AnnotatorConfig, AttributeRange, BUS_PLATFORM, Calendar, CalendarError, Route, RouteType,
    Stop, StopTime, StopTimes, TimeError, Trip, expand_date_train_map, normalize_stop_times,
    road_positions,
};
use crate::store::{
    StoreError, add_service_dates, insert_calendar, insert_route, insert_stop, insert_stop_time, insert_trip,
};

/// How often per brand to log scrape progress.
const PROGRESS_EVERY: usize = 500;

/// Errors aborting a scrape.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Counts of records written by one scrape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub routes: usize,
    pub trips: usize,
    pub stop_times: usize,
    pub stations: usize,
    /// Instances an earlier calendar already produced. Only their dates
    /// are kept.
    pub duplicate_trips: usize,
}

/// Scrape every brand of `carrier_slug` into `conn`.
pub async fn scrape_carrier<S: TimetableSource>(
    source: &S,
    conn: &Connection,
    carrier_slug: &str,
    agency_id: &str,
    annotator: &AnnotatorConfig,
) -> Result<ScrapeSummary, ScrapeError> {
    let mut scraper = Scraper {
        source,
        conn,
        agency_id,
        annotator,
        added_routes: HashSet::new(),
        added_stations: HashSet::new(),
        scraped_trips: HashSet::new(),
        summary: ScrapeSummary::default(),
    };

    for brand in source.carrier_trains_lists(carrier_slug).await? {
        info!(brand_id = brand.id, name = %brand.name, trains = brand.trains.len(), "scraping brand");
        scraper.add_route(brand.id, &brand.name)?;

        let total = brand.trains.len();
        for (i, carrier_train) in brand.trains.iter().enumerate() {
            scraper.scrape_carrier_train(carrier_train, brand.id).await?;
            if (i + 1) % PROGRESS_EVERY == 0 {
                info!(brand = %brand.name, done = i + 1, total, "scrape progress");
            }
        }
    }

    let summary = scraper.summary;
    info!(?summary, "scrape finished");
    Ok(summary)
}

/// State of one scrape pass.
struct Scraper<'a, S> {
    source: &'a S,
    conn: &'a Connection,
    agency_id: &'a str,
    annotator: &'a AnnotatorConfig,
    added_routes: HashSet<i64>,
    added_stations: HashSet<i64>,
    scraped_trips: HashSet<i64>,
    summary: ScrapeSummary,
}

impl<S: TimetableSource> Scraper<'_, S> {
    fn add_route(&mut self, brand_id: i64, name: &str) -> Result<(), StoreError> {
        if !self.added_routes.insert(brand_id) {
            warn!(brand_id, name, "brand listed twice, keeping the first route");
            return Ok(());
        }

        insert_route(
            self.conn,
            &Route {
                id: brand_id.to_string(),
                agency_id: self.agency_id.to_string(),
                short_name: name.to_string(),
                long_name: String::new(),
                route_type: RouteType::Rail,
            },
        )?;
        self.summary.routes += 1;
        Ok(())
    }

    async fn scrape_carrier_train(
        &mut self,
        carrier_train: &CarrierTrain,
        route_id: i64,
    ) -> Result<(), ScrapeError> {
        let short_name = carrier_train.trip_short_name();

        for calendar in self.source.train_calendars(carrier_train).await? {
            for (instance, dates) in expand_date_train_map(&calendar.date_train_map)? {
                if !self.scraped_trips.insert(instance) {
                    let added = add_service_dates(self.conn, &instance.to_string(), &dates)?;
                    warn!(
                        train_id = instance,
                        nr = carrier_train.nr,
                        added,
                        "train instance already scraped, merging its dates"
                    );
                    self.summary.duplicate_trips += 1;
                    continue;
                }

                let id = instance.to_string();
                insert_calendar(
                    self.conn,
                    &Calendar {
                        id: id.clone(),
                        dates,
                    },
                )?;
                insert_trip(
                    self.conn,
                    &Trip {
                        id: id.clone(),
                        route_id: route_id.to_string(),
                        calendar_id: id,
                        headsign: String::new(),
                        short_name: short_name.clone(),
                    },
                )?;
                self.summary.trips += 1;

                self.scrape_train(instance, &short_name).await?;
            }
        }

        Ok(())
    }

    async fn scrape_train(&mut self, train_id: i64, short_name: &str) -> Result<(), ScrapeError> {
        let train = self.source.train(train_id).await?;
        let times = normalized_times(&train)?;
        let road = road_stops(self.annotator, &train, short_name);
        debug!(train_id, stops = train.stops.len(), road = road.len(), "scraped train");

        let trip_id = train_id.to_string();
        for (sequence, (stop, times)) in train.stops.iter().zip(&times).enumerate() {
            self.ensure_station(stop)?;

            let platform = if road.contains(&sequence) {
                BUS_PLATFORM.to_string()
            } else {
                stop.platform.clone().unwrap_or_default()
            };

            insert_stop_time(
                self.conn,
                &StopTime {
                    trip_id: trip_id.clone(),
                    stop_sequence: sequence as u32,
                    stop_id: stop.station_id.to_string(),
                    arrival: times.arrival,
                    departure: times.departure,
                    platform,
                },
            )?;
            self.summary.stop_times += 1;
        }

        Ok(())
    }

    /// Insert an uncurated stub the first time a station is seen.
    fn ensure_station(&mut self, stop: &TrainStop) -> Result<(), StoreError> {
        if self.added_stations.insert(stop.station_id) {
            insert_stop(
                self.conn,
                &Stop::stub(stop.station_id.to_string(), stop.station_name.clone()),
            )?;
            self.summary.stations += 1;
        }
        Ok(())
    }
}

/// Stop times of a train with day rollovers applied.
fn normalized_times(train: &Train) -> Result<Vec<StopTimes>, ApiError> {
    let raw = train
        .stops
        .iter()
        .map(|stop| {
            Ok(StopTimes::new(
                stop.arrival.to_service_time()?,
                stop.departure.to_service_time()?,
            ))
        })
        .collect::<Result<Vec<_>, TimeError>>()
        .map_err(|source| ApiError::InvalidTime {
            train_id: train.train.id,
            source,
        })?;
    Ok(normalize_stop_times(&raw))
}

fn road_stops(annotator: &AnnotatorConfig, train: &Train, short_name: &str) -> HashSet<usize> {
    let names: Vec<&str> = train
        .stops
        .iter()
        .map(|stop| stop.station_name.as_str())
        .collect();
    let attributes: Vec<AttributeRange<'_>> = train
        .train
        .train_attributes
        .iter()
        .map(TrainAttribute::as_range)
        .collect();

    road_positions(annotator, train.train.id, short_name, &names, &attributes)
        .into_iter()
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Canned API data shared by the scrape and pipeline tests.

    use serde_json::json;

    use crate::api::{Carrier, CarrierTrain, CarrierTrainsList, MockEndpoint, Train, TrainCalendar};

    pub const CARRIER: &str = "polregio-przewozy-regionalne";

    pub fn carrier() -> Carrier {
        serde_json::from_value(json!({
            "id": 1,
            "name": "POLREGIO",
            "slug": CARRIER,
        }))
        .unwrap()
    }

    pub fn carrier_train(nr: i64, name: Option<&str>) -> CarrierTrain {
        CarrierTrain {
            nr,
            param_nr: None,
            name: name.map(str::to_string),
            brand: "R".into(),
        }
    }

    pub fn brand(id: i64, name: &str, trains: Vec<CarrierTrain>) -> CarrierTrainsList {
        CarrierTrainsList {
            id,
            name: name.into(),
            trains,
            signature: None,
        }
    }

    pub fn calendar(nr: i64, dates: &[(&str, i64)]) -> TrainCalendar {
        TrainCalendar {
            id: nr,
            train_nr: nr,
            train_name: None,
            train_brand: Some("R".into()),
            dates: dates.iter().map(|(d, _)| d.to_string()).collect(),
            train_ids: dates.iter().map(|(_, id)| *id).collect(),
            date_train_map: dates.iter().map(|(d, id)| (d.to_string(), *id)).collect(),
        }
    }

    /// A stop as `(station id, name, arrival hh:mm, departure hh:mm, platform)`.
    pub type StopSpec<'a> = (i64, &'a str, (u32, u32), (u32, u32), Option<&'a str>);

    /// A train instance; `attributes` are `(id, begin, end)` station ranges.
    pub fn train(id: i64, nr: i64, stops: &[StopSpec<'_>], attributes: &[(i64, &str, &str)]) -> Train {
        let stops: Vec<_> = stops
            .iter()
            .map(|(station_id, name, (ah, am), (dh, dm), platform)| {
                json!({
                    "station_id": station_id,
                    "station_name": name,
                    "arrival": {"hour": ah, "minute": am, "second": 0},
                    "departure": {"hour": dh, "minute": dm, "second": 0},
                    "platform": platform,
                })
            })
            .collect();
        let attributes: Vec<_> = attributes
            .iter()
            .map(|(attr, begin, end)| json!([attr, "Zastępcza komunikacja autobusowa", begin, end, false, ""]))
            .collect();

        serde_json::from_value(json!({
            "train": {
                "id": id,
                "train_nr": nr,
                "name": null,
                "train_attributes": attributes,
            },
            "stops": stops,
        }))
        .unwrap()
    }

    /// One brand, two train numbers:
    ///
    /// - 4512 runs overnight as instance 45120 on two dates and partly by
    ///   bus (Bochnia to Tarnów) as 45121 on a third.
    /// - 33100 "ZKA KORMORAN" runs entirely by bus as 331000.
    pub fn endpoint() -> MockEndpoint {
        let r4512 = carrier_train(4512, None);
        let r33100 = carrier_train(33100, Some("ZKA KORMORAN"));

        let overnight = [
            (100, "Kraków Główny", (23, 50), (23, 55), Some("IV")),
            (200, "Bochnia", (0, 5), (0, 10), Some("1")),
            (300, "Tarnów", (0, 40), (0, 40), None),
        ];
        let partial_bus = [
            (100, "Kraków Główny", (8, 0), (8, 0), Some("IV")),
            (150, "Podłęże", (8, 10), (8, 11), None),
            (200, "Bochnia", (8, 30), (8, 32), Some("1")),
            (250, "Brzesko Okocim", (9, 0), (9, 1), None),
            (300, "Tarnów", (9, 30), (9, 35), Some("2")),
            (400, "Dębica", (10, 0), (10, 0), None),
        ];
        let bus = [
            (300, "Tarnów", (12, 0), (12, 0), None),
            (400, "Dębica", (12, 40), (12, 40), None),
        ];

        MockEndpoint::new()
            .with_carrier(carrier())
            .with_brand(CARRIER, brand(21, "REGIO", vec![r4512.clone(), r33100.clone()]))
            .with_calendars(
                &r4512,
                vec![calendar(
                    4512,
                    &[("2024-12-15", 45120), ("2024-12-16", 45120), ("2024-12-17", 45121)],
                )],
            )
            .with_calendars(&r33100, vec![calendar(33100, &[("2024-12-15", 331000)])])
            .with_train(train(45120, 4512, &overnight, &[]))
            .with_train(train(45121, 4512, &partial_bus, &[(9, "Bochnia", "Tarnów")]))
            .with_train(train(331000, 33100, &bus, &[]))
    }
}
