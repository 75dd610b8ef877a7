//! Domain types for the schedule normalizer.
//!
//! This module holds the schedule records and the pure algorithms that
//! shape them: day-rollover normalization of stop times, calendar
//! expansion, road-transport annotation and leg segmentation. None of it
//! performs I/O; the scrape and segmentation passes feed it from the API
//! and the record store.

mod annotate;
mod calendar;
mod legs;
mod mode;
mod model;
mod time;

pub use annotate::{
    AnnotatorConfig, AttributeRange, DEFAULT_ROAD_ATTRIBUTE_IDS, DEFAULT_ROAD_MARKER,
    NamePositions, road_positions,
};
pub use calendar::{CalendarError, expand_date_train_map, parse_service_date};
pub use legs::{Leg, compute_legs};
pub use mode::TravelMode;
pub use model::{
    Agency, BUS_PLATFORM, Calendar, FeedInfo, Route, RouteType, Stop, StopTime, Transfer,
    TransferType, Trip,
};
pub use time::{SECONDS_PER_DAY, ServiceTime, StopTimes, TimeError, normalize_stop_times};
