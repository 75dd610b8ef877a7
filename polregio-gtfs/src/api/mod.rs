//! PolRegio ticketing API client.
//!
//! This module provides an HTTP client for the carrier's ticketing site,
//! which publishes the timetable as JSON:
//!
//! - `carrier_trains_lists` lists brands and the train numbers each runs
//! - `train_calendars` maps each running date of a train number to the
//!   concrete train instance that ran
//! - `trains/<id>` gives an instance's stops and free-text attributes
//!
//! Stop times carry no date and no day counter; day rollovers are assigned
//! by the scrape.

mod client;
mod error;
mod mock;
mod source;
mod types;

pub use client::{Endpoint, EndpointConfig, Pacer, retry_transport};
pub use error::ApiError;
pub use mock::{MockCalendars, MockData, MockEndpoint};
pub use source::{TimetableSource, ensure_carrier};
pub use types::{
    ApiTime, Brand, Carrier, CarrierTrain, CarrierTrainsList, Train, TrainAttribute, TrainCalendar,
    TrainDetails, TrainStop,
};
