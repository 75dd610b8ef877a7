//! Abstraction over where the timetable comes from.

use tracing::info;

use super::error::ApiError;
use super::types::{Brand, Carrier, CarrierTrain, CarrierTrainsList, Train, TrainCalendar};

/// The record kinds the scrape reads from the carrier's timetable.
///
/// Implemented by the HTTP [`Endpoint`](super::Endpoint) and by
/// [`MockEndpoint`](super::MockEndpoint) for tests and offline runs.
#[allow(async_fn_in_trait)]
pub trait TimetableSource {
    async fn brands(&self) -> Result<Vec<Brand>, ApiError>;

    async fn carriers(&self) -> Result<Vec<Carrier>, ApiError>;

    /// Every brand of a carrier with the train numbers it runs.
    async fn carrier_trains_lists(
        &self,
        carrier_slug: &str,
    ) -> Result<Vec<CarrierTrainsList>, ApiError>;

    /// Calendars of a train number; one per name/attribute variant.
    async fn train_calendars(
        &self,
        carrier_train: &CarrierTrain,
    ) -> Result<Vec<TrainCalendar>, ApiError>;

    /// Details and stops of one train instance.
    async fn train(&self, id: i64) -> Result<Train, ApiError>;
}

/// Fail unless the API serves the carrier `slug`.
///
/// The error lists every slug actually present.
pub async fn ensure_carrier<S: TimetableSource>(
    source: &S,
    slug: &str,
) -> Result<Carrier, ApiError> {
    let carriers = source.carriers().await?;

    match carriers.iter().position(|c| c.slug == slug) {
        Some(idx) => {
            let carrier = carriers[idx].clone();
            info!(slug, name = %carrier.name, "carrier found");
            Ok(carrier)
        }
        None => Err(ApiError::MissingCarrier {
            slug: slug.to_string(),
            available: carriers.into_iter().map(|c| c.slug).collect(),
        }),
    }
}
