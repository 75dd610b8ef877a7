//! Mock timetable source for testing without API access.
//!
//! Serves canned responses, either built in code or loaded from a single
//! JSON file, as if they were live API responses.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::error::ApiError;
use super::source::TimetableSource;
use super::types::{Brand, Carrier, CarrierTrain, CarrierTrainsList, Train, TrainCalendar};

/// Calendars answered for one `(brand, nr, name)` query.
#[derive(Debug, Clone, Deserialize)]
pub struct MockCalendars {
    pub brand: String,
    pub nr: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub calendars: Vec<TrainCalendar>,
}

/// On-disk layout of a mock data file.
#[derive(Debug, Default, Deserialize)]
pub struct MockData {
    #[serde(default)]
    pub brands: Vec<Brand>,
    #[serde(default)]
    pub carriers: Vec<Carrier>,
    /// Carrier slug → its brands.
    #[serde(default)]
    pub carrier_trains_lists: HashMap<String, Vec<CarrierTrainsList>>,
    #[serde(default)]
    pub train_calendars: Vec<MockCalendars>,
    #[serde(default)]
    pub trains: Vec<Train>,
}

type CalendarKey = (String, i64, Option<String>);

/// Mock timetable source serving pre-loaded data.
#[derive(Debug, Default, Clone)]
pub struct MockEndpoint {
    brands: Vec<Brand>,
    carriers: Vec<Carrier>,
    carrier_trains_lists: HashMap<String, Vec<CarrierTrainsList>>,
    train_calendars: HashMap<CalendarKey, Vec<TrainCalendar>>,
    trains: HashMap<i64, Train>,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load canned responses from a JSON file laid out as [`MockData`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ApiError::Json {
            message: format!("failed to read {}: {e}", path.display()),
            body: None,
        })?;
        let data: MockData = serde_json::from_str(&json).map_err(|e| ApiError::Json {
            message: format!("failed to parse {}: {e}", path.display()),
            body: None,
        })?;
        Ok(Self::from_data(data))
    }

    pub fn from_data(data: MockData) -> Self {
        let mut mock = Self {
            brands: data.brands,
            carriers: data.carriers,
            carrier_trains_lists: data.carrier_trains_lists,
            ..Self::default()
        };
        for entry in data.train_calendars {
            mock.train_calendars
                .insert((entry.brand, entry.nr, entry.name), entry.calendars);
        }
        for train in data.trains {
            mock.trains.insert(train.train.id, train);
        }
        mock
    }

    pub fn with_carrier(mut self, carrier: Carrier) -> Self {
        self.carriers.push(carrier);
        self
    }

    pub fn with_brand(mut self, carrier_slug: &str, list: CarrierTrainsList) -> Self {
        self.carrier_trains_lists
            .entry(carrier_slug.to_string())
            .or_default()
            .push(list);
        self
    }

    pub fn with_calendars(mut self, carrier_train: &CarrierTrain, calendars: Vec<TrainCalendar>) -> Self {
        self.train_calendars.insert(calendar_key(carrier_train), calendars);
        self
    }

    pub fn with_train(mut self, train: Train) -> Self {
        self.trains.insert(train.train.id, train);
        self
    }
}

fn calendar_key(carrier_train: &CarrierTrain) -> CalendarKey {
    (
        carrier_train.brand.clone(),
        carrier_train.nr,
        carrier_train.name.clone(),
    )
}

impl TimetableSource for MockEndpoint {
    async fn brands(&self) -> Result<Vec<Brand>, ApiError> {
        Ok(self.brands.clone())
    }

    async fn carriers(&self) -> Result<Vec<Carrier>, ApiError> {
        Ok(self.carriers.clone())
    }

    async fn carrier_trains_lists(
        &self,
        carrier_slug: &str,
    ) -> Result<Vec<CarrierTrainsList>, ApiError> {
        Ok(self
            .carrier_trains_lists
            .get(carrier_slug)
            .cloned()
            .unwrap_or_default())
    }

    async fn train_calendars(
        &self,
        carrier_train: &CarrierTrain,
    ) -> Result<Vec<TrainCalendar>, ApiError> {
        Ok(self
            .train_calendars
            .get(&calendar_key(carrier_train))
            .cloned()
            .unwrap_or_default())
    }

    async fn train(&self, id: i64) -> Result<Train, ApiError> {
        self.trains
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NoMockData(format!("train {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ensure_carrier;

    fn carrier(slug: &str) -> Carrier {
        Carrier {
            id: 1,
            name: slug.to_uppercase(),
            short_name: None,
            slug: slug.to_string(),
            update_date: None,
            update_time: None,
        }
    }

    #[tokio::test]
    async fn unknown_train_returns_error() {
        let mock = MockEndpoint::new();
        let result = mock.train(42).await;
        assert!(matches!(result, Err(ApiError::NoMockData(_))));
    }

    #[tokio::test]
    async fn calendars_keyed_by_brand_number_and_name() {
        let named = CarrierTrain {
            nr: 33100,
            param_nr: None,
            name: Some("KORMORAN".into()),
            brand: "R".into(),
        };
        let unnamed = CarrierTrain {
            name: None,
            ..named.clone()
        };
        let calendar = TrainCalendar {
            id: 1,
            train_nr: 33100,
            train_name: Some("KORMORAN".into()),
            train_brand: Some("R".into()),
            dates: vec![],
            train_ids: vec![],
            date_train_map: Default::default(),
        };

        let mock = MockEndpoint::new().with_calendars(&named, vec![calendar]);
        assert_eq!(mock.train_calendars(&named).await.unwrap().len(), 1);
        assert!(mock.train_calendars(&unnamed).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_carrier_lists_available_slugs() {
        let mock = MockEndpoint::new()
            .with_carrier(carrier("koleje-slaskie"))
            .with_carrier(carrier("arriva"));

        let err = ensure_carrier(&mock, "polregio-przewozy-regionalne")
            .await
            .unwrap_err();
        match err {
            ApiError::MissingCarrier { slug, available } => {
                assert_eq!(slug, "polregio-przewozy-regionalne");
                assert_eq!(available, vec!["koleje-slaskie", "arriva"]);
            }
            other => panic!("expected MissingCarrier, got {other:?}"),
        }

        let found = ensure_carrier(&mock, "arriva").await.unwrap();
        assert_eq!(found.slug, "arriva");
    }

    #[tokio::test]
    async fn load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mock.json");
        std::fs::write(
            &path,
            r#"{
                "carriers": [{"id": 1, "name": "POLREGIO", "slug": "polregio-przewozy-regionalne"}],
                "carrier_trains_lists": {
                    "polregio-przewozy-regionalne": [
                        {"id": 21, "name": "REGIO", "trains": [{"nr": 4512, "name": null, "brand": "R"}]}
                    ]
                }
            }"#,
        )
        .unwrap();

        let mock = MockEndpoint::from_json_file(&path).unwrap();
        assert_eq!(mock.carriers().await.unwrap().len(), 1);

        let lists = mock
            .carrier_trains_lists("polregio-przewozy-regionalne")
            .await
            .unwrap();
        assert_eq!(lists[0].trains[0].nr, 4512);
    }
}
