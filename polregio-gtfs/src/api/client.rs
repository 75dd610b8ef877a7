//! PolRegio ticketing API HTTP client.
//!
//! Calls are paced: at least `pause` elapses between the start of
//! consecutive requests, measured on a monotonic clock whether or not the
//! previous call succeeded. Transport failures are retried a bounded
//! number of times; responses that arrive but fail to decode are not.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::ApiError;
use super::source::TimetableSource;
use super::types::{
    Brand, BrandsResponse, Carrier, CarrierTrain, CarrierTrainsList, CarrierTrainsListsResponse,
    CarriersResponse, Train, TrainCalendar, TrainCalendarsResponse,
};

/// Default base URL for the ticketing API.
const DEFAULT_BASE_URL: &str = "https://bilety.polregio.pl/pl";

/// Default minimum pause between consecutive calls.
const DEFAULT_PAUSE: Duration = Duration::from_millis(50);

/// Default number of attempts per request.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Configuration for the endpoint client.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Base URL for the API (defaults to production)
    pub base_url: String,
    /// Minimum time between the starts of consecutive calls
    pub pause: Duration,
    /// Attempts per request, the first one included
    pub max_attempts: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl EndpointConfig {
    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the pause between calls.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Set the number of attempts per request.
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            pause: DEFAULT_PAUSE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_secs: 30,
        }
    }
}

/// Spacing of outbound calls.
#[derive(Debug, Clone)]
pub struct Pacer {
    pause: Duration,
    last_call: Option<Instant>,
}

impl Pacer {
    pub fn new(pause: Duration) -> Self {
        Self {
            pause,
            last_call: None,
        }
    }

    /// Reserve the next call slot at `now`, returning how long to wait first.
    ///
    /// The slot is recorded as taken at `now + wait`.
    pub fn reserve(&mut self, now: Instant) -> Duration {
        let wait = match self.last_call {
            Some(last) => self.pause.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        };
        self.last_call = Some(now + wait);
        wait
    }
}

/// Run `op` until it succeeds, fails with a non-transport error, or
/// `max_attempts` transport failures have happened.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_transport<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transport() && attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %e, "request failed, retrying");
                attempt += 1;
            }
            Err(e) if e.is_transport() => {
                return Err(ApiError::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
            Err(e) => return Err(e),
        }
    }
}

/// Ticketing API client.
#[derive(Debug)]
pub struct Endpoint {
    http: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    pacer: Mutex<Pacer>,
}

impl Endpoint {
    /// Create a new client with the given configuration.
    pub fn new(config: EndpointConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_attempts: config.max_attempts,
            pacer: Mutex::new(Pacer::new(config.pause)),
        })
    }

    /// GET `path` with `params` and decode the JSON response.
    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.base_url, path);
        let body = retry_transport(self.max_attempts, |attempt| {
            self.fetch_text(&url, params, attempt)
        })
        .await?;

        serde_json::from_str(&body).map_err(|e| ApiError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }

    /// One paced request, returning the raw body of a successful response.
    async fn fetch_text(
        &self,
        url: &str,
        params: &[(&str, String)],
        attempt: u32,
    ) -> Result<String, ApiError> {
        self.wait_between_calls().await;
        debug!(url, attempt, "GET");

        let response = self.http.get(url).query(params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.text().await?)
    }

    async fn wait_between_calls(&self) {
        let wait = {
            let mut pacer = self.pacer.lock().unwrap_or_else(|e| e.into_inner());
            pacer.reserve(Instant::now())
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

impl TimetableSource for Endpoint {
    async fn brands(&self) -> Result<Vec<Brand>, ApiError> {
        let response: BrandsResponse = self.call("brands", &[]).await?;
        Ok(response.brands)
    }

    async fn carriers(&self) -> Result<Vec<Carrier>, ApiError> {
        let response: CarriersResponse = self.call("carriers", &[]).await?;
        Ok(response.carriers)
    }

    async fn carrier_trains_lists(
        &self,
        carrier_slug: &str,
    ) -> Result<Vec<CarrierTrainsList>, ApiError> {
        let response: CarrierTrainsListsResponse = self
            .call(
                "carrier_trains_lists",
                &[("carrier", carrier_slug.to_string())],
            )
            .await?;
        Ok(response.carrier_trains_lists)
    }

    async fn train_calendars(
        &self,
        carrier_train: &CarrierTrain,
    ) -> Result<Vec<TrainCalendar>, ApiError> {
        let mut params = vec![
            ("brand", carrier_train.brand.clone()),
            ("nr", carrier_train.nr.to_string()),
        ];
        if let Some(name) = &carrier_train.name {
            params.push(("name", name.clone()));
        }

        let response: TrainCalendarsResponse = self.call("train_calendars", &params).await?;
        Ok(response.train_calendars)
    }

    async fn train(&self, id: i64) -> Result<Train, ApiError> {
        self.call(&format!("trains/{id}"), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn config_builder() {
        let config = EndpointConfig::default()
            .with_base_url("http://localhost:8080")
            .with_pause(Duration::from_millis(10))
            .with_max_attempts(5)
            .with_timeout(60);

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.pause, Duration::from_millis(10));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn config_defaults() {
        let config = EndpointConfig::default();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.pause, Duration::from_millis(50));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn client_creation() {
        let client = Endpoint::new(EndpointConfig::default().with_base_url("http://x/pl/"));
        assert_eq!(client.unwrap().base_url, "http://x/pl");
    }

    #[test]
    fn pacer_first_call_is_immediate() {
        let mut pacer = Pacer::new(Duration::from_millis(50));
        assert_eq!(pacer.reserve(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn pacer_waits_out_remaining_pause() {
        let mut pacer = Pacer::new(Duration::from_millis(50));
        let start = Instant::now();

        pacer.reserve(start);
        let wait = pacer.reserve(start + Duration::from_millis(20));
        assert_eq!(wait, Duration::from_millis(30));

        // The previous slot was taken at start + 50ms
        let wait = pacer.reserve(start + Duration::from_millis(60));
        assert_eq!(wait, Duration::from_millis(40));
    }

    #[test]
    fn pacer_no_wait_after_long_gap() {
        let mut pacer = Pacer::new(Duration::from_millis(50));
        let start = Instant::now();

        pacer.reserve(start);
        let wait = pacer.reserve(start + Duration::from_secs(1));
        assert_eq!(wait, Duration::ZERO);
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: 502,
            message: "Bad Gateway".into(),
        }
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failure() {
        let calls = Cell::new(0);
        let result = retry_transport(3, |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 3 {
                    Err(server_error())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_bound() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transport(3, |_| {
            calls.set(calls.get() + 1);
            async { Err(server_error()) }
        })
        .await;

        assert_eq!(calls.get(), 3);
        match result {
            Err(ApiError::RetriesExhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, ApiError::Status { status: 502, .. }));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn retry_skips_decode_errors() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transport(3, |_| {
            calls.set(calls.get() + 1);
            async {
                Err(ApiError::Json {
                    message: "expected value".into(),
                    body: None,
                })
            }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(ApiError::Json { .. })));
    }

    // Requests against the live API belong in an #[ignore]d integration
    // test; the scrape is exercised through MockEndpoint instead.
}
