//! Timetable API error types.

use crate::domain::TimeError;

/// Errors from the timetable API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// JSON deserialization failed
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// A stop carried a clock time out of range
    #[error("invalid time in train {train_id}: {source}")]
    InvalidTime {
        train_id: i64,
        #[source]
        source: TimeError,
    },

    /// Transport kept failing up to the retry bound
    #[error("giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ApiError>,
    },

    /// The carrier to scrape is not served by the API
    #[error("carrier {slug:?} not found, available carriers: {}", available.join(", "))]
    MissingCarrier { slug: String, available: Vec<String> },

    /// Canned response missing from a mock source
    #[error("no mock data for {0}")]
    NoMockData(String),
}

impl ApiError {
    /// Whether the failure happened in transport and the request may be retried.
    ///
    /// A response that arrived but could not be decoded is not a transport
    /// failure.
    pub fn is_transport(&self) -> bool {
        match self {
            ApiError::Http(e) => !e.is_decode(),
            ApiError::Status { .. } => true,
            _ => false,
        }
    }
}
