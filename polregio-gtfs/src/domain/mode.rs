//! Travel mode of a stop-time or leg.

use std::fmt;

/// Whether a stretch of a trip runs by train or by replacement road transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelMode {
    Rail,
    Road,
}

impl TravelMode {
    pub fn is_road(self) -> bool {
        self == TravelMode::Road
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravelMode::Rail => f.write_str("rail"),
            TravelMode::Road => f.write_str("road"),
        }
    }
}
