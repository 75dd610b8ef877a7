//! Schedule time handling.
//!
//! The carrier API reports stop times as bare clock times with no date and
//! no day counter. Stop-times in the record store are offsets from midnight
//! of the service day, so an overnight train carries values past 24:00.
//! This module provides the offset type and the normalizer that assigns
//! day rollovers to a sequence of clock times.

use std::fmt;
use std::ops::Add;

/// Seconds in one service day.
pub const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// Error returned when a clock time is out of range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Offset from midnight of the service day, in seconds.
///
/// Unlike a time of day, a `ServiceTime` may exceed 24 hours to represent
/// stops reached after midnight.
///
/// # Examples
///
/// ```
/// use polregio_gtfs::domain::ServiceTime;
///
/// let t = ServiceTime::from_hms(23, 50, 0).unwrap();
/// assert_eq!(t.total_seconds(), 85800);
/// assert_eq!(t.next_day().to_string(), "47:50:00");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ServiceTime(u32);

impl ServiceTime {
    /// Midnight at the start of the service day.
    pub const ZERO: ServiceTime = ServiceTime(0);

    /// Build a service time from its clock components.
    ///
    /// The hour is not capped at 23: a time already past midnight of the
    /// service day is taken as given.
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Result<Self, TimeError> {
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }
        if second > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }
        hour.checked_mul(3600)
            .and_then(|s| s.checked_add(minute * 60 + second))
            .map(Self)
            .ok_or(TimeError::new("hour out of range"))
    }

    /// Wrap a raw second count.
    pub fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    /// Seconds since midnight of the service day.
    pub fn total_seconds(&self) -> u32 {
        self.0
    }

    /// The same clock time one day later.
    pub fn next_day(self) -> Self {
        Self(self.0 + SECONDS_PER_DAY)
    }
}

impl Add<u32> for ServiceTime {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl fmt::Debug for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceTime({self})")
    }
}

/// Renders as `HH:MM:SS`, with hours allowed to exceed 23.
impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3600;
        let minutes = (self.0 % 3600) / 60;
        let seconds = self.0 % 60;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Arrival and departure at one stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopTimes {
    pub arrival: ServiceTime,
    pub departure: ServiceTime,
}

impl StopTimes {
    pub fn new(arrival: ServiceTime, departure: ServiceTime) -> Self {
        Self {
            arrival,
            departure,
        }
    }
}

/// Assign day rollovers to a trip's clock times.
///
/// Walks the stops in order, keeping the previous departure. An arrival
/// earlier than the previous departure is pushed forward by whole days
/// until it is not, and a departure earlier than its own arrival likewise.
/// The result satisfies `arrival[i] <= departure[i] <= arrival[i + 1]`.
///
/// # Examples
///
/// ```
/// use polregio_gtfs::domain::{ServiceTime, StopTimes, normalize_stop_times};
///
/// let raw = [
///     StopTimes::new(ServiceTime::from_seconds(85800), ServiceTime::from_seconds(86100)),
///     StopTimes::new(ServiceTime::from_seconds(300), ServiceTime::from_seconds(600)),
/// ];
/// let normalized = normalize_stop_times(&raw);
/// assert_eq!(normalized[1].arrival.total_seconds(), 86700);
/// assert_eq!(normalized[1].departure.total_seconds(), 87000);
/// ```
pub fn normalize_stop_times(raw: &[StopTimes]) -> Vec<StopTimes> {
    let mut previous_departure = ServiceTime::ZERO;

    raw.iter()
        .map(|times| {
            let mut arrival = times.arrival;
            while arrival < previous_departure {
                arrival = arrival.next_day();
            }

            let mut departure = times.departure;
            while departure < arrival {
                departure = departure.next_day();
            }

            previous_departure = departure;
            StopTimes::new(arrival, departure)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(arrival: u32, departure: u32) -> StopTimes {
        StopTimes::new(
            ServiceTime::from_seconds(arrival),
            ServiceTime::from_seconds(departure),
        )
    }

    #[test]
    fn from_hms_valid() {
        assert_eq!(ServiceTime::from_hms(0, 0, 0).unwrap().total_seconds(), 0);
        assert_eq!(
            ServiceTime::from_hms(23, 59, 59).unwrap().total_seconds(),
            86399
        );
        assert_eq!(
            ServiceTime::from_hms(14, 30, 15).unwrap().total_seconds(),
            52215
        );
    }

    #[test]
    fn from_hms_accepts_hours_past_midnight() {
        let t = ServiceTime::from_hms(25, 30, 0).unwrap();
        assert_eq!(t.total_seconds(), 91800);
        assert_eq!(t.to_string(), "25:30:00");

        // Already past midnight, so no further rollover is added
        let normalized = normalize_stop_times(&[
            st(85800, 86100),
            StopTimes::new(t, t),
        ]);
        assert_eq!(normalized[1].arrival.total_seconds(), 91800);
    }

    #[test]
    fn from_hms_out_of_range() {
        assert!(ServiceTime::from_hms(u32::MAX, 0, 0).is_err());
        assert!(ServiceTime::from_hms(12, 60, 0).is_err());
        assert!(ServiceTime::from_hms(12, 0, 60).is_err());
    }

    #[test]
    fn display_past_midnight() {
        assert_eq!(ServiceTime::from_seconds(0).to_string(), "00:00:00");
        assert_eq!(ServiceTime::from_seconds(86700).to_string(), "24:05:00");
        assert_eq!(ServiceTime::from_seconds(3723).to_string(), "01:02:03");
    }

    #[test]
    fn normalize_same_day_unchanged() {
        let raw = vec![st(36000, 36060), st(36600, 36660), st(37200, 37200)];
        assert_eq!(normalize_stop_times(&raw), raw);
    }

    #[test]
    fn normalize_arrival_after_midnight() {
        let raw = vec![st(85800, 86100), st(300, 600)];
        let normalized = normalize_stop_times(&raw);
        assert_eq!(normalized, vec![st(85800, 86100), st(86700, 87000)]);
    }

    #[test]
    fn normalize_departure_after_midnight() {
        // Arrives 23:58, departs 00:02
        let raw = vec![st(86280, 120), st(600, 600)];
        let normalized = normalize_stop_times(&raw);
        assert_eq!(normalized, vec![st(86280, 86520), st(87000, 87000)]);
    }

    #[test]
    fn normalize_stays_on_next_day() {
        let raw = vec![st(85800, 85800), st(300, 300), st(1200, 1260)];
        let normalized = normalize_stop_times(&raw);
        assert_eq!(normalized[2], st(87600, 87660));
    }

    #[test]
    fn normalize_empty() {
        assert!(normalize_stop_times(&[]).is_empty());
    }
}
