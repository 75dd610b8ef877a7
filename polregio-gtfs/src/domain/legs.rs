//! Splitting a trip into single-mode legs.
//!
//! A trip whose stop-times switch between rail and road is cut at every
//! switch. The stop where the switch happens is duplicated: the closing
//! leg gets an arrival-only copy and the opening leg a departure-only copy,
//! so every leg is a valid trip on its own.

use super::{StopTime, TravelMode};

/// A maximal run of a trip's stop-times sharing one mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub stop_times: Vec<StopTime>,
    pub mode: TravelMode,
}

impl Leg {
    pub fn first(&self) -> Option<&StopTime> {
        self.stop_times.first()
    }

    pub fn last(&self) -> Option<&StopTime> {
        self.stop_times.last()
    }
}

/// Partition ordered stop-times into legs.
///
/// Legs alternate in mode. A trailing run of a single stop-time is dropped,
/// as it cannot form a leg; its stop is still reached as the arrival-only
/// end of the previous leg.
///
/// # Examples
///
/// ```
/// use polregio_gtfs::domain::{ServiceTime, StopTime, TravelMode, compute_legs};
///
/// let stop_time = |seq: u32, platform: &str| StopTime {
///     trip_id: "1".into(),
///     stop_sequence: seq,
///     stop_id: format!("S{seq}"),
///     arrival: ServiceTime::from_seconds(seq * 600),
///     departure: ServiceTime::from_seconds(seq * 600 + 60),
///     platform: platform.into(),
/// };
///
/// let legs = compute_legs(&[stop_time(0, "1"), stop_time(1, "BUS"), stop_time(2, "")]);
/// assert_eq!(legs.len(), 2);
/// assert_eq!(legs[0].mode, TravelMode::Rail);
/// assert_eq!(legs[1].mode, TravelMode::Road);
/// ```
pub fn compute_legs(stop_times: &[StopTime]) -> Vec<Leg> {
    let Some(first) = stop_times.first() else {
        return Vec::new();
    };

    let mut legs = Vec::new();
    let mut mode = first.mode();
    let mut run: Vec<StopTime> = Vec::new();

    for stop_time in stop_times {
        let current = stop_time.mode();

        if current == mode {
            run.push(stop_time.clone());
            continue;
        }

        run.push(arrival_only(stop_time, mode));
        legs.push(Leg {
            stop_times: std::mem::take(&mut run),
            mode,
        });

        run.push(departure_only(stop_time, current));
        mode = current;
    }

    if run.len() > 1 {
        legs.push(Leg {
            stop_times: run,
            mode,
        });
    }

    legs
}

/// Copy of `stop_time` ending a leg of `mode`: departure pulled back to arrival.
fn arrival_only(stop_time: &StopTime, mode: TravelMode) -> StopTime {
    let mut copy = stop_time.clone();
    copy.departure = copy.arrival;
    copy.set_mode(mode);
    copy
}

/// Copy of `stop_time` starting a leg of `mode`: arrival pushed up to departure.
fn departure_only(stop_time: &StopTime, mode: TravelMode) -> StopTime {
    let mut copy = stop_time.clone();
    copy.arrival = copy.departure;
    copy.set_mode(mode);
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ServiceTime;

    fn stop_time(seq: u32, mode: TravelMode) -> StopTime {
        StopTime {
            trip_id: "9".into(),
            stop_sequence: seq,
            stop_id: format!("S{seq}"),
            arrival: ServiceTime::from_seconds(seq * 600),
            departure: ServiceTime::from_seconds(seq * 600 + 60),
            platform: if mode.is_road() { "BUS".into() } else { "2".into() },
        }
    }

    fn trip(modes: &[TravelMode]) -> Vec<StopTime> {
        modes
            .iter()
            .enumerate()
            .map(|(i, &m)| stop_time(i as u32, m))
            .collect()
    }

    fn stop_ids(leg: &Leg) -> Vec<&str> {
        leg.stop_times.iter().map(|st| st.stop_id.as_str()).collect()
    }

    use TravelMode::{Rail, Road};

    #[test]
    fn single_mode_is_one_leg() {
        let stop_times = trip(&[Rail, Rail, Rail]);
        let legs = compute_legs(&stop_times);
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].mode, Rail);
        assert_eq!(legs[0].stop_times, stop_times);
    }

    #[test]
    fn all_road_is_one_road_leg() {
        let legs = compute_legs(&trip(&[Road, Road]));
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].mode, Road);
    }

    #[test]
    fn rail_road_rail_gives_three_legs() {
        let legs = compute_legs(&trip(&[Rail, Rail, Road, Road, Rail, Rail]));

        assert_eq!(legs.len(), 3);
        assert_eq!(legs[0].mode, Rail);
        assert_eq!(stop_ids(&legs[0]), vec!["S0", "S1", "S2"]);
        assert_eq!(legs[1].mode, Road);
        assert_eq!(stop_ids(&legs[1]), vec!["S2", "S3", "S4"]);
        assert_eq!(legs[2].mode, Rail);
        assert_eq!(stop_ids(&legs[2]), vec!["S4", "S5"]);
    }

    #[test]
    fn trailing_single_stop_is_dropped() {
        let legs = compute_legs(&trip(&[Rail, Rail, Road, Road, Rail]));

        assert_eq!(legs.len(), 2);
        assert_eq!(stop_ids(&legs[0]), vec!["S0", "S1", "S2"]);
        assert_eq!(stop_ids(&legs[1]), vec!["S2", "S3", "S4"]);
    }

    #[test]
    fn boundary_copies_split_times_and_platforms() {
        let legs = compute_legs(&trip(&[Rail, Road, Road]));
        let closing = legs[0].last().unwrap();
        let opening = legs[1].first().unwrap();

        // S1 arrives at 600, departs at 660
        assert_eq!(closing.arrival.total_seconds(), 600);
        assert_eq!(closing.departure.total_seconds(), 600);
        assert_eq!(closing.platform, "");

        assert_eq!(opening.arrival.total_seconds(), 660);
        assert_eq!(opening.departure.total_seconds(), 660);
        assert_eq!(opening.platform, "BUS");
    }

    #[test]
    fn road_boundary_into_rail_keeps_platform() {
        let legs = compute_legs(&trip(&[Road, Rail, Rail]));
        assert_eq!(legs[0].last().unwrap().platform, "BUS");
        assert_eq!(legs[1].first().unwrap().platform, "2");
    }

    #[test]
    fn empty_trip_has_no_legs() {
        assert!(compute_legs(&[]).is_empty());
    }

    #[test]
    fn single_stop_has_no_legs() {
        assert!(compute_legs(&trip(&[Rail])).is_empty());
    }
}
