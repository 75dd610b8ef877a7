//! Calendar expansion.
//!
//! The carrier's calendar endpoint answers "on this date, train number N ran
//! as instance X". Trips in the record store are per instance, so the
//! mapping is inverted into instance → service dates.

use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Error returned when a calendar date cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid calendar date {date:?} for instance {instance}")]
pub struct CalendarError {
    pub date: String,
    pub instance: i64,
}

/// Parse a calendar date in the API's `YYYY-MM-DD` format.
pub fn parse_service_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Invert a date → instance mapping into instance → sorted dates.
///
/// The input is a function of the date, so every date lands in exactly one
/// group and no group is empty.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use polregio_gtfs::domain::expand_date_train_map;
///
/// let map = BTreeMap::from([
///     ("2024-03-01".to_string(), 100),
///     ("2024-03-02".to_string(), 200),
///     ("2024-03-03".to_string(), 100),
/// ]);
/// let groups = expand_date_train_map(&map).unwrap();
/// assert_eq!(groups[&100].len(), 2);
/// assert_eq!(groups[&200].len(), 1);
/// ```
pub fn expand_date_train_map(
    date_train_map: &BTreeMap<String, i64>,
) -> Result<BTreeMap<i64, Vec<NaiveDate>>, CalendarError> {
    let mut groups: BTreeMap<i64, Vec<NaiveDate>> = BTreeMap::new();

    for (date_str, &instance) in date_train_map {
        let date = parse_service_date(date_str).ok_or_else(|| CalendarError {
            date: date_str.clone(),
            instance,
        })?;
        groups.entry(instance).or_default().push(date);
    }

    for dates in groups.values_mut() {
        dates.sort_unstable();
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn groups_by_instance() {
        let map = BTreeMap::from([
            ("2024-12-15".to_string(), 4512001),
            ("2024-12-16".to_string(), 4512002),
            ("2024-12-17".to_string(), 4512001),
            ("2024-12-18".to_string(), 4512001),
        ]);

        let groups = expand_date_train_map(&map).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[&4512001],
            vec![date(2024, 12, 15), date(2024, 12, 17), date(2024, 12, 18)]
        );
        assert_eq!(groups[&4512002], vec![date(2024, 12, 16)]);
    }

    #[test]
    fn empty_map_gives_no_groups() {
        let groups = expand_date_train_map(&BTreeMap::new()).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn invalid_date_is_reported() {
        let map = BTreeMap::from([("15.12.2024".to_string(), 7)]);
        let err = expand_date_train_map(&map).unwrap_err();
        assert_eq!(err.instance, 7);
        assert_eq!(err.date, "15.12.2024");
        assert_eq!(
            err.to_string(),
            "invalid calendar date \"15.12.2024\" for instance 7"
        );
    }
}
