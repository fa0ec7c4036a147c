//! TimeSeries - a regular series with its descriptive metadata.
//!
//! The series owns at most one [`SeriesStore`]. Storage is allocated once the
//! period is known and goes away with the series.

use crate::error::{GridError, Result};
use crate::grid::{self, DataPoint, Period, SeriesStore, TimeInterval, DEFAULT_MISSING_VALUE};
use chrono::NaiveDateTime;

/// A regular-interval series plus identifier, description, units and alias.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    identifier: String,
    description: String,
    units: String,
    alias: String,
    interval: TimeInterval,
    missing_value: f64,
    period: Option<Period>,
    store: Option<SeriesStore>,
}

impl TimeSeries {
    /// Creates an empty series with no period and no storage.
    pub fn new(identifier: impl Into<String>, interval: TimeInterval) -> Self {
        Self {
            identifier: identifier.into(),
            description: String::new(),
            units: String::new(),
            alias: String::new(),
            interval,
            missing_value: DEFAULT_MISSING_VALUE,
            period: None,
            store: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the units.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Sets the alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Sets the missing-value sentinel; only affects storage allocated later.
    pub fn with_missing_value(mut self, missing_value: f64) -> Self {
        self.missing_value = missing_value;
        self
    }

    /// Returns the identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the units.
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Returns the alias.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Returns the interval.
    pub fn interval(&self) -> TimeInterval {
        self.interval
    }

    /// Returns the missing-value sentinel.
    pub fn missing_value(&self) -> f64 {
        self.missing_value
    }

    /// Returns true if `value` is this series' missing sentinel.
    pub fn is_missing(&self, value: f64) -> bool {
        grid::is_missing(value, self.missing_value)
    }

    /// Returns the period of record, if set.
    pub fn period(&self) -> Option<&Period> {
        self.period.as_ref()
    }

    /// Returns the backing store, if allocated.
    pub fn store(&self) -> Option<&SeriesStore> {
        self.store.as_ref()
    }

    /// Sets the period of record, discarding any allocated storage.
    ///
    /// Use [`TimeSeries::change_period_of_record`] to keep existing values.
    pub fn set_period(&mut self, start: NaiveDateTime, end: NaiveDateTime) -> Result<()> {
        self.period = Some(Period::new(start, end, self.interval)?);
        self.store = None;
        Ok(())
    }

    /// Allocates storage for the current period, all values missing.
    ///
    /// # Errors
    ///
    /// Returns `GridError::PeriodNotSet` if no period has been set.
    pub fn allocate_data_space(&mut self) -> Result<()> {
        let period = self.period.ok_or(GridError::PeriodNotSet)?;
        self.store = Some(SeriesStore::new(period, self.missing_value, false));
        Ok(())
    }

    /// Changes the period of record, keeping values in the overlap.
    ///
    /// A missing bound keeps the current one. Without allocated storage only
    /// the period is updated.
    pub fn change_period_of_record(
        &mut self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<()> {
        let (start, end) = match (self.period, start, end) {
            (_, None, None) => return Err(GridError::MissingBound),
            (Some(p), s, e) => (s.unwrap_or(p.start()), e.unwrap_or(p.end())),
            (None, Some(s), Some(e)) => (s, e),
            (None, _, _) => return Err(GridError::PeriodNotSet),
        };
        let period = Period::new(start, end, self.interval)?;

        if let Some(store) = self.store.take() {
            self.store = Some(grid::resize(store, Some(period.start()), Some(period.end()))?);
        }
        self.period = Some(period);
        Ok(())
    }

    /// Returns true if storage is allocated.
    pub fn has_data(&self) -> bool {
        self.store.as_ref().is_some_and(SeriesStore::has_data)
    }

    /// Reads the value at `point`; missing when outside the period or unallocated.
    pub fn get_value(&self, point: NaiveDateTime) -> f64 {
        self.store
            .as_ref()
            .map_or(self.missing_value, |store| store.get(point))
    }

    /// Reads the flag at `point`.
    pub fn get_flag(&self, point: NaiveDateTime) -> Option<&str> {
        self.store.as_ref()?.get_flag(point)
    }

    /// Writes the value at `point`; ignored outside the period or unallocated.
    pub fn set_value(&mut self, point: NaiveDateTime, value: f64) {
        if let Some(store) = self.store.as_mut() {
            store.set(point, value);
        }
    }

    /// Writes value and flag at `point`.
    pub fn set_flagged_value(&mut self, point: NaiveDateTime, value: f64, flag: &str) {
        if let Some(store) = self.store.as_mut() {
            store.set_flagged(point, value, flag);
        }
    }

    /// Iterates the data points of the allocated period.
    pub fn iter(&self) -> impl Iterator<Item = DataPoint> + '_ {
        self.store.iter().flat_map(|store| store.points())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::test_util::ymd;

    fn daily_series() -> TimeSeries {
        let mut ts = TimeSeries::new("STATION.USGS.Streamflow.Day", TimeInterval::daily())
            .with_units("CFS")
            .with_alias("flow");
        ts.set_period(ymd(2000, 1, 1), ymd(2000, 1, 31)).unwrap();
        ts.allocate_data_space().unwrap();
        ts
    }

    #[test]
    fn test_unallocated_series() {
        let ts = TimeSeries::new("a", TimeInterval::daily());
        assert!(!ts.has_data());
        assert_eq!(ts.get_value(ymd(2000, 1, 1)), DEFAULT_MISSING_VALUE);
        assert_eq!(ts.iter().count(), 0);
    }

    #[test]
    fn test_allocate_requires_period() {
        let mut ts = TimeSeries::new("a", TimeInterval::daily());
        assert!(matches!(ts.allocate_data_space(), Err(GridError::PeriodNotSet)));
    }

    #[test]
    fn test_set_and_iterate() {
        let mut ts = daily_series();
        ts.set_value(ymd(2000, 1, 2), 12.5);
        ts.set_flagged_value(ymd(2000, 1, 3), 13.0, "E");

        assert!(ts.has_data());
        assert_eq!(ts.get_value(ymd(2000, 1, 2)), 12.5);
        assert_eq!(ts.get_flag(ymd(2000, 1, 3)), Some("E"));

        let points: Vec<_> = ts.iter().collect();
        assert_eq!(points.len(), 31);
        assert_eq!(points[1].value, 12.5);
        assert_eq!(points[2].flag.as_deref(), Some("E"));
        assert!(ts.is_missing(points[0].value));
    }

    #[test]
    fn test_change_period_keeps_overlap() {
        let mut ts = daily_series();
        ts.set_value(ymd(2000, 1, 20), 7.0);
        ts.change_period_of_record(Some(ymd(2000, 1, 15)), Some(ymd(2000, 2, 10)))
            .unwrap();

        let period = ts.period().unwrap();
        assert_eq!(period.start(), ymd(2000, 1, 15));
        assert_eq!(period.end(), ymd(2000, 2, 10));
        assert_eq!(ts.get_value(ymd(2000, 1, 20)), 7.0);
        assert_eq!(ts.iter().count(), 27);
    }

    #[test]
    fn test_change_period_rejects_reversed_bounds() {
        let mut ts = daily_series();
        ts.set_value(ymd(2000, 1, 5), 3.0);
        let result = ts.change_period_of_record(Some(ymd(2000, 3, 1)), Some(ymd(2000, 2, 1)));
        assert!(matches!(result, Err(GridError::InvalidPeriod { .. })));
        assert!(ts.has_data());
        assert_eq!(ts.get_value(ymd(2000, 1, 5)), 3.0);
    }

    #[test]
    fn test_change_period_without_storage() {
        let mut ts = TimeSeries::new("a", TimeInterval::monthly());
        assert!(matches!(
            ts.change_period_of_record(Some(ymd(2000, 1, 1)), None),
            Err(GridError::PeriodNotSet)
        ));
        assert!(matches!(
            ts.change_period_of_record(None, None),
            Err(GridError::MissingBound)
        ));
        ts.change_period_of_record(Some(ymd(2000, 1, 1)), Some(ymd(2000, 6, 1)))
            .unwrap();
        assert!(!ts.has_data());
        assert_eq!(ts.period().unwrap().point_count(), 6);
    }
}
