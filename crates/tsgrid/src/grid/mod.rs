//! Regular-interval time series held in memory.
//!
//! A series is addressed by three coordinates derived from a point in time:
//!
//! ```text
//! subperiod (month, or year for yearly data)
//!   └── day within the subperiod (one entry for monthly/yearly data)
//!         └── sub-day slot (one for daily and coarser data)
//! ```
//!
//! [`SeriesStore`] owns a nested array built on exactly these coordinates and
//! sized to the series' [`Period`]; [`resize`] rebuilds a store for a new
//! period while keeping the overlapping values.

pub mod addressing;
pub mod resize;
pub mod store;

pub use addressing::SlotAddress;
pub use resize::resize;
pub use store::SeriesStore;

use crate::error::{GridError, Result};
use chrono::{Datelike, Duration, Months, NaiveDateTime, Timelike};
use std::fmt;

/// Default missing-value sentinel.
pub const DEFAULT_MISSING_VALUE: f64 = -999.0;

/// Sampling granularity of a series.
///
/// The discriminants are the integer codes persisted in block files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum IntervalBase {
    /// Minute data.
    Minute = 20,
    /// Hourly data.
    Hour = 30,
    /// Daily data.
    Day = 40,
    /// Monthly data.
    Month = 60,
    /// Yearly data.
    Year = 70,
}

impl IntervalBase {
    /// Creates an IntervalBase from its persisted code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            20 => Some(Self::Minute),
            30 => Some(Self::Hour),
            40 => Some(Self::Day),
            60 => Some(Self::Month),
            70 => Some(Self::Year),
            _ => None,
        }
    }

    /// Returns the persisted code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Returns true if the base is finer than one day.
    pub fn is_sub_daily(self) -> bool {
        matches!(self, Self::Minute | Self::Hour)
    }

    /// Returns true if the top-level subperiod is a calendar month.
    pub fn has_monthly_subperiods(self) -> bool {
        !matches!(self, Self::Year)
    }
}

impl fmt::Display for IntervalBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Minute => "Minute",
            Self::Hour => "Hour",
            Self::Day => "Day",
            Self::Month => "Month",
            Self::Year => "Year",
        };
        f.write_str(name)
    }
}

/// Interval base plus multiplier, e.g. 15 minute or 6 hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeInterval {
    base: IntervalBase,
    multiplier: u32,
}

impl TimeInterval {
    /// Creates an interval, validating the multiplier for its base.
    ///
    /// Minute multipliers must lie in `1..=60` and divide a day evenly; hour
    /// multipliers must divide 24. Day, month and year data only support a
    /// multiplier of 1.
    ///
    /// # Errors
    ///
    /// Returns `GridError::InvalidInterval` for an unsupported multiplier.
    pub fn new(base: IntervalBase, multiplier: u32) -> Result<Self> {
        let valid = match base {
            IntervalBase::Minute => (1..=60).contains(&multiplier) && 1440 % multiplier == 0,
            IntervalBase::Hour => (1..=24).contains(&multiplier) && 24 % multiplier == 0,
            IntervalBase::Day | IntervalBase::Month | IntervalBase::Year => multiplier == 1,
        };
        if !valid {
            return Err(GridError::InvalidInterval {
                base: base.to_string(),
                multiplier: i64::from(multiplier),
            });
        }
        Ok(Self { base, multiplier })
    }

    /// Creates an interval from persisted base code and multiplier.
    pub fn from_codes(base_code: i32, multiplier: i32) -> Result<Self> {
        let invalid = || GridError::InvalidInterval {
            base: base_code.to_string(),
            multiplier: i64::from(multiplier),
        };
        let base = IntervalBase::from_code(base_code).ok_or_else(invalid)?;
        let multiplier = u32::try_from(multiplier).map_err(|_| invalid())?;
        Self::new(base, multiplier)
    }

    /// Daily interval.
    pub fn daily() -> Self {
        Self { base: IntervalBase::Day, multiplier: 1 }
    }

    /// Monthly interval.
    pub fn monthly() -> Self {
        Self { base: IntervalBase::Month, multiplier: 1 }
    }

    /// Yearly interval.
    pub fn yearly() -> Self {
        Self { base: IntervalBase::Year, multiplier: 1 }
    }

    /// Returns the interval base.
    pub fn base(&self) -> IntervalBase {
        self.base
    }

    /// Returns the interval multiplier.
    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Truncates a point to the precision of this interval.
    ///
    /// Fields finer than the base are zeroed (day and month reset to 1).
    pub fn truncate(&self, point: NaiveDateTime) -> NaiveDateTime {
        let date = point.date();
        let truncated = match self.base {
            IntervalBase::Minute => date.and_hms_opt(point.hour(), point.minute(), 0),
            IntervalBase::Hour => date.and_hms_opt(point.hour(), 0, 0),
            IntervalBase::Day => date.and_hms_opt(0, 0, 0),
            IntervalBase::Month => date.with_day(1).and_then(|d| d.and_hms_opt(0, 0, 0)),
            IntervalBase::Year => date
                .with_day(1)
                .and_then(|d| d.with_month(1))
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        };
        truncated.unwrap_or(point)
    }

    /// Returns the point one interval step after `point`.
    pub fn advance(&self, point: NaiveDateTime) -> NaiveDateTime {
        let m = i64::from(self.multiplier);
        let next = match self.base {
            IntervalBase::Minute => point.checked_add_signed(Duration::minutes(m)),
            IntervalBase::Hour => point.checked_add_signed(Duration::hours(m)),
            IntervalBase::Day => point.checked_add_signed(Duration::days(m)),
            IntervalBase::Month => point.checked_add_months(Months::new(self.multiplier)),
            IntervalBase::Year => point.checked_add_months(Months::new(12 * self.multiplier)),
        };
        next.unwrap_or(NaiveDateTime::MAX)
    }

    /// Last point at or before `end` that lies a whole number of steps after
    /// `start`.
    ///
    /// Only minute and hour steps can fall between truncated bounds; day,
    /// month and year bounds are already on the grid after truncation.
    pub fn last_step(&self, start: NaiveDateTime, end: NaiveDateTime) -> NaiveDateTime {
        let step_seconds = match self.base {
            IntervalBase::Minute => i64::from(self.multiplier) * 60,
            IntervalBase::Hour => i64::from(self.multiplier) * 3600,
            IntervalBase::Day | IntervalBase::Month | IntervalBase::Year => return end,
        };
        let span = (end - start).num_seconds();
        if span <= 0 {
            return end;
        }
        start
            .checked_add_signed(Duration::seconds(span - span % step_seconds))
            .unwrap_or(end)
    }

    /// Number of sub-day slots in one day for this interval.
    pub fn slots_per_day(&self) -> usize {
        addressing::slots_per_day(self.base, self.multiplier)
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.multiplier, self.base)
    }
}

/// Inclusive span of record of a regular series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: NaiveDateTime,
    end: NaiveDateTime,
    interval: TimeInterval,
}

impl Period {
    /// Creates a period; both bounds are truncated to the interval precision.
    ///
    /// The end is then moved back to the last point reachable from `start`
    /// by whole interval steps, so `end` is always the final point.
    ///
    /// # Errors
    ///
    /// Returns `GridError::InvalidPeriod` if `end` is before `start`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, interval: TimeInterval) -> Result<Self> {
        let start = interval.truncate(start);
        let end = interval.truncate(end);
        if end < start {
            return Err(GridError::InvalidPeriod { start, end });
        }
        let end = interval.last_step(start, end);
        Ok(Self { start, end, interval })
    }

    /// First point of the period.
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Last point of the period (inclusive).
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Sampling interval.
    pub fn interval(&self) -> TimeInterval {
        self.interval
    }

    /// Returns true if the truncated point lies within `[start, end]`.
    pub fn contains(&self, point: NaiveDateTime) -> bool {
        let point = self.interval.truncate(point);
        point >= self.start && point <= self.end
    }

    /// Returns the intersection with `[start, end]`, if any.
    pub fn overlap(&self, start: NaiveDateTime, end: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let from = self.start.max(self.interval.truncate(start));
        let to = self.end.min(self.interval.truncate(end));
        (from <= to).then_some((from, to))
    }

    /// Iterates every point from start to end stepping by the interval.
    pub fn points(&self) -> PeriodPoints {
        PeriodPoints::new(self.start, self.end, self.interval)
    }

    /// Number of points in the period.
    pub fn point_count(&self) -> usize {
        self.points().count()
    }
}

/// Iterator over the points of an inclusive span at a fixed interval.
#[derive(Debug, Clone)]
pub struct PeriodPoints {
    next: Option<NaiveDateTime>,
    end: NaiveDateTime,
    interval: TimeInterval,
}

impl PeriodPoints {
    /// Creates an iterator over `[start, end]`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, interval: TimeInterval) -> Self {
        Self {
            next: (start <= end).then_some(start),
            end,
            interval,
        }
    }
}

impl Iterator for PeriodPoints {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let following = self.interval.advance(current);
        self.next = (following > current && following <= self.end).then_some(following);
        Some(current)
    }
}

/// One observation: value plus optional quality flag.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// Point in time.
    pub date: NaiveDateTime,
    /// Observed value, possibly the missing sentinel.
    pub value: f64,
    /// Quality flag, if one was recorded.
    pub flag: Option<String>,
}

impl DataPoint {
    /// Creates a data point without a flag.
    pub fn new(date: NaiveDateTime, value: f64) -> Self {
        Self { date, value, flag: None }
    }

    /// Creates a data point with a flag.
    pub fn with_flag(date: NaiveDateTime, value: f64, flag: impl Into<String>) -> Self {
        Self {
            date,
            value,
            flag: Some(flag.into()),
        }
    }
}

/// Returns true if `value` equals the sentinel, treating NaN sentinels as equal.
pub fn is_missing(value: f64, missing_value: f64) -> bool {
    if missing_value.is_nan() {
        value.is_nan()
    } else {
        value == missing_value
    }
}
