//! Pure mapping from a point in time to grid coordinates.
//!
//! None of these functions fail. Callers check that a point lies inside the
//! owning period first; coordinates for out-of-period points are meaningless.
//!
//! Hour data treats hour 0 as the first reading of its own day. Formats that
//! write "hour 24" for the start of the next day must convert before calling.

use super::{IntervalBase, TimeInterval};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Grid coordinates of one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotAddress {
    /// Subperiods (months, or years for yearly data) since the period start.
    pub subperiod: usize,
    /// Day within the subperiod.
    pub day: usize,
    /// Slot within the day.
    pub slot: usize,
}

/// Counts whole subperiods between `period_start` and `point`.
///
/// The result is negative when `point` falls in an earlier subperiod.
pub fn subperiod_index(point: NaiveDateTime, period_start: NaiveDateTime, base: IntervalBase) -> i64 {
    if base.has_monthly_subperiods() {
        month_ordinal(point) - month_ordinal(period_start)
    } else {
        i64::from(point.year()) - i64::from(period_start.year())
    }
}

/// Day-of-month minus one; zero for monthly and yearly data.
pub fn day_index(point: NaiveDateTime, base: IntervalBase) -> usize {
    match base {
        IntervalBase::Minute | IntervalBase::Hour | IntervalBase::Day => point.day0() as usize,
        IntervalBase::Month | IntervalBase::Year => 0,
    }
}

/// Slot of `point` within its day.
pub fn sub_day_slot_index(point: NaiveDateTime, base: IntervalBase, multiplier: u32) -> usize {
    let multiplier = multiplier.max(1);
    match base {
        IntervalBase::Minute => ((point.hour() * 60 + point.minute()) / multiplier) as usize,
        IntervalBase::Hour => (point.hour() / multiplier) as usize,
        IntervalBase::Day | IntervalBase::Month | IntervalBase::Year => 0,
    }
}

/// Number of slots in one day.
pub fn slots_per_day(base: IntervalBase, multiplier: u32) -> usize {
    let multiplier = multiplier.max(1);
    match base {
        IntervalBase::Minute => (24 * 60 / multiplier) as usize,
        IntervalBase::Hour => (24 / multiplier) as usize,
        IntervalBase::Day | IntervalBase::Month | IntervalBase::Year => 1,
    }
}

/// Full coordinates of `point` relative to `period_start`.
pub fn address(point: NaiveDateTime, period_start: NaiveDateTime, interval: TimeInterval) -> SlotAddress {
    let base = interval.base();
    SlotAddress {
        subperiod: subperiod_index(point, period_start, base).max(0) as usize,
        day: day_index(point, base),
        slot: sub_day_slot_index(point, base, interval.multiplier()),
    }
}

/// Number of day entries in the subperiod `offset` steps after `period_start`.
pub fn days_in_subperiod(period_start: NaiveDateTime, offset: usize, base: IntervalBase) -> usize {
    match base {
        IntervalBase::Minute | IntervalBase::Hour | IntervalBase::Day => {
            let ordinal = month_ordinal(period_start) + offset as i64;
            let year = ordinal.div_euclid(12) as i32;
            let month = ordinal.rem_euclid(12) as u32 + 1;
            days_in_month(year, month) as usize
        }
        IntervalBase::Month | IntervalBase::Year => 1,
    }
}

/// Number of days in a calendar month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 31,
    }
}

fn month_ordinal(point: NaiveDateTime) -> i64 {
    i64::from(point.year()) * 12 + i64::from(point.month0())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::test_util::{dt, ymd};

    #[test]
    fn test_subperiod_index_months() {
        let start = ymd(2000, 11, 1);
        assert_eq!(subperiod_index(ymd(2000, 11, 30), start, IntervalBase::Day), 0);
        assert_eq!(subperiod_index(ymd(2001, 2, 3), start, IntervalBase::Day), 3);
        assert_eq!(subperiod_index(ymd(2000, 10, 3), start, IntervalBase::Hour), -1);
    }

    #[test]
    fn test_subperiod_index_years() {
        let start = ymd(1990, 1, 1);
        assert_eq!(subperiod_index(ymd(2000, 1, 1), start, IntervalBase::Year), 10);
    }

    #[test]
    fn test_day_index() {
        assert_eq!(day_index(ymd(2000, 3, 1), IntervalBase::Day), 0);
        assert_eq!(day_index(ymd(2000, 3, 31), IntervalBase::Hour), 30);
        assert_eq!(day_index(ymd(2000, 3, 31), IntervalBase::Month), 0);
    }

    #[test]
    fn test_sub_day_slot_index() {
        let point = dt(2000, 1, 1, 13, 45);
        assert_eq!(sub_day_slot_index(point, IntervalBase::Minute, 15), (13 * 60 + 45) / 15);
        assert_eq!(sub_day_slot_index(point, IntervalBase::Hour, 1), 13);
        assert_eq!(sub_day_slot_index(point, IntervalBase::Hour, 6), 2);
        assert_eq!(sub_day_slot_index(point, IntervalBase::Day, 1), 0);
        // Hour 0 is the first reading of its own day.
        assert_eq!(sub_day_slot_index(ymd(2000, 1, 2), IntervalBase::Hour, 1), 0);
    }

    #[test]
    fn test_slots_per_day() {
        assert_eq!(slots_per_day(IntervalBase::Day, 1), 1);
        assert_eq!(slots_per_day(IntervalBase::Hour, 6), 4);
        assert_eq!(slots_per_day(IntervalBase::Minute, 15), 96);
        assert_eq!(slots_per_day(IntervalBase::Month, 1), 1);
    }

    #[test]
    fn test_days_in_subperiod() {
        let start = ymd(1999, 12, 15);
        assert_eq!(days_in_subperiod(start, 0, IntervalBase::Day), 31);
        assert_eq!(days_in_subperiod(start, 2, IntervalBase::Day), 29);
        assert_eq!(days_in_subperiod(start, 14, IntervalBase::Hour), 28);
        assert_eq!(days_in_subperiod(start, 2, IntervalBase::Month), 1);
        assert_eq!(days_in_month(1900, 2), 28);
    }
}
