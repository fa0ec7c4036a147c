//! Byte offset arithmetic for block files.
//!
//! Every region size is a constant derived from the interval, the period and
//! the series count, so any field or value can be located without reading
//! the file.

use super::catalog::{HeaderField, SERIES_HEADER_SIZE};
use super::{MAIN_HEADER_SIZE, VALUE_SIZE};
use crate::error::Result;
use crate::grid::addressing;
use crate::grid::{IntervalBase, Period, TimeInterval};
use chrono::NaiveDateTime;

/// Days reserved in every block of daily and sub-daily files.
const MAX_DAYS_PER_MONTH: usize = 31;

/// Geometry of a block file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    period: Period,
    series_count: usize,
}

impl BlockLayout {
    /// Creates a layout for `series_count` series over `[start, end]`.
    ///
    /// # Errors
    ///
    /// Returns `GridError::InvalidPeriod` if `end` is before `start`.
    pub fn new(
        interval: TimeInterval,
        start: NaiveDateTime,
        end: NaiveDateTime,
        series_count: usize,
    ) -> Result<Self> {
        Ok(Self::for_period(Period::new(start, end, interval)?, series_count))
    }

    /// Creates a layout for an existing period.
    pub fn for_period(period: Period, series_count: usize) -> Self {
        Self { period, series_count }
    }

    /// Shared period of every series.
    pub fn period(&self) -> &Period {
        &self.period
    }

    /// Shared interval of every series.
    pub fn interval(&self) -> TimeInterval {
        self.period.interval()
    }

    /// Number of series (N).
    pub fn series_count(&self) -> usize {
        self.series_count
    }

    /// Value slots per series per subperiod.
    pub fn points_per_block(&self) -> usize {
        let interval = self.interval();
        match interval.base() {
            IntervalBase::Minute | IntervalBase::Hour | IntervalBase::Day => {
                MAX_DAYS_PER_MONTH * interval.slots_per_day()
            }
            IntervalBase::Month | IntervalBase::Year => 1,
        }
    }

    /// Bytes per series per subperiod.
    pub fn block_size(&self) -> u64 {
        (self.points_per_block() * VALUE_SIZE) as u64
    }

    /// Number of subperiods spanned by the period.
    pub fn subperiod_count(&self) -> u64 {
        let base = self.interval().base();
        addressing::subperiod_index(self.period.end(), self.period.start(), base) as u64 + 1
    }

    /// Offset of the first data block.
    pub fn data_region_offset(&self) -> u64 {
        (MAIN_HEADER_SIZE + self.series_count * SERIES_HEADER_SIZE) as u64
    }

    /// Size of a fully allocated file.
    pub fn total_size(&self) -> u64 {
        self.data_region_offset()
            + self.subperiod_count() * self.series_count as u64 * self.block_size()
    }

    /// Offset of the start of a series' header record.
    pub fn series_header_offset(&self, series: usize) -> Option<u64> {
        self.field_offset(HeaderField::HasHeader, series)
    }

    /// Offset of a header field; `None` for an unknown series.
    pub fn field_offset(&self, field: HeaderField, series: usize) -> Option<u64> {
        (series < self.series_count)
            .then(|| (MAIN_HEADER_SIZE + series * SERIES_HEADER_SIZE + field.offset()) as u64)
    }

    /// Offset of `point` inside its block.
    pub fn within_block_offset(&self, point: NaiveDateTime) -> u64 {
        let interval = self.interval();
        let base = interval.base();
        let index = match base {
            IntervalBase::Minute | IntervalBase::Hour | IntervalBase::Day => {
                addressing::day_index(point, base) * interval.slots_per_day()
                    + addressing::sub_day_slot_index(point, base, interval.multiplier())
            }
            IntervalBase::Month | IntervalBase::Year => 0,
        };
        (index * VALUE_SIZE) as u64
    }

    /// Offset of a series' value at `point`.
    ///
    /// Returns `None` for an unknown series or a point outside the period.
    pub fn data_offset(&self, series: usize, point: NaiveDateTime) -> Option<u64> {
        if series >= self.series_count || !self.period.contains(point) {
            return None;
        }
        let point = self.interval().truncate(point);
        let subperiod =
            addressing::subperiod_index(point, self.period.start(), self.interval().base()) as u64;
        let block_size = self.block_size();
        Some(
            self.data_region_offset()
                + subperiod * self.series_count as u64 * block_size
                + series as u64 * block_size
                + self.within_block_offset(point),
        )
    }
}
