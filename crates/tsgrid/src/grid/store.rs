//! SeriesStore - period-exact in-memory storage for one series.
//!
//! Values live in a three-level array (subperiod → day → slot). Days of the
//! first and last subperiod that fall outside the period are never allocated,
//! and the boundary days themselves only hold the slots from the start slot
//! (first day) or up to the end slot (last day). The number of allocated
//! cells therefore equals the number of points in the period.
//!
//! Reads outside the period return the missing sentinel and writes outside it
//! are ignored.

use super::addressing::{self, SlotAddress};
use super::{is_missing, DataPoint, Period, TimeInterval};
use crate::error::Result;
use chrono::NaiveDateTime;

/// Allocated slots of one day.
#[derive(Debug, Clone)]
struct DayCells<T> {
    first_slot: usize,
    cells: Vec<T>,
}

impl<T> DayCells<T> {
    fn get(&self, slot: usize) -> Option<&T> {
        slot.checked_sub(self.first_slot).and_then(|i| self.cells.get(i))
    }

    fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        slot.checked_sub(self.first_slot).and_then(|i| self.cells.get_mut(i))
    }
}

/// Nested cell array sized to one period.
#[derive(Debug, Clone)]
struct SlotGrid<T> {
    subperiods: Vec<Vec<Option<DayCells<T>>>>,
}

impl<T: Clone> SlotGrid<T> {
    fn allocate(period: &Period, fill: T) -> Self {
        let interval = period.interval();
        let base = interval.base();
        let first = addressing::address(period.start(), period.start(), interval);
        let last = addressing::address(period.end(), period.start(), interval);
        let slots = interval.slots_per_day();

        let mut subperiods = Vec::with_capacity(last.subperiod + 1);
        for sp in 0..=last.subperiod {
            let day_count = addressing::days_in_subperiod(period.start(), sp, base);
            let mut days = Vec::with_capacity(day_count);
            for day in 0..day_count {
                let before_start = sp == 0 && day < first.day;
                let after_end = sp == last.subperiod && day > last.day;
                if before_start || after_end {
                    days.push(None);
                    continue;
                }
                let first_slot = if sp == 0 && day == first.day { first.slot } else { 0 };
                let last_slot = if sp == last.subperiod && day == last.day {
                    last.slot
                } else {
                    slots - 1
                };
                days.push(Some(DayCells {
                    first_slot,
                    cells: vec![fill.clone(); last_slot + 1 - first_slot],
                }));
            }
            subperiods.push(days);
        }

        Self { subperiods }
    }
}

impl<T> SlotGrid<T> {
    fn cell(&self, addr: SlotAddress) -> Option<&T> {
        self.subperiods
            .get(addr.subperiod)?
            .get(addr.day)?
            .as_ref()?
            .get(addr.slot)
    }

    fn cell_mut(&mut self, addr: SlotAddress) -> Option<&mut T> {
        self.subperiods
            .get_mut(addr.subperiod)?
            .get_mut(addr.day)?
            .as_mut()?
            .get_mut(addr.slot)
    }

    fn cell_count(&self) -> usize {
        self.subperiods
            .iter()
            .flatten()
            .flatten()
            .map(|day| day.cells.len())
            .sum()
    }
}

/// Values (and optional flags) of one series over exactly its period.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    period: Period,
    missing_value: f64,
    values: SlotGrid<f64>,
    flags: Option<SlotGrid<String>>,
}

impl SeriesStore {
    /// Allocates a store for `period`, every cell set to `missing_value`.
    ///
    /// Flag cells are allocated up front when `with_flags` is set, otherwise
    /// on the first flagged write.
    pub fn new(period: Period, missing_value: f64, with_flags: bool) -> Self {
        let values = SlotGrid::allocate(&period, missing_value);
        let flags = with_flags.then(|| SlotGrid::allocate(&period, String::new()));
        Self {
            period,
            missing_value,
            values,
            flags,
        }
    }

    /// Validates the period and interval, then allocates a store.
    ///
    /// # Errors
    ///
    /// Returns `GridError::InvalidPeriod` if `end` is before `start`.
    pub fn create(
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: TimeInterval,
        missing_value: f64,
        with_flags: bool,
    ) -> Result<Self> {
        let period = Period::new(start, end, interval)?;
        Ok(Self::new(period, missing_value, with_flags))
    }

    /// Returns the period this store covers.
    pub fn period(&self) -> &Period {
        &self.period
    }

    /// Returns the missing-value sentinel.
    pub fn missing_value(&self) -> f64 {
        self.missing_value
    }

    /// Returns true if the value array is allocated.
    ///
    /// This holds even when every cell still carries the sentinel.
    pub fn has_data(&self) -> bool {
        !self.values.subperiods.is_empty()
    }

    /// Returns true if flag cells are allocated.
    pub fn has_flags(&self) -> bool {
        self.flags.is_some()
    }

    /// Number of allocated value cells.
    pub fn allocated_cells(&self) -> usize {
        self.values.cell_count()
    }

    fn address(&self, point: NaiveDateTime) -> Option<SlotAddress> {
        if !self.period.contains(point) {
            return None;
        }
        let interval = self.period.interval();
        Some(addressing::address(
            interval.truncate(point),
            self.period.start(),
            interval,
        ))
    }

    /// Reads the value at `point`, or the sentinel outside the period.
    pub fn get(&self, point: NaiveDateTime) -> f64 {
        self.address(point)
            .and_then(|addr| self.values.cell(addr))
            .copied()
            .unwrap_or(self.missing_value)
    }

    /// Returns true if the value at `point` is missing.
    pub fn is_missing_at(&self, point: NaiveDateTime) -> bool {
        is_missing(self.get(point), self.missing_value)
    }

    /// Reads the flag at `point`.
    ///
    /// Returns `None` outside the period or when no flags were ever stored.
    pub fn get_flag(&self, point: NaiveDateTime) -> Option<&str> {
        let addr = self.address(point)?;
        self.flags.as_ref()?.cell(addr).map(String::as_str)
    }

    /// Reads value and flag at `point`; an empty flag is reported as `None`.
    pub fn get_point(&self, point: NaiveDateTime) -> DataPoint {
        let date = self.period.interval().truncate(point);
        let flag = self
            .get_flag(point)
            .filter(|flag| !flag.is_empty())
            .map(str::to_string);
        DataPoint {
            date,
            value: self.get(point),
            flag,
        }
    }

    /// Writes the value at `point`; ignored outside the period.
    pub fn set(&mut self, point: NaiveDateTime, value: f64) {
        let Some(addr) = self.address(point) else {
            return;
        };
        if let Some(cell) = self.values.cell_mut(addr) {
            *cell = value;
        }
    }

    /// Writes value and flag at `point`; ignored outside the period.
    ///
    /// The flag array is allocated on first use.
    pub fn set_flagged(&mut self, point: NaiveDateTime, value: f64, flag: &str) {
        let Some(addr) = self.address(point) else {
            return;
        };
        if let Some(cell) = self.values.cell_mut(addr) {
            *cell = value;
        }
        let period = self.period;
        let flags = self
            .flags
            .get_or_insert_with(|| SlotGrid::allocate(&period, String::new()));
        if let Some(cell) = flags.cell_mut(addr) {
            flag.clone_into(cell);
        }
    }

    /// Iterates every point of the period in time order.
    pub fn points(&self) -> impl Iterator<Item = DataPoint> + '_ {
        self.period.points().map(move |date| self.get_point(date))
    }
}
