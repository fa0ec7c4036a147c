//! Rebuilding a store for a new period of record.

use super::{Period, SeriesStore};
use crate::error::{GridError, Result};
use chrono::NaiveDateTime;
use tracing::debug;

/// Returns a store covering the new period, keeping values where the old and
/// new periods overlap.
///
/// A missing bound defaults to the old period's bound. When the resulting
/// period equals the old one, the old store is returned unchanged. Otherwise a
/// fresh store is allocated and the overlap is copied point by point, flags
/// included. Values outside the new period are dropped for good.
///
/// # Errors
///
/// Returns `GridError::MissingBound` if neither bound is supplied, or
/// `GridError::InvalidPeriod` if the new end is before the new start.
pub fn resize(
    store: SeriesStore,
    new_start: Option<NaiveDateTime>,
    new_end: Option<NaiveDateTime>,
) -> Result<SeriesStore> {
    if new_start.is_none() && new_end.is_none() {
        return Err(GridError::MissingBound);
    }

    let old_period = *store.period();
    let new_period = Period::new(
        new_start.unwrap_or(old_period.start()),
        new_end.unwrap_or(old_period.end()),
        old_period.interval(),
    )?;
    if new_period == old_period {
        return Ok(store);
    }

    let mut resized = SeriesStore::new(new_period, store.missing_value(), store.has_flags());

    let Some((from, to)) = old_period.overlap(new_period.start(), new_period.end()) else {
        debug!(
            "No overlap between {}..{} and {}..{}, nothing transferred",
            old_period.start(),
            old_period.end(),
            new_period.start(),
            new_period.end()
        );
        return Ok(resized);
    };

    let mut transferred = 0usize;
    for point in super::PeriodPoints::new(from, to, old_period.interval()) {
        let value = store.get(point);
        match store.get_flag(point) {
            Some(flag) if !flag.is_empty() => resized.set_flagged(point, value, flag),
            _ => resized.set(point, value),
        }
        transferred += 1;
    }
    debug!("Transferred {} points into resized period {}..{}", transferred, from, to);

    Ok(resized)
}
