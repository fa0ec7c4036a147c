//! tsgrid - storage and addressing for regular-interval time series
//!
//! This crate provides the storage layer that series readers and writers
//! build on.
//!
//! # Components
//!
//! - [`grid::addressing`]: Point-in-time to (subperiod, day, slot) mapping
//! - [`SeriesStore`]: Period-exact in-memory values and flags
//! - [`grid::resize`]: Rebuilds a store for a new period, keeping the overlap
//! - [`TimeSeries`]: A series with its identifier, units and alias
//! - [`BlockFile`]: Fixed-layout random-access file holding N series
//!
//! # Example
//!
//! ```rust,ignore
//! use tsgrid::{BlockFile, BlockLayout, BlockStoreConfig, TimeInterval, TimeSeries};
//!
//! let mut ts = TimeSeries::new("GAGE.USGS.Streamflow.Month", TimeInterval::monthly());
//! ts.set_period(start, end)?;
//! ts.allocate_data_space()?;
//! ts.set_value(start, 12.5);
//!
//! let layout = BlockLayout::new(TimeInterval::monthly(), start, end, 3)?;
//! let mut file = BlockFile::create(path, layout, BlockStoreConfig::default())?;
//! file.write_series(0, &ts)?;
//! file.close()?;
//! ```

#![deny(missing_docs)]

pub mod block;
pub mod error;
pub mod grid;
pub mod series;

pub use block::{
    BlockFile, BlockLayout, BlockStoreConfig, HeaderField, SearchDirection, SeriesCatalogEntry,
    TextField,
};
pub use error::{GridError, Result};
pub use grid::{DataPoint, IntervalBase, Period, SeriesStore, TimeInterval};
pub use series::TimeSeries;
