//! BlockFile - random-access reads and writes on one block file.
//!
//! Every series progresses through three header states:
//!
//! ```text
//! absent (0,0) --write_series_header--> header only (1,0) --mark_has_data--> complete (1,1)
//! ```
//!
//! The file handle is held for the lifetime of the value. Call
//! [`BlockFile::close`] to flush and sync; dropping closes without syncing.

use super::catalog::{decode_text, encode_text, HeaderField, SeriesCatalogEntry, TextField};
use super::{BlockLayout, BlockStoreConfig, MainHeader, SearchDirection, SERIES_HEADER_SIZE};
use crate::error::{GridError, Result};
use crate::grid::Period;
use crate::series::TimeSeries;
use chrono::NaiveDateTime;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An open block file.
#[derive(Debug)]
pub struct BlockFile {
    file: File,
    path: PathBuf,
    layout: BlockLayout,
    config: BlockStoreConfig,
}

impl BlockFile {
    /// Creates a block file for `layout`, replacing any existing file.
    ///
    /// The file is sized to its full extent up front, every series' header
    /// flags are zeroed, the main header is written unless disabled, and the
    /// missing value is written at the final series' final point.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn create(path: &Path, layout: BlockLayout, config: BlockStoreConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(layout.total_size())?;

        let mut block_file = Self {
            file,
            path: path.to_path_buf(),
            layout,
            config,
        };

        for series in 0..layout.series_count() {
            block_file.write_flag(series, HeaderField::HasHeader, false)?;
            block_file.write_flag(series, HeaderField::HasData, false)?;
        }
        if block_file.config.write_header {
            block_file.write_header()?;
        }
        if let Some(last) = layout.series_count().checked_sub(1) {
            let missing = block_file.config.missing_value;
            block_file.set_value(last, layout.period().end(), missing)?;
        }

        debug!(
            "Created block file {} ({} series, {} bytes)",
            path.display(),
            layout.series_count(),
            layout.total_size()
        );
        Ok(block_file)
    }

    /// Opens an existing block file.
    ///
    /// The interval and period come from the main header; the series count
    /// is derived from the file length.
    ///
    /// # Errors
    ///
    /// Returns `GridError::UnsupportedVersion` for a foreign header and
    /// `GridError::CorruptLayout` if the length is not a whole number of series.
    pub fn open(path: &Path, config: BlockStoreConfig) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(!config.read_only)
            .open(path)?;
        let file_size = file.metadata()?.len();

        let header = MainHeader::read_from(&mut file)?;
        let probe = BlockLayout::for_period(header.period, 1);
        let per_series = SERIES_HEADER_SIZE as u64 + probe.subperiod_count() * probe.block_size();
        let body = file_size - super::MAIN_HEADER_SIZE as u64;
        if body % per_series != 0 {
            warn!(
                "Block file {} has {} bytes, not a whole number of {}-byte series",
                path.display(),
                file_size,
                per_series
            );
            return Err(GridError::CorruptLayout(format!(
                "file size {} does not match series size {}",
                file_size, per_series
            )));
        }

        let layout = BlockLayout::for_period(header.period, (body / per_series) as usize);
        debug!(
            "Opened block file {} ({} series, interval {})",
            path.display(),
            layout.series_count(),
            layout.interval()
        );
        Ok(Self {
            file,
            path: path.to_path_buf(),
            layout,
            config,
        })
    }

    /// Returns the path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file geometry.
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// Returns the missing-value sentinel.
    pub fn missing_value(&self) -> f64 {
        self.config.missing_value
    }

    /// Returns the current cursor position.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    /// Flushes and syncs the file, releasing the handle.
    pub fn close(mut self) -> Result<()> {
        self.file.flush()?;
        if !self.config.read_only {
            self.file.sync_all()?;
        }
        debug!("Closed block file {}", self.path.display());
        Ok(())
    }

    fn check_series(&self, series: usize) -> Result<()> {
        if series >= self.layout.series_count() {
            return Err(GridError::SeriesIndexOutOfRange {
                index: series,
                count: self.layout.series_count(),
            });
        }
        Ok(())
    }

    fn seek_field(&mut self, series: usize, field: HeaderField) -> Result<()> {
        let offset = self
            .layout
            .field_offset(field, series)
            .ok_or(GridError::SeriesIndexOutOfRange {
                index: series,
                count: self.layout.series_count(),
            })?;
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Writes the main header (version, interval and period).
    pub fn write_header(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        MainHeader::new(*self.layout.period()).write_to(&mut self.file)
    }

    fn write_flag(&mut self, series: usize, field: HeaderField, set: bool) -> Result<()> {
        self.seek_field(series, field)?;
        self.file.write_all(&i32::from(set).to_be_bytes())?;
        Ok(())
    }

    fn read_flag(&mut self, series: usize, field: HeaderField) -> Result<bool> {
        self.seek_field(series, field)?;
        let mut buf = [0u8; 4];
        self.file.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf) != 0)
    }

    /// Returns true once the series' header has been written.
    pub fn has_header(&mut self, series: usize) -> Result<bool> {
        self.read_flag(series, HeaderField::HasHeader)
    }

    /// Returns true once the series' data has been marked complete.
    pub fn has_data(&mut self, series: usize) -> Result<bool> {
        self.read_flag(series, HeaderField::HasData)
    }

    /// Marks the series' data as written.
    pub fn mark_has_data(&mut self, series: usize) -> Result<()> {
        self.write_flag(series, HeaderField::HasData, true)
    }

    /// Writes a series header and sets its has-header flag.
    ///
    /// The has-data flag and the entry's own flag fields are left untouched.
    pub fn write_series_header(&mut self, series: usize, entry: &SeriesCatalogEntry) -> Result<()> {
        self.write_flag(series, HeaderField::HasHeader, true)?;
        self.write_text(series, TextField::Identifier, &entry.identifier)?;

        self.seek_field(series, HeaderField::StartDate)?;
        let mut dates = Vec::with_capacity(2 * super::catalog::DATE_SIZE);
        dates.extend_from_slice(&super::catalog::encode_date(entry.start));
        dates.extend_from_slice(&super::catalog::encode_date(entry.end));
        self.file.write_all(&dates)?;

        self.write_text(series, TextField::Description, &entry.description)?;
        self.write_text(series, TextField::Units, &entry.units)?;
        self.write_text(series, TextField::Alias, &entry.alias)?;
        Ok(())
    }

    /// Reads a full series header record.
    pub fn read_catalog_entry(&mut self, series: usize) -> Result<SeriesCatalogEntry> {
        self.seek_field(series, HeaderField::HasHeader)?;
        SeriesCatalogEntry::read_from(&mut self.file)
    }

    /// Writes a text field, truncating or null-padding to its width.
    pub fn write_text(&mut self, series: usize, field: TextField, text: &str) -> Result<()> {
        self.seek_field(series, field.field())?;
        self.file.write_all(&encode_text(text, field.chars()))?;
        Ok(())
    }

    /// Reads a text field up to its first null.
    ///
    /// The cursor always ends at the end of the field.
    pub fn read_text(&mut self, series: usize, field: TextField) -> Result<String> {
        self.seek_field(series, field.field())?;
        let mut buf = vec![0u8; field.field().width()];
        self.file.read_exact(&mut buf)?;
        Ok(decode_text(&buf))
    }

    /// Finds the first series whose text field equals `query`, ignoring case.
    ///
    /// An empty query never matches; unwritten fields read back empty.
    pub fn index_of(
        &mut self,
        query: &str,
        field: TextField,
        direction: SearchDirection,
    ) -> Result<Option<usize>> {
        if query.is_empty() {
            return Ok(None);
        }
        let query = query.to_lowercase();
        let count = self.layout.series_count();
        let order: Box<dyn Iterator<Item = usize>> = match direction {
            SearchDirection::Forward => Box::new(0..count),
            SearchDirection::Backward => Box::new((0..count).rev()),
        };
        for series in order {
            if self.read_text(series, field)?.to_lowercase() == query {
                return Ok(Some(series));
            }
        }
        Ok(None)
    }

    /// Reads one value; the missing sentinel outside the period.
    pub fn get_value(&mut self, series: usize, point: NaiveDateTime) -> Result<f64> {
        self.check_series(series)?;
        let Some(offset) = self.layout.data_offset(series, point) else {
            return Ok(self.config.missing_value);
        };
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = [0u8; 8];
        self.file.read_exact(&mut buf)?;
        Ok(f64::from_be_bytes(buf))
    }

    /// Writes one value; ignored outside the period.
    pub fn set_value(&mut self, series: usize, point: NaiveDateTime, value: f64) -> Result<()> {
        self.check_series(series)?;
        let Some(offset) = self.layout.data_offset(series, point) else {
            return Ok(());
        };
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a whole series: header, every value of the file period, and the
    /// has-data flag.
    ///
    /// Missing values of the series are stored as this file's sentinel.
    pub fn write_series(&mut self, series: usize, ts: &TimeSeries) -> Result<()> {
        self.check_series(series)?;
        let file_period = *self.layout.period();
        let (start, end) = ts
            .period()
            .map_or((file_period.start(), file_period.end()), |p| (p.start(), p.end()));

        let entry = SeriesCatalogEntry {
            identifier: ts.identifier().to_string(),
            start: Some(start),
            end: Some(end),
            description: ts.description().to_string(),
            units: ts.units().to_string(),
            alias: ts.alias().to_string(),
            ..SeriesCatalogEntry::default()
        };
        self.write_series_header(series, &entry)?;

        let missing = self.config.missing_value;
        for point in file_period.points() {
            let value = ts.get_value(point);
            let value = if ts.is_missing(value) { missing } else { value };
            self.set_value(series, point, value)?;
        }
        self.mark_has_data(series)?;

        debug!(
            "Wrote series {} ({}) to {}",
            series,
            ts.identifier(),
            self.path.display()
        );
        Ok(())
    }

    /// Rebuilds a series from its header and data.
    ///
    /// The series period is the stored one clipped to the file period; a
    /// series without data comes back with every value missing.
    pub fn read_series(&mut self, series: usize) -> Result<TimeSeries> {
        let entry = self.read_catalog_entry(series)?;
        let file_period = *self.layout.period();
        let interval = file_period.interval();

        let mut ts = TimeSeries::new(entry.identifier, interval)
            .with_description(entry.description)
            .with_units(entry.units)
            .with_alias(entry.alias)
            .with_missing_value(self.config.missing_value);

        let requested_start = entry.start.unwrap_or(file_period.start());
        let requested_end = entry.end.unwrap_or(file_period.end());
        let (start, end) = match file_period.overlap(requested_start, requested_end) {
            Some(bounds) => bounds,
            None => {
                warn!(
                    "Series {} in {} spans {}..{}, outside the file period {}..{}; using the file period",
                    series,
                    self.path.display(),
                    requested_start,
                    requested_end,
                    file_period.start(),
                    file_period.end()
                );
                (file_period.start(), file_period.end())
            }
        };
        ts.set_period(start, end)?;
        ts.allocate_data_space()?;

        if entry.has_data {
            let period = Period::new(start, end, interval)?;
            for point in period.points() {
                let value = self.get_value(series, point)?;
                ts.set_value(point, value);
            }
        }
        Ok(ts)
    }
}
