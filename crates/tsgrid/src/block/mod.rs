//! Fixed-layout binary block files holding many series of one interval.
//!
//! ## File Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Main Header (136 bytes)                                     │
//! │  - Version text: 40 UTF-16 BE units (80 bytes)               │
//! │  - Interval base code: i32 (4 bytes)                         │
//! │  - Interval multiplier: i32 (4 bytes)                        │
//! │  - Start date: 6 × i32 (24 bytes)                            │
//! │  - End date: 6 × i32 (24 bytes)                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Series Headers (N × 560 bytes)                              │
//! │  - See [`SeriesCatalogEntry`]                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Data Region                                                 │
//! │  - For each subperiod: one block per series, f64 BE values   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! N, the interval and the period are fixed when the file is created.

pub mod catalog;
pub mod file;
pub mod layout;

pub use catalog::{HeaderField, SeriesCatalogEntry, TextField, SERIES_HEADER_SIZE};
pub use file::BlockFile;
pub use layout::BlockLayout;

use crate::error::{GridError, Result};
use crate::grid::{Period, TimeInterval, DEFAULT_MISSING_VALUE};
use catalog::{decode_date, decode_text, encode_date, encode_text, DATE_SIZE};
use std::io::{Read, Write};

/// Version marker written at the start of every block file.
pub const FORMAT_VERSION: &str = "tsgrid block file 1.0";

/// Character budget of the version marker.
pub const VERSION_CHARS: usize = 40;

/// Main header size in bytes.
pub const MAIN_HEADER_SIZE: usize = VERSION_CHARS * catalog::BYTES_PER_CHAR + 4 + 4 + 2 * DATE_SIZE;

/// Bytes per stored value.
pub const VALUE_SIZE: usize = 8;

/// Direction of a linear catalog scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDirection {
    /// From the first series to the last.
    #[default]
    Forward,
    /// From the last series to the first.
    Backward,
}

/// Configuration for opening or creating block files.
#[derive(Debug, Clone)]
pub struct BlockStoreConfig {
    /// Sentinel returned for reads outside the period.
    pub missing_value: f64,
    /// Whether [`BlockFile::create`] writes the main header.
    pub write_header: bool,
    /// Whether [`BlockFile::open`] opens the file read-only.
    pub read_only: bool,
}

impl Default for BlockStoreConfig {
    fn default() -> Self {
        Self {
            missing_value: DEFAULT_MISSING_VALUE,
            write_header: true,
            read_only: false,
        }
    }
}

impl BlockStoreConfig {
    /// Creates a new configuration with a custom missing value.
    pub fn with_missing_value(mut self, missing_value: f64) -> Self {
        self.missing_value = missing_value;
        self
    }

    /// Creates a new configuration that controls main header writing.
    pub fn with_write_header(mut self, write_header: bool) -> Self {
        self.write_header = write_header;
        self
    }

    /// Creates a new configuration for read-only access.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// Main header of a block file (136 bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct MainHeader {
    /// Version marker text.
    pub version: String,
    /// Shared interval and period of every series in the file.
    pub period: Period,
}

impl MainHeader {
    /// Creates a header carrying the current format version.
    pub fn new(period: Period) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            period,
        }
    }

    /// Writes the header using big-endian byte order.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let interval = self.period.interval();
        let mut buf = Vec::with_capacity(MAIN_HEADER_SIZE);
        // Version (80 bytes)
        buf.extend_from_slice(&encode_text(&self.version, VERSION_CHARS));
        // Interval base and multiplier (4 + 4 bytes)
        buf.extend_from_slice(&interval.base().code().to_be_bytes());
        buf.extend_from_slice(&(interval.multiplier() as i32).to_be_bytes());
        // Start and end dates (24 + 24 bytes)
        buf.extend_from_slice(&encode_date(Some(self.period.start())));
        buf.extend_from_slice(&encode_date(Some(self.period.end())));
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Reads a header using big-endian byte order.
    ///
    /// # Errors
    ///
    /// Returns `GridError::UnsupportedVersion` for an unknown version marker
    /// and `GridError::CorruptLayout` for unreadable dates.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; MAIN_HEADER_SIZE];
        reader.read_exact(&mut buf)?;

        let version_end = VERSION_CHARS * catalog::BYTES_PER_CHAR;
        let version = decode_text(&buf[..version_end]);
        if version != FORMAT_VERSION {
            return Err(GridError::UnsupportedVersion(version));
        }

        let int_at = |at: usize| i32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        let interval = TimeInterval::from_codes(int_at(version_end), int_at(version_end + 4))?;

        let dates_at = version_end + 8;
        let start = decode_date(&buf[dates_at..dates_at + DATE_SIZE])
            .ok_or_else(|| GridError::CorruptLayout("invalid start date in main header".to_string()))?;
        let end = decode_date(&buf[dates_at + DATE_SIZE..dates_at + 2 * DATE_SIZE])
            .ok_or_else(|| GridError::CorruptLayout("invalid end date in main header".to_string()))?;

        Ok(Self {
            version,
            period: Period::new(start, end, interval)?,
        })
    }
}
