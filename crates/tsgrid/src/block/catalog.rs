//! Per-series header records of a block file.
//!
//! ## Record Layout (560 bytes)
//!
//! ```text
//! Offset  Size    Field
//! ------  ----    -----
//! 0       4       has_header (i32 BE, 0 or 1)
//! 4       4       has_data (i32 BE, 0 or 1)
//! 8       160     identifier (80 UTF-16 BE units, null padded)
//! 168     24      start date (6 × i32 BE)
//! 192     24      end date (6 × i32 BE)
//! 216     160     description (80 units)
//! 376     24      units (12 units)
//! 400     160     alias (80 units)
//! ```

use crate::error::Result;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::io::{Read, Write};
use tracing::debug;

/// Bytes per stored text character.
pub const BYTES_PER_CHAR: usize = 2;

/// Bytes per stored date (year, month, day, hour, minute, second).
pub const DATE_SIZE: usize = 6 * 4;

/// Size of one per-series header record.
pub const SERIES_HEADER_SIZE: usize = 560;

/// Fields of a per-series header record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    /// Header-written flag.
    HasHeader,
    /// Data-written flag.
    HasData,
    /// Series identifier.
    Identifier,
    /// First date of the series.
    StartDate,
    /// Last date of the series.
    EndDate,
    /// Free-form description.
    Description,
    /// Data units.
    Units,
    /// Short alias.
    Alias,
}

impl HeaderField {
    /// Byte offset of the field within its record.
    pub const fn offset(self) -> usize {
        match self {
            Self::HasHeader => 0,
            Self::HasData => 4,
            Self::Identifier => 8,
            Self::StartDate => 168,
            Self::EndDate => 168 + DATE_SIZE,
            Self::Description => 216,
            Self::Units => 376,
            Self::Alias => 400,
        }
    }

    /// Width of the field in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::HasHeader | Self::HasData => 4,
            Self::StartDate | Self::EndDate => DATE_SIZE,
            Self::Identifier => TextField::Identifier.chars() * BYTES_PER_CHAR,
            Self::Description => TextField::Description.chars() * BYTES_PER_CHAR,
            Self::Units => TextField::Units.chars() * BYTES_PER_CHAR,
            Self::Alias => TextField::Alias.chars() * BYTES_PER_CHAR,
        }
    }
}

/// Text fields of a per-series header record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    /// Series identifier (80 characters).
    Identifier,
    /// Description (80 characters).
    Description,
    /// Units (12 characters).
    Units,
    /// Alias (80 characters).
    Alias,
}

impl TextField {
    /// Character budget of the field.
    pub const fn chars(self) -> usize {
        match self {
            Self::Identifier | Self::Description | Self::Alias => 80,
            Self::Units => 12,
        }
    }

    /// The record field this text occupies.
    pub const fn field(self) -> HeaderField {
        match self {
            Self::Identifier => HeaderField::Identifier,
            Self::Description => HeaderField::Description,
            Self::Units => HeaderField::Units,
            Self::Alias => HeaderField::Alias,
        }
    }
}

/// Encodes text into a fixed-width field, truncating or null-padding.
pub fn encode_text(text: &str, chars: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(chars * BYTES_PER_CHAR);
    let mut written = 0;
    for unit in text.encode_utf16() {
        if written == chars {
            debug!("Truncated {:?} to {} characters", text, chars);
            break;
        }
        buf.extend_from_slice(&unit.to_be_bytes());
        written += 1;
    }
    buf.resize(chars * BYTES_PER_CHAR, 0);
    buf
}

/// Decodes a fixed-width text field up to its first null.
pub fn decode_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(BYTES_PER_CHAR)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Encodes a date as six big-endian integers; `None` is all zeros.
pub fn encode_date(date: Option<NaiveDateTime>) -> [u8; DATE_SIZE] {
    let fields = date.map_or([0; 6], |d| {
        [
            d.year(),
            d.month() as i32,
            d.day() as i32,
            d.hour() as i32,
            d.minute() as i32,
            d.second() as i32,
        ]
    });
    let mut buf = [0u8; DATE_SIZE];
    for (chunk, value) in buf.chunks_exact_mut(4).zip(fields) {
        chunk.copy_from_slice(&value.to_be_bytes());
    }
    buf
}

/// Decodes six big-endian integers; invalid or zero dates yield `None`.
pub fn decode_date(bytes: &[u8]) -> Option<NaiveDateTime> {
    let mut fields = [0i32; 6];
    for (value, chunk) in fields.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    let [year, month, day, hour, minute, second] = fields;
    let component = |v: i32| u32::try_from(v).ok();
    NaiveDate::from_ymd_opt(year, component(month)?, component(day)?)?.and_hms_opt(
        component(hour)?,
        component(minute)?,
        component(second)?,
    )
}

fn field_bytes(record: &[u8], field: HeaderField) -> &[u8] {
    &record[field.offset()..field.offset() + field.width()]
}

/// Decoded per-series header record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesCatalogEntry {
    /// True once the header has been written.
    pub has_header: bool,
    /// True once all data has been written.
    pub has_data: bool,
    /// Series identifier (at most 80 characters are kept).
    pub identifier: String,
    /// First date of the series.
    pub start: Option<NaiveDateTime>,
    /// Last date of the series.
    pub end: Option<NaiveDateTime>,
    /// Description (at most 80 characters are kept).
    pub description: String,
    /// Units (at most 12 characters are kept).
    pub units: String,
    /// Alias (at most 80 characters are kept).
    pub alias: String,
}

impl SeriesCatalogEntry {
    /// Creates an entry with identifier and date bounds.
    pub fn new(identifier: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            identifier: identifier.into(),
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    /// Returns the text of a text field.
    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::Identifier => &self.identifier,
            TextField::Description => &self.description,
            TextField::Units => &self.units,
            TextField::Alias => &self.alias,
        }
    }

    /// Writes the full record.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buf = Vec::with_capacity(SERIES_HEADER_SIZE);
        buf.extend_from_slice(&i32::from(self.has_header).to_be_bytes());
        buf.extend_from_slice(&i32::from(self.has_data).to_be_bytes());
        buf.extend_from_slice(&encode_text(&self.identifier, TextField::Identifier.chars()));
        buf.extend_from_slice(&encode_date(self.start));
        buf.extend_from_slice(&encode_date(self.end));
        buf.extend_from_slice(&encode_text(&self.description, TextField::Description.chars()));
        buf.extend_from_slice(&encode_text(&self.units, TextField::Units.chars()));
        buf.extend_from_slice(&encode_text(&self.alias, TextField::Alias.chars()));
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Reads a full record.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; SERIES_HEADER_SIZE];
        reader.read_exact(&mut buf)?;

        let flag = |field: HeaderField| {
            let bytes = field_bytes(&buf, field);
            i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) != 0
        };

        Ok(Self {
            has_header: flag(HeaderField::HasHeader),
            has_data: flag(HeaderField::HasData),
            identifier: decode_text(field_bytes(&buf, HeaderField::Identifier)),
            start: decode_date(field_bytes(&buf, HeaderField::StartDate)),
            end: decode_date(field_bytes(&buf, HeaderField::EndDate)),
            description: decode_text(field_bytes(&buf, HeaderField::Description)),
            units: decode_text(field_bytes(&buf, HeaderField::Units)),
            alias: decode_text(field_bytes(&buf, HeaderField::Alias)),
        })
    }
}
