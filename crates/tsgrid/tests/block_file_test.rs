//! Integration tests for the block file format.

use chrono::{NaiveDate, NaiveDateTime};
use tsgrid::block::{MAIN_HEADER_SIZE, SERIES_HEADER_SIZE};
use tsgrid::{
    BlockFile, BlockLayout, BlockStoreConfig, GridError, HeaderField, IntervalBase,
    SearchDirection, SeriesCatalogEntry, TextField, TimeInterval, TimeSeries,
};
use tempfile::TempDir;

fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

/// Helper building an hourly series with a recognisable value per point.
fn hourly_series(identifier: &str, start: NaiveDateTime, end: NaiveDateTime, offset: f64) -> TimeSeries {
    let interval = TimeInterval::new(IntervalBase::Hour, 6).unwrap();
    let mut ts = TimeSeries::new(identifier, interval)
        .with_description("Reservoir elevation")
        .with_units("FT")
        .with_alias(identifier.to_lowercase());
    ts.set_period(start, end).unwrap();
    ts.allocate_data_space().unwrap();
    let points: Vec<_> = ts.period().unwrap().points().collect();
    for (i, point) in points.into_iter().enumerate() {
        ts.set_value(point, offset + i as f64 * 0.25);
    }
    ts
}

#[test]
fn test_monthly_byte_layout() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("monthly.tsb");

    let layout = BlockLayout::new(TimeInterval::monthly(), dt(2000, 1, 1, 0), dt(2000, 12, 1, 0), 3).unwrap();
    {
        let mut file = BlockFile::create(&file_path, layout, BlockStoreConfig::default()).unwrap();
        file.set_value(1, dt(2000, 3, 1, 0), 42.5).unwrap();
        file.close().unwrap();
    }

    let contents = std::fs::read(&file_path).unwrap();
    assert_eq!(MAIN_HEADER_SIZE, 136);
    assert_eq!(SERIES_HEADER_SIZE, 560);
    assert_eq!(contents.len() as u64, layout.total_size());
    assert_eq!(&contents[1872..1880], &42.5f64.to_be_bytes());
    // Interval base code and multiplier follow the 80-byte version text.
    assert_eq!(&contents[80..84], &60i32.to_be_bytes());
    assert_eq!(&contents[84..88], &1i32.to_be_bytes());
}

#[test]
fn test_write_read_series_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("hourly.tsb");

    let start = dt(2001, 1, 30, 0);
    let end = dt(2001, 3, 2, 18);
    let first = hourly_series("RES1.Elev", start, end, 100.0);
    let second = hourly_series("RES2.Elev", dt(2001, 2, 1, 6), dt(2001, 2, 10, 0), 200.0);

    let interval = first.interval();
    let layout = BlockLayout::new(interval, start, end, 2).unwrap();
    {
        let mut file = BlockFile::create(&file_path, layout, BlockStoreConfig::default()).unwrap();
        file.write_series(0, &first).unwrap();
        file.write_series(1, &second).unwrap();
        file.close().unwrap();
    }

    let mut file = BlockFile::open(&file_path, BlockStoreConfig::default().with_read_only(true)).unwrap();
    assert_eq!(file.layout().series_count(), 2);
    assert_eq!(file.layout().interval(), interval);

    let read_first = file.read_series(0).unwrap();
    assert_eq!(read_first.identifier(), "RES1.Elev");
    assert_eq!(read_first.units(), "FT");
    assert_eq!(read_first.description(), "Reservoir elevation");
    let original: Vec<_> = first.iter().collect();
    let restored: Vec<_> = read_first.iter().collect();
    assert_eq!(original, restored);

    let read_second = file.read_series(1).unwrap();
    let period = read_second.period().unwrap();
    assert_eq!(period.start(), dt(2001, 2, 1, 6));
    assert_eq!(period.end(), dt(2001, 2, 10, 0));
    assert_eq!(read_second.get_value(dt(2001, 2, 1, 6)), 200.0);

    // Outside series 1's own period the file holds the sentinel.
    assert_eq!(file.get_value(1, dt(2001, 1, 30, 0)).unwrap(), -999.0);
}

#[test]
fn test_catalog_entries() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("catalog.tsb");

    let layout = BlockLayout::new(TimeInterval::daily(), dt(2000, 1, 1, 0), dt(2000, 12, 31, 0), 4).unwrap();
    let mut file = BlockFile::create(&file_path, layout, BlockStoreConfig::default()).unwrap();

    for (series, alias) in ["inflow", "OUTFLOW", "storage"].iter().enumerate() {
        let mut entry = SeriesCatalogEntry::new(format!("RES.{alias}"), dt(2000, 1, 1, 0), dt(2000, 12, 31, 0));
        entry.units = "ACFT-and-a-very-long-unit".to_string();
        entry.alias = alias.to_string();
        file.write_series_header(series, &entry).unwrap();
    }

    let entry = file.read_catalog_entry(1).unwrap();
    assert!(entry.has_header);
    assert!(!entry.has_data);
    assert_eq!(entry.identifier, "RES.OUTFLOW");
    assert_eq!(entry.units, "ACFT-and-a-v");
    assert_eq!(entry.start, Some(dt(2000, 1, 1, 0)));

    let untouched = file.read_catalog_entry(3).unwrap();
    assert_eq!(untouched, SeriesCatalogEntry::default());

    assert_eq!(
        file.index_of("outflow", TextField::Alias, SearchDirection::Forward).unwrap(),
        Some(1)
    );
    assert_eq!(
        file.index_of("STORAGE", TextField::Alias, SearchDirection::Backward).unwrap(),
        Some(2)
    );
    assert_eq!(
        file.index_of("res.inflow", TextField::Identifier, SearchDirection::Forward).unwrap(),
        Some(0)
    );
    assert_eq!(file.index_of("spill", TextField::Alias, SearchDirection::Forward).unwrap(), None);
}

#[test]
fn test_index_of_direction_picks_nearest_match() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("dupes.tsb");

    let layout = BlockLayout::new(TimeInterval::yearly(), dt(1990, 1, 1, 0), dt(1999, 1, 1, 0), 3).unwrap();
    let mut file = BlockFile::create(&file_path, layout, BlockStoreConfig::default()).unwrap();
    file.write_text(0, TextField::Alias, "dup").unwrap();
    file.write_text(2, TextField::Alias, "DUP").unwrap();

    assert_eq!(file.index_of("Dup", TextField::Alias, SearchDirection::Forward).unwrap(), Some(0));
    assert_eq!(file.index_of("Dup", TextField::Alias, SearchDirection::Backward).unwrap(), Some(2));
}

#[test]
fn test_text_read_advances_full_field() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("text.tsb");

    let layout = BlockLayout::new(TimeInterval::monthly(), dt(2000, 1, 1, 0), dt(2000, 12, 1, 0), 3).unwrap();
    let mut file = BlockFile::create(&file_path, layout, BlockStoreConfig::default()).unwrap();

    file.write_text(2, TextField::Alias, "ABC").unwrap();
    let text = file.read_text(2, TextField::Alias).unwrap();
    assert_eq!(text, "ABC");

    let field_start = layout.field_offset(HeaderField::Alias, 2).unwrap();
    assert_eq!(file.position().unwrap(), field_start + 160);
}

#[test]
fn test_idempotent_value_write() {
    let temp_dir = TempDir::new().unwrap();
    let once_path = temp_dir.path().join("once.tsb");
    let twice_path = temp_dir.path().join("twice.tsb");

    let layout = BlockLayout::new(TimeInterval::daily(), dt(2000, 1, 1, 0), dt(2000, 3, 31, 0), 2).unwrap();
    {
        let mut once = BlockFile::create(&once_path, layout, BlockStoreConfig::default()).unwrap();
        once.set_value(1, dt(2000, 2, 29, 0), 3.75).unwrap();
        once.close().unwrap();

        let mut twice = BlockFile::create(&twice_path, layout, BlockStoreConfig::default()).unwrap();
        twice.set_value(1, dt(2000, 2, 29, 0), 3.75).unwrap();
        twice.set_value(1, dt(2000, 2, 29, 0), 3.75).unwrap();
        twice.close().unwrap();
    }

    assert_eq!(std::fs::read(&once_path).unwrap(), std::fs::read(&twice_path).unwrap());
}

#[test]
fn test_open_rejects_truncated_file() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("truncated.tsb");

    let layout = BlockLayout::new(TimeInterval::monthly(), dt(2000, 1, 1, 0), dt(2000, 12, 1, 0), 2).unwrap();
    BlockFile::create(&file_path, layout, BlockStoreConfig::default())
        .unwrap()
        .close()
        .unwrap();

    let mut contents = std::fs::read(&file_path).unwrap();
    contents.truncate(contents.len() - 8);
    std::fs::write(&file_path, &contents).unwrap();

    let result = BlockFile::open(&file_path, BlockStoreConfig::default());
    assert!(matches!(result, Err(GridError::CorruptLayout(_))));
}

#[test]
fn test_open_without_main_header_fails() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("headerless.tsb");

    let layout = BlockLayout::new(TimeInterval::monthly(), dt(2000, 1, 1, 0), dt(2000, 12, 1, 0), 1).unwrap();
    let config = BlockStoreConfig::default().with_write_header(false);
    BlockFile::create(&file_path, layout, config).unwrap().close().unwrap();

    let result = BlockFile::open(&file_path, BlockStoreConfig::default());
    assert!(matches!(result, Err(GridError::UnsupportedVersion(_))));
}

#[test]
fn test_reading_past_extent_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("short.tsb");

    let layout = BlockLayout::new(TimeInterval::monthly(), dt(2000, 1, 1, 0), dt(2000, 12, 1, 0), 2).unwrap();
    let mut file = BlockFile::create(&file_path, layout, BlockStoreConfig::default()).unwrap();

    // Chop the data region out from under the open handle.
    std::fs::OpenOptions::new()
        .write(true)
        .open(&file_path)
        .unwrap()
        .set_len(layout.data_region_offset())
        .unwrap();

    let result = file.get_value(1, dt(2000, 12, 1, 0));
    assert!(matches!(result, Err(GridError::Io(_))));
}
