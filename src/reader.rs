//! # Scan Reader Module
//!
//! Reads centroided scan data from delimited text files into [`Scan`]s, the
//! input format of the chromatogram builder.
//!
//! The expected layout is one data point per row with a header naming at
//! least the `scan`, `rt`, `mz`, and `intensity` columns (case-insensitive;
//! extra columns are ignored). Consecutive rows sharing a `scan` value form
//! one scan; points are sorted by m/z within each scan.
//!
//! The reader deliberately does not check retention-time monotonicity —
//! that contract belongs to the builder, which reports
//! [`OutOfOrderScan`](crate::builder::BuilderError::OutOfOrderScan) at the
//! offending scan, keeping order validation in one place.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::debug;

use crate::spectrum::{Scan, ScanBuilder};

/// Errors that can occur while reading scan input
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// I/O error reading the input file
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV/TSV parsing error
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    /// A required column is absent from the header row
    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),

    /// A field failed to parse or is non-finite
    #[error("Invalid {column} value {value:?} on line {line}")]
    InvalidValue {
        /// Column the bad field belongs to
        column: &'static str,
        /// The raw field text
        value: String,
        /// 1-based line number (header included)
        line: u64,
    },
}

/// Column positions resolved from the header row
struct ColumnIndex {
    scan: usize,
    rt: usize,
    mz: usize,
    intensity: usize,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, ReaderError> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let find = |names: &[&str], label: &'static str| {
            normalized
                .iter()
                .position(|h| names.contains(&h.as_str()))
                .ok_or(ReaderError::MissingColumn(label))
        };

        Ok(Self {
            scan: find(&["scan", "scan_index", "scan_number"], "scan")?,
            rt: find(&["rt", "retention_time", "retention time"], "rt")?,
            mz: find(&["mz", "m/z"], "mz")?,
            intensity: find(&["intensity", "int"], "intensity")?,
        })
    }
}

/// Read scans from a file path, inferring the delimiter from the extension
/// (`.csv` = comma, anything else = tab).
pub fn read_scans<P: AsRef<Path>>(path: P) -> Result<Vec<Scan>, ReaderError> {
    let path = path.as_ref();
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => b',',
        _ => b'\t',
    };
    let file = File::open(path)?;
    let scans = read_scans_from(BufReader::new(file), delimiter)?;
    debug!(
        "Read {} scans ({} points) from {}",
        scans.len(),
        scans.iter().map(|s| s.point_count()).sum::<usize>(),
        path.display()
    );
    Ok(scans)
}

/// Read scans from any reader with an explicit delimiter
pub fn read_scans_from<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Scan>, ReaderError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = ColumnIndex::resolve(csv_reader.headers()?)?;

    let mut scans: Vec<Scan> = Vec::new();
    let mut current: Option<ScanBuilder> = None;
    let mut current_scan: Option<usize> = None;

    for record in csv_reader.records() {
        let record = record?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(0);

        let scan_index: usize = parse_field(&record, columns.scan, "scan", line)?;
        let rt: f64 = parse_finite(&record, columns.rt, "rt", line)?;
        let mz: f64 = parse_finite(&record, columns.mz, "mz", line)?;
        let intensity: f64 = parse_finite(&record, columns.intensity, "intensity", line)?;

        if current_scan != Some(scan_index) {
            if let Some(builder) = current.take() {
                scans.push(builder.build());
            }
            current = Some(ScanBuilder::new(scan_index, rt));
            current_scan = Some(scan_index);
        }

        current = current.map(|b| b.add_point(mz, intensity));
    }

    if let Some(builder) = current {
        scans.push(builder.build());
    }

    Ok(scans)
}

fn parse_field(
    record: &csv::StringRecord,
    index: usize,
    column: &'static str,
    line: u64,
) -> Result<usize, ReaderError> {
    let raw = record.get(index).unwrap_or("");
    raw.parse().map_err(|_| ReaderError::InvalidValue {
        column,
        value: raw.to_string(),
        line,
    })
}

fn parse_finite(
    record: &csv::StringRecord,
    index: usize,
    column: &'static str,
    line: u64,
) -> Result<f64, ReaderError> {
    let raw = record.get(index).unwrap_or("");
    let value: f64 = raw.parse().map_err(|_| ReaderError::InvalidValue {
        column,
        value: raw.to_string(),
        line,
    })?;
    if !value.is_finite() {
        return Err(ReaderError::InvalidValue {
            column,
            value: raw.to_string(),
            line,
        });
    }
    Ok(value)
}
