//! # Peak List Export Module
//!
//! Serializes qualified chromatograms into a JSON peak-list document for
//! downstream inspection or peak detection.
//!
//! The document carries provenance (creation timestamp, the construction
//! parameters) alongside the chromatogram list, so a result file is
//! self-describing: per chromatogram its id, representative and average
//! m/z, and the ordered (scan, rt, m/z, intensity) points.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::{BuilderParams, Chromatogram, TracePoint};

/// Peak-list document format version
pub const PEAK_LIST_FORMAT_VERSION: &str = "1.0";

/// Errors that can occur during peak-list export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// I/O error writing the output file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// One chromatogram entry in the peak-list document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakListEntry {
    /// Trace id assigned by the builder
    pub id: u64,
    /// m/z anchor at the end of construction
    pub representative_mz: f64,
    /// Unweighted mean m/z over all points
    pub average_mz: f64,
    /// Number of points
    pub point_count: usize,
    /// Retention-time span from first to last point
    pub rt_span: f64,
    /// The trace's points in scan order
    pub points: Vec<TracePoint>,
}

impl From<&Chromatogram> for PeakListEntry {
    fn from(trace: &Chromatogram) -> Self {
        Self {
            id: trace.id,
            representative_mz: trace.representative_mz,
            average_mz: trace.average_mz(),
            point_count: trace.point_count(),
            rt_span: trace.rt_span(),
            points: trace.points.clone(),
        }
    }
}

/// The complete peak-list document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakListDocument {
    /// Document format version
    pub format_version: String,
    /// RFC 3339 creation timestamp
    pub created: String,
    /// Software that produced the document
    pub software: String,
    /// Construction parameters, for reproducibility
    pub parameters: BuilderParams,
    /// Qualified chromatograms, ascending by id
    pub chromatograms: Vec<PeakListEntry>,
}

impl PeakListDocument {
    /// Assemble a document from construction output
    pub fn new(chromatograms: &[Chromatogram], parameters: BuilderParams) -> Self {
        Self {
            format_version: PEAK_LIST_FORMAT_VERSION.to_string(),
            created: chrono::Utc::now().to_rfc3339(),
            software: format!("mztrace {}", env!("CARGO_PKG_VERSION")),
            parameters,
            chromatograms: chromatograms.iter().map(PeakListEntry::from).collect(),
        }
    }
}

/// Statistics from a completed export
#[derive(Debug, Clone, Copy)]
pub struct ExportStats {
    /// Chromatograms serialized
    pub chromatograms_written: usize,
    /// Total points serialized
    pub points_written: usize,
}

impl std::fmt::Display for ExportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Wrote {} chromatograms ({} data points)",
            self.chromatograms_written, self.points_written
        )
    }
}

/// Write a peak-list document to a file path
pub fn write_peak_list<P: AsRef<Path>>(
    path: P,
    chromatograms: &[Chromatogram],
    parameters: BuilderParams,
) -> Result<ExportStats, ExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let stats = write_peak_list_to(&mut writer, chromatograms, parameters)?;
    writer.flush()?;
    Ok(stats)
}

/// Write a peak-list document to any writer
pub fn write_peak_list_to<W: Write>(
    writer: W,
    chromatograms: &[Chromatogram],
    parameters: BuilderParams,
) -> Result<ExportStats, ExportError> {
    let document = PeakListDocument::new(chromatograms, parameters);
    serde_json::to_writer_pretty(writer, &document)?;

    Ok(ExportStats {
        chromatograms_written: chromatograms.len(),
        points_written: chromatograms.iter().map(|c| c.point_count()).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_chromatograms, BuilderParams};
    use crate::spectrum::ScanBuilder;
    use crate::tolerance::MzTolerance;

    fn sample_chromatograms() -> (Vec<Chromatogram>, BuilderParams) {
        let params =
            BuilderParams::new(10.0, 5.0, 1.5).with_tolerance(MzTolerance::new(0.01, 0.0));
        let scans: Vec<_> = [(0, 0.0, 50.0), (1, 1.0, 60.0), (2, 2.0, 55.0)]
            .iter()
            .map(|&(i, rt, h)| ScanBuilder::new(i, rt).add_point(100.0, h).build())
            .collect();
        (build_chromatograms(&scans, params).unwrap(), params)
    }

    #[test]
    fn test_document_roundtrip() {
        let (chromatograms, params) = sample_chromatograms();

        let mut buffer = Vec::new();
        let stats = write_peak_list_to(&mut buffer, &chromatograms, params).unwrap();
        assert_eq!(stats.chromatograms_written, 1);
        assert_eq!(stats.points_written, 3);

        let document: PeakListDocument = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(document.format_version, PEAK_LIST_FORMAT_VERSION);
        assert_eq!(document.parameters, params);
        assert_eq!(document.chromatograms.len(), 1);

        let entry = &document.chromatograms[0];
        assert_eq!(entry.id, 0);
        assert_eq!(entry.point_count, 3);
        assert_eq!(entry.rt_span, 2.0);
        assert_eq!(entry.representative_mz, 100.0);
        assert_eq!(entry.average_mz, 100.0);
    }

    #[test]
    fn test_empty_result_exports_empty_list() {
        let params = BuilderParams::new(10.0, 5.0, 1.5);
        let mut buffer = Vec::new();
        let stats = write_peak_list_to(&mut buffer, &[], params).unwrap();
        assert_eq!(stats.chromatograms_written, 0);

        let document: PeakListDocument = serde_json::from_slice(&buffer).unwrap();
        assert!(document.chromatograms.is_empty());
    }
}
