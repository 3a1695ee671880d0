//! # Scan Data Model
//!
//! Types describing the input to chromatogram construction: centroided
//! data points and the scans that contain them.
//!
//! Scans are produced externally (file readers, instrument bridges) and are
//! read-only to the trace builder. A scan's points are expected to be sorted
//! by ascending m/z; [`ScanBuilder`] enforces this on `build()`.

use serde::{Deserialize, Serialize};

/// A single centroided measurement: one (m/z, intensity) pair.
///
/// Immutable once produced by a scan. Intensities are stored as `f64` to
/// match the precision of the upstream mass detection step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Mass-to-charge ratio
    pub mz: f64,
    /// Signal intensity
    pub intensity: f64,
}

impl DataPoint {
    /// Create a new data point
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

/// One mass spectrum captured at a single retention time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    /// Position in the acquisition sequence (0-indexed, strictly increasing)
    pub index: usize,

    /// Retention time, strictly increasing with `index`. Units are whatever
    /// the source produced (typically seconds or minutes); `min_scan_span`
    /// must use the same units.
    pub retention_time: f64,

    /// Centroided data points, sorted by ascending m/z
    pub points: Vec<DataPoint>,
}

impl Scan {
    /// Create a scan from points that are already sorted by ascending m/z
    pub fn new(index: usize, retention_time: f64, points: Vec<DataPoint>) -> Self {
        debug_assert!(
            points.windows(2).all(|w| w[0].mz <= w[1].mz),
            "scan points must be sorted by ascending m/z"
        );
        Self {
            index,
            retention_time,
            points,
        }
    }

    /// Number of data points in this scan
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Summed intensity over all points (total ion current)
    pub fn total_ion_current(&self) -> f64 {
        self.points.iter().map(|p| p.intensity).sum()
    }

    /// The most intense point in the scan, if any
    pub fn base_peak(&self) -> Option<DataPoint> {
        self.points
            .iter()
            .copied()
            .reduce(|best, p| if p.intensity > best.intensity { p } else { best })
    }
}

/// Builder for constructing scans incrementally.
///
/// Sorts the accumulated points by m/z on `build()`, so callers can append
/// points in any order.
///
/// # Example
///
/// ```rust
/// use mztrace::spectrum::ScanBuilder;
///
/// let scan = ScanBuilder::new(0, 12.5)
///     .add_point(500.1, 3_000.0)
///     .add_point(400.2, 10_000.0)
///     .build();
///
/// assert_eq!(scan.point_count(), 2);
/// assert_eq!(scan.points[0].mz, 400.2);
/// ```
#[derive(Debug, Clone)]
pub struct ScanBuilder {
    index: usize,
    retention_time: f64,
    points: Vec<DataPoint>,
}

impl ScanBuilder {
    /// Start a new scan at the given acquisition index and retention time
    pub fn new(index: usize, retention_time: f64) -> Self {
        Self {
            index,
            retention_time,
            points: Vec::new(),
        }
    }

    /// Append a single (m/z, intensity) point
    pub fn add_point(mut self, mz: f64, intensity: f64) -> Self {
        self.points.push(DataPoint::new(mz, intensity));
        self
    }

    /// Append a batch of points
    pub fn points(mut self, points: Vec<DataPoint>) -> Self {
        self.points.extend(points);
        self
    }

    /// Finalize the scan, sorting points by ascending m/z
    pub fn build(mut self) -> Scan {
        self.points
            .sort_by(|a, b| a.mz.partial_cmp(&b.mz).unwrap_or(std::cmp::Ordering::Equal));
        Scan {
            index: self.index,
            retention_time: self.retention_time,
            points: self.points,
        }
    }
}
