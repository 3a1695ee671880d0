//! # Chromatogram Builder
//!
//! The stateful core of the crate: consumes an ordered sequence of scans
//! and produces the mass traces (chromatograms) that survive span
//! qualification.
//!
//! ## Algorithm
//!
//! For every incoming scan, in acquisition order:
//!
//! 1. The scan's points form a pool, initially unclaimed.
//! 2. Every active trace, in ascending trace-id order, looks for its best
//!    match in the still-unclaimed pool using its representative m/z (the
//!    m/z of its most recently appended point). A match at or above the
//!    intensity threshold is claimed and appended; a sub-threshold match is
//!    left in the pool and the trace records a gap for this scan.
//! 3. Every unclaimed point at or above the start intensity seeds a new
//!    trace, in ascending m/z order.
//!
//! Gaps carry no penalty while scans remain: a trace stays active until the
//! series ends, when the span-qualification filter (see [`crate::qualify`])
//! decides whether it is kept or discarded.
//!
//! The ascending-id matching order and the tie-break rules in
//! [`crate::tolerance`] make construction fully deterministic: identical
//! scans and parameters always yield identical chromatograms.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::qualify;
use crate::spectrum::Scan;
use crate::tolerance::{best_candidate, MzTolerance};

/// Errors that can occur during chromatogram construction
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    /// A numeric policy value is negative or non-finite
    #[error("Invalid parameter {name}: {value} (must be finite and >= 0)")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// The rejected value
        value: f64,
    },

    /// The scan sequence violates the acquisition-order contract: both the
    /// scan index and the retention time must strictly increase. The whole
    /// construction is considered failed: later matching depends on
    /// temporal order.
    #[error(
        "Scan {index} (rt {retention_time}) out of order: index and retention \
         time must both increase past scan {previous_index} (rt {previous_retention_time})"
    )]
    OutOfOrderScan {
        /// Acquisition index of the offending scan
        index: usize,
        /// Its retention time
        retention_time: f64,
        /// Index of the previously processed scan
        previous_index: usize,
        /// Retention time of the previously processed scan
        previous_retention_time: f64,
    },
}

/// The four numeric policies governing construction.
///
/// All values are validated before any scan is processed: each must be
/// finite and non-negative, otherwise construction fails with
/// [`BuilderError::InvalidParameter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuilderParams {
    /// m/z equivalence window for matching points across scans
    pub mz_tolerance: MzTolerance,

    /// Points below this intensity never seed a new trace
    pub start_intensity: f64,

    /// Intensity a point needs to extend a trace and to count toward the
    /// minimum scan span
    pub intensity_threshold: f64,

    /// Minimum continuous retention-time span a trace must hold above the
    /// intensity threshold to qualify. Same units as the scans' retention
    /// times.
    pub min_scan_span: f64,
}

impl BuilderParams {
    /// Create a parameter set with the default m/z tolerance (0.001 / 5 ppm)
    pub fn new(start_intensity: f64, intensity_threshold: f64, min_scan_span: f64) -> Self {
        Self {
            mz_tolerance: MzTolerance::default(),
            start_intensity,
            intensity_threshold,
            min_scan_span,
        }
    }

    /// Replace the m/z tolerance
    pub fn with_tolerance(mut self, tolerance: MzTolerance) -> Self {
        self.mz_tolerance = tolerance;
        self
    }

    /// Check every policy value for finiteness and sign
    pub fn validate(&self) -> Result<(), BuilderError> {
        let checks = [
            ("mz_tolerance.absolute", self.mz_tolerance.absolute),
            ("mz_tolerance.ppm", self.mz_tolerance.ppm),
            ("start_intensity", self.start_intensity),
            ("intensity_threshold", self.intensity_threshold),
            ("min_scan_span", self.min_scan_span),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(BuilderError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// One point of a chromatogram: a claimed data point with its scan context
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    /// Acquisition index of the scan the point came from
    pub scan_index: usize,
    /// Retention time of that scan
    pub retention_time: f64,
    /// Matched m/z
    pub mz: f64,
    /// Matched intensity
    pub intensity: f64,
}

/// A mass trace: points across consecutive scans believed to originate from
/// the same ion species.
///
/// Owned exclusively by the builder during construction; ownership passes to
/// the caller on [`ChromatogramBuilder::finish`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chromatogram {
    /// Sequential id, assigned in seeding order
    pub id: u64,

    /// Points in strictly increasing scan-index order, at most one per scan
    pub points: Vec<TracePoint>,

    /// m/z of the most recently appended point. The matching anchor for the
    /// next scan; not an average, so a trace may drift within tolerance but
    /// each hop stays bounded by the window.
    pub representative_mz: f64,
}

impl Chromatogram {
    /// Number of points in the trace
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Retention-time span from first to last point (zero for one point)
    pub fn rt_span(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => last.retention_time - first.retention_time,
            _ => 0.0,
        }
    }

    /// Unweighted mean m/z over all points
    pub fn average_mz(&self) -> f64 {
        if self.points.is_empty() {
            return self.representative_mz;
        }
        self.points.iter().map(|p| p.mz).sum::<f64>() / self.points.len() as f64
    }
}

/// Statistics from a completed construction
#[derive(Debug, Clone, Copy, Default)]
pub struct BuilderStats {
    /// Scans consumed
    pub scans_processed: usize,
    /// Traces seeded over the whole run
    pub traces_started: usize,
    /// Traces that met the span-qualification rule
    pub traces_qualified: usize,
    /// Traces discarded at finalization
    pub traces_discarded: usize,
    /// Data points claimed by some trace
    pub points_assigned: usize,
}

impl std::fmt::Display for BuilderStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Processed {} scans: {} traces started, {} qualified, {} discarded ({} points assigned)",
            self.scans_processed,
            self.traces_started,
            self.traces_qualified,
            self.traces_discarded,
            self.points_assigned
        )
    }
}

/// Streaming chromatogram builder.
///
/// Feed scans one at a time with [`process_scan`](Self::process_scan), then
/// call [`finish`](Self::finish) to obtain the qualified chromatograms. For
/// the common collect-everything case use [`build_chromatograms`].
///
/// # Example
///
/// ```rust
/// use mztrace::builder::{BuilderParams, ChromatogramBuilder};
/// use mztrace::spectrum::ScanBuilder;
///
/// let params = BuilderParams::new(10.0, 5.0, 1.5);
/// let mut builder = ChromatogramBuilder::new(params)?;
///
/// for (i, rt) in [0.0, 1.0, 2.0].iter().enumerate() {
///     let scan = ScanBuilder::new(i, *rt).add_point(422.3, 50.0).build();
///     builder.process_scan(&scan)?;
/// }
///
/// let (chromatograms, stats) = builder.finish();
/// assert_eq!(chromatograms.len(), 1);
/// assert_eq!(stats.scans_processed, 3);
/// # Ok::<(), mztrace::builder::BuilderError>(())
/// ```
pub struct ChromatogramBuilder {
    params: BuilderParams,
    /// Active traces, ascending by id (ids are assigned sequentially and
    /// traces are only ever appended)
    active: Vec<Chromatogram>,
    next_id: u64,
    last_scan: Option<(usize, f64)>,
    stats: BuilderStats,
}

impl ChromatogramBuilder {
    /// Create a builder, validating all parameters up front
    pub fn new(params: BuilderParams) -> Result<Self, BuilderError> {
        params.validate()?;
        Ok(Self {
            params,
            active: Vec::new(),
            next_id: 0,
            last_scan: None,
            stats: BuilderStats::default(),
        })
    }

    /// The parameters this builder was constructed with
    pub fn params(&self) -> &BuilderParams {
        &self.params
    }

    /// Number of traces currently active
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Consume one scan, extending, gapping, and seeding traces.
    ///
    /// Scans must arrive in acquisition order with strictly increasing
    /// retention times, otherwise the construction fails with
    /// [`BuilderError::OutOfOrderScan`].
    pub fn process_scan(&mut self, scan: &Scan) -> Result<(), BuilderError> {
        if let Some((prev_index, prev_rt)) = self.last_scan {
            if scan.index <= prev_index || scan.retention_time <= prev_rt {
                return Err(BuilderError::OutOfOrderScan {
                    index: scan.index,
                    retention_time: scan.retention_time,
                    previous_index: prev_index,
                    previous_retention_time: prev_rt,
                });
            }
        }

        let mut claimed = vec![false; scan.points.len()];
        let mut extended = 0usize;

        // Extend active traces in ascending id order. First claim wins:
        // a claimed point is invisible to later traces in the same scan.
        for trace in &mut self.active {
            let pool = scan
                .points
                .iter()
                .enumerate()
                .filter(|(i, _)| !claimed[*i])
                .map(|(i, p)| (i, *p));

            if let Some((idx, point)) =
                best_candidate(trace.representative_mz, self.params.mz_tolerance, pool)
            {
                if point.intensity >= self.params.intensity_threshold {
                    claimed[idx] = true;
                    trace.points.push(TracePoint {
                        scan_index: scan.index,
                        retention_time: scan.retention_time,
                        mz: point.mz,
                        intensity: point.intensity,
                    });
                    trace.representative_mz = point.mz;
                    extended += 1;
                    self.stats.points_assigned += 1;
                }
                // Sub-threshold match: point stays unclaimed, trace gaps
            }
        }

        // Seed new traces from unclaimed points, in ascending m/z order
        let mut seeded = 0usize;
        for (i, point) in scan.points.iter().enumerate() {
            if claimed[i] || point.intensity < self.params.start_intensity {
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;
            self.active.push(Chromatogram {
                id,
                points: vec![TracePoint {
                    scan_index: scan.index,
                    retention_time: scan.retention_time,
                    mz: point.mz,
                    intensity: point.intensity,
                }],
                representative_mz: point.mz,
            });
            seeded += 1;
            self.stats.traces_started += 1;
            self.stats.points_assigned += 1;
        }

        self.stats.scans_processed += 1;
        self.last_scan = Some((scan.index, scan.retention_time));

        debug!(
            "Scan {} (rt {:.3}): {} points, {} traces extended, {} seeded, {} active",
            scan.index,
            scan.retention_time,
            scan.points.len(),
            extended,
            seeded,
            self.active.len()
        );

        Ok(())
    }

    /// Finalize the construction: apply span qualification and return the
    /// qualified chromatograms (ascending by id) with run statistics.
    pub fn finish(mut self) -> (Vec<Chromatogram>, BuilderStats) {
        let threshold = self.params.intensity_threshold;
        let min_span = self.params.min_scan_span;

        let mut qualified = Vec::new();
        for trace in self.active.drain(..) {
            let span = qualify::qualified_span(&trace.points, threshold);
            if span >= min_span {
                qualified.push(trace);
            } else {
                self.stats.traces_discarded += 1;
            }
        }
        self.stats.traces_qualified = qualified.len();

        info!("{}", self.stats);
        (qualified, self.stats)
    }
}

/// Construct chromatograms from a complete scan sequence in one call.
///
/// Returns only the qualified chromatograms. Zero scans or zero qualifying
/// traces yield an empty list, not an error.
pub fn build_chromatograms<'a, I>(
    scans: I,
    params: BuilderParams,
) -> Result<Vec<Chromatogram>, BuilderError>
where
    I: IntoIterator<Item = &'a Scan>,
{
    let mut builder = ChromatogramBuilder::new(params)?;
    for scan in scans {
        builder.process_scan(scan)?;
    }
    Ok(builder.finish().0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::ScanBuilder;

    fn params() -> BuilderParams {
        BuilderParams::new(10.0, 5.0, 1.5).with_tolerance(MzTolerance::new(0.01, 0.0))
    }

    #[test]
    fn test_rejects_nan_parameter() {
        let p = BuilderParams::new(f64::NAN, 5.0, 1.5);
        let err = ChromatogramBuilder::new(p).err().expect("must fail");
        assert!(matches!(
            err,
            BuilderError::InvalidParameter {
                name: "start_intensity",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let p = params().with_tolerance(MzTolerance::new(-0.01, 0.0));
        assert!(matches!(
            ChromatogramBuilder::new(p),
            Err(BuilderError::InvalidParameter {
                name: "mz_tolerance.absolute",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_out_of_order_retention_time() {
        let mut builder = ChromatogramBuilder::new(params()).unwrap();
        let first = ScanBuilder::new(0, 10.0).add_point(100.0, 50.0).build();
        let second = ScanBuilder::new(1, 9.0).add_point(100.0, 50.0).build();

        builder.process_scan(&first).unwrap();
        let err = builder.process_scan(&second).err().expect("must fail");
        assert!(matches!(
            err,
            BuilderError::OutOfOrderScan {
                index: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_non_increasing_scan_index() {
        let mut builder = ChromatogramBuilder::new(params()).unwrap();
        builder
            .process_scan(&ScanBuilder::new(5, 10.0).build())
            .unwrap();

        // Retention time advances but the index repeats
        let err = builder
            .process_scan(&ScanBuilder::new(5, 11.0).build())
            .err()
            .expect("must fail");
        match &err {
            BuilderError::OutOfOrderScan {
                index,
                previous_index,
                ..
            } => {
                assert_eq!(*index, 5);
                assert_eq!(*previous_index, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The message must describe the index violation, not only the
        // retention times
        assert!(err.to_string().contains("index"));
    }

    #[test]
    fn test_rejects_equal_retention_time() {
        let mut builder = ChromatogramBuilder::new(params()).unwrap();
        builder
            .process_scan(&ScanBuilder::new(0, 10.0).build())
            .unwrap();
        assert!(builder
            .process_scan(&ScanBuilder::new(1, 10.0).build())
            .is_err());
    }

    #[test]
    fn test_empty_input_yields_empty_result() {
        let chromatograms = build_chromatograms([].iter(), params()).unwrap();
        assert!(chromatograms.is_empty());
    }

    #[test]
    fn test_single_trace_across_scans() {
        let scans: Vec<_> = [(0, 0.0, 50.0), (1, 1.0, 60.0), (2, 2.0, 55.0)]
            .iter()
            .map(|&(i, rt, h)| ScanBuilder::new(i, rt).add_point(100.0, h).build())
            .collect();

        let chromatograms = build_chromatograms(&scans, params()).unwrap();
        assert_eq!(chromatograms.len(), 1);
        let trace = &chromatograms[0];
        assert_eq!(trace.point_count(), 3);
        assert_eq!(trace.rt_span(), 2.0);
        assert_eq!(trace.representative_mz, 100.0);
        let intensities: Vec<f64> = trace.points.iter().map(|p| p.intensity).collect();
        assert_eq!(intensities, vec![50.0, 60.0, 55.0]);
    }

    #[test]
    fn test_anchor_follows_last_point() {
        // m/z drifts 0.008 per scan: each hop is inside the 0.01 window
        // even though scan 3's m/z is far from scan 0's.
        let mzs = [100.000, 100.008, 100.016, 100.024];
        let scans: Vec<_> = mzs
            .iter()
            .enumerate()
            .map(|(i, &mz)| ScanBuilder::new(i, i as f64).add_point(mz, 50.0).build())
            .collect();

        let chromatograms = build_chromatograms(&scans, params()).unwrap();
        assert_eq!(chromatograms.len(), 1);
        assert_eq!(chromatograms[0].point_count(), 4);
        assert_eq!(chromatograms[0].representative_mz, 100.024);
    }

    #[test]
    fn test_sub_threshold_match_leaves_point_for_seeding() {
        // Scan 1's point matches the trace from scan 0 but is below the
        // intensity threshold: the trace gaps and the point seeds a new
        // trace (it exceeds start_intensity).
        let p = BuilderParams::new(10.0, 20.0, 0.0).with_tolerance(MzTolerance::new(0.01, 0.0));
        let scans = vec![
            ScanBuilder::new(0, 0.0).add_point(100.0, 50.0).build(),
            ScanBuilder::new(1, 1.0).add_point(100.0, 15.0).build(),
        ];

        let mut builder = ChromatogramBuilder::new(p).unwrap();
        for scan in &scans {
            builder.process_scan(scan).unwrap();
        }
        let (chromatograms, stats) = builder.finish();

        assert_eq!(stats.traces_started, 2);
        // min_scan_span = 0 qualifies both single-run traces
        assert_eq!(chromatograms.len(), 2);
        assert_eq!(chromatograms[0].point_count(), 1);
        assert_eq!(chromatograms[1].point_count(), 1);
    }

    #[test]
    fn test_gap_tolerated_until_finalization() {
        // Scan 1 has no matching point; the trace survives the gap and is
        // extended again on scan 2.
        let p = BuilderParams::new(10.0, 5.0, 0.0).with_tolerance(MzTolerance::new(0.01, 0.0));
        let scans = vec![
            ScanBuilder::new(0, 0.0).add_point(100.0, 50.0).build(),
            ScanBuilder::new(1, 1.0).add_point(300.0, 4.0).build(),
            ScanBuilder::new(2, 2.0).add_point(100.0, 60.0).build(),
        ];

        let chromatograms = build_chromatograms(&scans, p).unwrap();
        assert_eq!(chromatograms.len(), 1);
        assert_eq!(chromatograms[0].point_count(), 2);
        let indices: Vec<usize> = chromatograms[0].points.iter().map(|p| p.scan_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_lower_id_claims_first() {
        // Two traces anchor near the same m/z; the single matching point in
        // scan 1 goes to the older (lower-id) trace.
        let p = BuilderParams::new(10.0, 5.0, 0.0).with_tolerance(MzTolerance::new(0.05, 0.0));
        let scans = vec![
            ScanBuilder::new(0, 0.0)
                .add_point(100.00, 50.0)
                .add_point(100.04, 40.0)
                .build(),
            ScanBuilder::new(1, 1.0).add_point(100.02, 60.0).build(),
        ];

        let chromatograms = build_chromatograms(&scans, p).unwrap();
        assert_eq!(chromatograms.len(), 2);
        assert_eq!(chromatograms[0].id, 0);
        assert_eq!(chromatograms[0].point_count(), 2);
        assert_eq!(chromatograms[1].id, 1);
        assert_eq!(chromatograms[1].point_count(), 1);
    }

    #[test]
    fn test_below_start_intensity_never_seeds() {
        let scans = vec![ScanBuilder::new(0, 0.0).add_point(100.0, 3.0).build()];
        let mut builder = ChromatogramBuilder::new(params()).unwrap();
        builder.process_scan(&scans[0]).unwrap();
        assert_eq!(builder.active_count(), 0);
    }

    #[test]
    fn test_average_mz() {
        let scans: Vec<_> = [(0, 0.0, 100.000), (1, 1.0, 100.008)]
            .iter()
            .map(|&(i, rt, mz)| ScanBuilder::new(i, rt).add_point(mz, 50.0).build())
            .collect();
        let p = BuilderParams::new(10.0, 5.0, 0.0).with_tolerance(MzTolerance::new(0.01, 0.0));

        let chromatograms = build_chromatograms(&scans, p).unwrap();
        assert_eq!(chromatograms.len(), 1);
        assert!((chromatograms[0].average_mz() - 100.004).abs() < 1e-9);
    }
}
