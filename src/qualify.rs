//! # Span Qualification Filter
//!
//! Pure functions deciding whether a finished mass trace represents a
//! genuine chromatographic peak rather than noise.
//!
//! A trace qualifies when it contains at least one contiguous run of
//! consecutive-scan points, every one at or above the intensity threshold,
//! whose retention-time span reaches the minimum scan span. Low-intensity
//! points may interleave qualifying stretches; only the best contiguous run
//! counts.

use std::ops::Range;

use crate::builder::TracePoint;

/// Find the contiguous above-threshold run with the largest retention-time
/// span.
///
/// A run is contiguous when its points occupy consecutive scan indices with
/// no gaps. Returns the half-open index range into `points`, or `None` when
/// no point reaches the threshold. Among runs of equal span the earliest
/// one is returned.
pub fn best_run(points: &[TracePoint], intensity_threshold: f64) -> Option<Range<usize>> {
    let mut best: Option<(Range<usize>, f64)> = None;
    let mut start: Option<usize> = None;

    for (i, point) in points.iter().enumerate() {
        let continues = point.intensity >= intensity_threshold
            && match start {
                Some(_) => points[i - 1].scan_index + 1 == point.scan_index,
                None => true,
            };

        if !continues {
            start = if point.intensity >= intensity_threshold {
                // Above threshold but a scan gap: this point opens a new run
                Some(i)
            } else {
                None
            };
        } else if start.is_none() {
            start = Some(i);
        }

        if let Some(s) = start {
            let span = points[i].retention_time - points[s].retention_time;
            let better = match &best {
                Some((_, best_span)) => span > *best_span,
                None => true,
            };
            if better {
                best = Some((s..i + 1, span));
            }
        }
    }

    best.map(|(range, _)| range)
}

/// Retention-time span of the best qualifying run, or zero when no point
/// reaches the threshold. A single-point run has zero span.
pub fn qualified_span(points: &[TracePoint], intensity_threshold: f64) -> f64 {
    match best_run(points, intensity_threshold) {
        Some(range) => {
            points[range.end - 1].retention_time - points[range.start].retention_time
        }
        None => 0.0,
    }
}
