//! # m/z Tolerance Matching
//!
//! [`MzTolerance`] combines an absolute and a relative (ppm) tolerance into
//! a single equivalence window, matching the MZmine convention: two m/z
//! values `a` and `b` match iff `|a - b| <= max(absolute, ppm * 1e-6 * a)`.
//!
//! [`find_best_match`] is the pure query used by the trace builder to pick,
//! among a scan's unclaimed points, the one that best continues a trace.
//! Its tie-break rules are fully deterministic so that construction output
//! never depends on iteration incidentals.

use serde::{Deserialize, Serialize};

use crate::spectrum::DataPoint;

/// Combined absolute + relative m/z tolerance.
///
/// The effective window at anchor `a` is `max(absolute, ppm * 1e-6 * a)`,
/// so the wider of the two tolerances always applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MzTolerance {
    /// Absolute tolerance in m/z units (>= 0)
    pub absolute: f64,
    /// Relative tolerance in parts per million (>= 0)
    pub ppm: f64,
}

impl Default for MzTolerance {
    fn default() -> Self {
        // MZmine defaults: 0.001 m/z or 5 ppm, whichever is wider
        Self {
            absolute: 0.001,
            ppm: 5.0,
        }
    }
}

impl MzTolerance {
    /// Create a tolerance from absolute and ppm components
    pub fn new(absolute: f64, ppm: f64) -> Self {
        Self { absolute, ppm }
    }

    /// Half-width of the matching window at the given anchor m/z
    pub fn width_at(&self, anchor_mz: f64) -> f64 {
        let relative = self.ppm * 1e-6 * anchor_mz;
        self.absolute.max(relative)
    }

    /// Whether `mz` falls inside the window centered on `anchor_mz`
    pub fn contains(&self, anchor_mz: f64, mz: f64) -> bool {
        (mz - anchor_mz).abs() <= self.width_at(anchor_mz)
    }
}

/// Find the best match for an anchor m/z among candidate points.
///
/// Candidates outside the tolerance window are ignored. Among the rest the
/// winner is chosen by, in order:
///
/// 1. minimum `|mz - anchor_mz|`
/// 2. highest intensity
/// 3. lowest m/z
///
/// Returns `None` when no candidate qualifies. Purely a query: no candidate
/// is consumed or modified.
pub fn find_best_match<'a, I>(
    anchor_mz: f64,
    tolerance: MzTolerance,
    candidates: I,
) -> Option<DataPoint>
where
    I: IntoIterator<Item = &'a DataPoint>,
{
    best_candidate(
        anchor_mz,
        tolerance,
        candidates.into_iter().copied().enumerate(),
    )
    .map(|(_, point)| point)
}

/// Index-carrying variant of [`find_best_match`], shared with the trace
/// builder so claiming a matched point stays a single implementation of the
/// tie-break rules.
pub(crate) fn best_candidate<I>(
    anchor_mz: f64,
    tolerance: MzTolerance,
    candidates: I,
) -> Option<(usize, DataPoint)>
where
    I: IntoIterator<Item = (usize, DataPoint)>,
{
    let mut best: Option<(usize, DataPoint, f64)> = None;

    for (idx, point) in candidates {
        let delta = (point.mz - anchor_mz).abs();
        if delta > tolerance.width_at(anchor_mz) {
            continue;
        }

        best = match best {
            None => Some((idx, point, delta)),
            Some((bi, bp, bd)) => {
                if beats(point, delta, bp, bd) {
                    Some((idx, point, delta))
                } else {
                    Some((bi, bp, bd))
                }
            }
        };
    }

    best.map(|(idx, point, _)| (idx, point))
}

/// Tie-break ordering: closer m/z wins, then higher intensity, then lower m/z
fn beats(candidate: DataPoint, delta: f64, best: DataPoint, best_delta: f64) -> bool {
    if delta != best_delta {
        return delta < best_delta;
    }
    if candidate.intensity != best.intensity {
        return candidate.intensity > best.intensity;
    }
    candidate.mz < best.mz
}
