//! # mztrace - Chromatogram Construction from Centroided Scans
//!
//! `mztrace` extracts elution profiles (chromatograms, or "mass traces")
//! from a time-ordered series of centroided mass spectra. Across
//! consecutive scans it follows continuous traces of single ion species
//! whose m/z stays within tolerance, then keeps only the traces whose
//! intensity profile meets duration and strength criteria — the ADAP-style
//! trace assembly used ahead of peak detection.
//!
//! ## Algorithm in brief
//!
//! Scans are consumed one at a time in acquisition order. Each active trace
//! tries to extend itself with the unclaimed point closest to its anchor
//! m/z (the m/z of its last point); points strong enough to start a new
//! trace seed one; everything is governed by four numeric policies:
//!
//! - **m/z tolerance** — window `max(absolute, ppm * 1e-6 * anchor)`
//! - **intensity threshold** — minimum intensity to extend a trace and to
//!   count toward the span
//! - **start intensity** — stricter minimum to start a new trace
//! - **min scan span** — continuous retention-time span a trace must hold
//!   above the intensity threshold to qualify
//!
//! ## Quick Start
//!
//! ```rust
//! use mztrace::builder::{build_chromatograms, BuilderParams};
//! use mztrace::spectrum::ScanBuilder;
//! use mztrace::tolerance::MzTolerance;
//!
//! // Three scans, one ion eluting at m/z 422.3
//! let scans: Vec<_> = [(0, 0.0, 8_000.0), (1, 1.0, 12_000.0), (2, 2.0, 9_000.0)]
//!     .iter()
//!     .map(|&(i, rt, h)| ScanBuilder::new(i, rt).add_point(422.3, h).build())
//!     .collect();
//!
//! let params = BuilderParams::new(5_000.0, 1_000.0, 1.5)
//!     .with_tolerance(MzTolerance::new(0.01, 5.0));
//!
//! let chromatograms = build_chromatograms(&scans, params)?;
//! assert_eq!(chromatograms.len(), 1);
//! assert_eq!(chromatograms[0].point_count(), 3);
//! # Ok::<(), mztrace::builder::BuilderError>(())
//! ```
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`spectrum`]: scan and data-point model (the builder's read-only input)
//! - [`tolerance`]: the m/z equivalence window and the pure best-match query
//! - [`builder`]: the stateful trace builder and its parameter validation
//! - [`qualify`]: the span-qualification filter applied at finalization
//! - [`reader`]: TSV/CSV scan source
//! - [`export`]: JSON peak-list sink with provenance metadata
//!
//! Construction is strictly sequential and deterministic: the ascending-id
//! matching order, ascending-m/z seeding order, and the tie-break rules of
//! [`tolerance::find_best_match`] guarantee identical output for identical
//! input. No global state is involved; the builder receives everything as
//! plain arguments.

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod builder;
pub mod export;
pub mod qualify;
pub mod reader;
pub mod spectrum;
pub mod tolerance;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::builder::{
        build_chromatograms, BuilderError, BuilderParams, BuilderStats, Chromatogram,
        ChromatogramBuilder, TracePoint,
    };
    pub use crate::export::{
        write_peak_list, ExportError, ExportStats, PeakListDocument, PeakListEntry,
    };
    pub use crate::qualify::{best_run, qualified_span};
    pub use crate::reader::{read_scans, read_scans_from, ReaderError};
    pub use crate::spectrum::{DataPoint, Scan, ScanBuilder};
    pub use crate::tolerance::{find_best_match, MzTolerance};
}
