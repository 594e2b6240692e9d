//! Scans over Arrow datasets.
//!
//! Build a scan with [`ScanBuilder`], naming nested fields by their dotted path, then read it
//! through one of the accessors of [`Scanner`].

pub use quiver_scan::*;
pub use {
    quiver_dtype as dtype, quiver_error as error, quiver_expr as expr, quiver_scan as scan,
};
