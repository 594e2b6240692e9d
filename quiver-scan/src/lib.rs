//! Scan planning and batch production over datasets with nested and extension-typed columns.
//!
//! A [`ScanBuilder`] records a projection, a filter, a limit and batch settings against a
//! [`Dataset`], and [`ScanBuilder::finish`] validates them into [`ScanOptions`]. A [`Scanner`]
//! then produces the batches of the scan as a whole table, through an Arrow
//! [`RecordBatchReader`](arrow_array::RecordBatchReader), through a pull iterator that ends with
//! a sentinel, or asynchronously from a worker thread. All of them emit the same batches.

pub use builder::*;
pub use cursor::{ScanState, TaggedBatch};
pub use dataset::*;
pub use executor::*;
pub use generator::*;
pub use memory::*;
pub use options::*;
pub use scanner::*;

mod builder;
mod cursor;
mod dataset;
mod executor;
mod generator;
mod memory;
mod options;
mod scanner;
pub mod wrap;
