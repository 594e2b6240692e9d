use std::sync::Arc;

use arrow_array::RecordBatch;
use futures::future::BoxFuture;
use quiver_dtype::StructDType;
use quiver_error::QuiverResult;

use crate::ScanOptions;

pub type DatasetRef = Arc<dyn Dataset>;
pub type FragmentRef = Arc<dyn Fragment>;
/// The pending read of one fragment.
pub type FragmentRead = BoxFuture<'static, QuiverResult<RecordBatch>>;

/// A logical schema over an ordered set of fragments.
pub trait Dataset: Send + Sync {
    /// The schema every fragment conforms to.
    fn schema(&self) -> &StructDType;

    /// The fragments of the dataset, in scan order.
    fn fragments(&self) -> Vec<FragmentRef>;
}

/// A physical unit of a [`Dataset`] that is read as a whole.
pub trait Fragment: Send + Sync {
    /// Reads the rows of this fragment that pass the filter of `options`.
    ///
    /// The batch holds one column per field selected by [`ScanOptions::projection`], pruned to
    /// the selected nested fields. Extension columns are returned as their storage. The read
    /// must not start before the returned future is polled.
    fn read(&self, options: &ScanOptions) -> FragmentRead;
}
