use std::sync::Arc;

use arrow_schema::SchemaRef;
use quiver_dtype::{ExtensionBindings, ProjectionMask, StructDType};
use quiver_expr::transform::bind::BoundExpr;

/// The number of rows per batch when neither a batch size nor a limit is configured.
pub const DEFAULT_BATCH_SIZE: usize = 1 << 17;

/// The number of batches prepared ahead of the consumer when neither a readahead nor a limit is
/// configured.
pub const DEFAULT_BATCH_READAHEAD: usize = 16;

/// The validated, immutable configuration of a scan, produced by
/// [`ScanBuilder::finish`](crate::ScanBuilder::finish).
///
/// Every accessor of a [`Scanner`](crate::Scanner) reads the same options, each with its own
/// cursor.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub(crate) dataset_schema: Arc<StructDType>,
    pub(crate) projection: ProjectionMask,
    pub(crate) projected_schema: Arc<StructDType>,
    pub(crate) output_schema: SchemaRef,
    pub(crate) filter: Option<BoundExpr>,
    pub(crate) read_mask: ProjectionMask,
    pub(crate) limit: Option<usize>,
    pub(crate) offset: usize,
    pub(crate) batch_size: usize,
    pub(crate) batch_readahead: usize,
    pub(crate) bindings: ExtensionBindings,
}

impl ScanOptions {
    /// The schema of the scanned dataset.
    pub fn dataset_schema(&self) -> &StructDType {
        &self.dataset_schema
    }

    /// The fields of the dataset schema that are emitted.
    pub fn projection(&self) -> &ProjectionMask {
        &self.projection
    }

    /// The logical schema of emitted batches.
    pub fn projected_schema(&self) -> &StructDType {
        &self.projected_schema
    }

    /// The Arrow schema of emitted batches. Columns of a bound extension type carry its tag.
    pub fn output_schema(&self) -> &SchemaRef {
        &self.output_schema
    }

    /// The filter, bound against the dataset schema.
    pub fn filter(&self) -> Option<&BoundExpr> {
        self.filter.as_ref()
    }

    /// Everything a fragment has to load: the projection plus every field the filter reads.
    pub fn read_mask(&self) -> &ProjectionMask {
        &self.read_mask
    }

    /// The maximum number of rows emitted, `None` if unlimited.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// The number of matching rows skipped before the first emitted row.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn batch_readahead(&self) -> usize {
        self.batch_readahead
    }

    /// The extension types the scan was planned with.
    pub fn bindings(&self) -> &ExtensionBindings {
        &self.bindings
    }
}
