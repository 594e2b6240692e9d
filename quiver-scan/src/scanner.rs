use std::sync::Arc;

use arrow_array::{RecordBatch, RecordBatchReader};
use arrow_schema::{ArrowError, SchemaRef};
use arrow_select::concat::concat_batches;
use futures::stream::BoxStream;
use futures::{StreamExt, stream};
use itertools::Itertools;
use quiver_dtype::StructDType;
use quiver_error::QuiverResult;
use quiver_expr::transform::bind::BoundExpr;

use crate::cursor::{BatchCursor, BlockingStream, ScanState, TaggedBatch};
use crate::generator::BatchGenerator;
use crate::{DatasetRef, ScanOptions, TaskExecutor};

/// Produces the batches of a finished scan.
///
/// Every accessor starts its own stream over the fragments of the dataset, so two accessors of the
/// same scanner never share a position. All of them emit the same batches.
pub struct Scanner {
    dataset: DatasetRef,
    options: Arc<ScanOptions>,
    executor: Option<Arc<dyn TaskExecutor>>,
}

impl Scanner {
    pub fn new(dataset: DatasetRef, options: ScanOptions) -> Self {
        Self {
            dataset,
            options: Arc::new(options),
            executor: None,
        }
    }

    /// Spawn each fragment read onto `executor` instead of polling it on the consuming thread.
    pub fn with_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// The Arrow schema of every emitted batch.
    pub fn schema(&self) -> &SchemaRef {
        self.options.output_schema()
    }

    pub fn projected_schema(&self) -> &StructDType {
        self.options.projected_schema()
    }

    pub fn filter(&self) -> Option<&BoundExpr> {
        self.options.filter()
    }

    pub fn batch_size(&self) -> usize {
        self.options.batch_size()
    }

    pub fn batch_readahead(&self) -> usize {
        self.options.batch_readahead()
    }

    /// Reads every batch and concatenates them into one.
    pub fn to_table(&self) -> QuiverResult<RecordBatch> {
        let mut cursor = self.cursor();
        let mut batches = Vec::new();
        while let Some(batch) = cursor.next_batch()? {
            batches.push(batch);
        }
        Ok(concat_batches(self.schema(), &batches)?)
    }

    /// Returns an Arrow reader yielding one batch per call.
    pub fn to_batch_reader(&self) -> ScanBatchReader {
        ScanBatchReader {
            cursor: self.cursor(),
        }
    }

    /// Returns a pull iterator that marks the end of the stream with a [`TaggedBatch`] without a
    /// batch.
    pub fn scan_batches(&self) -> TaggedBatches {
        TaggedBatches {
            cursor: self.cursor(),
        }
    }

    /// Returns a generator producing the batches on a worker thread.
    pub fn scan_batches_async(&self) -> QuiverResult<BatchGenerator> {
        BatchGenerator::try_new(self.fragment_stream(), self.options.clone())
    }

    /// The number of rows the scan emits.
    pub fn count_rows(&self) -> QuiverResult<usize> {
        let mut batches = self.scan_batches();
        let mut rows = 0;
        while let Some(batch) = batches.next_batch()?.batch {
            rows += batch.num_rows();
        }
        Ok(rows)
    }

    fn cursor(&self) -> BatchCursor<BlockingStream> {
        BatchCursor::new(BlockingStream::new(self.fragment_stream()), &self.options)
    }

    /// Reads the fragments in order, keeping up to `batch_readahead` reads in flight.
    fn fragment_stream(&self) -> BoxStream<'static, QuiverResult<RecordBatch>> {
        let tasks = self
            .dataset
            .fragments()
            .into_iter()
            .map(|fragment| {
                let read = fragment.read(&self.options);
                match &self.executor {
                    None => read,
                    Some(executor) => executor.spawn_read(read),
                }
            })
            .collect_vec();
        stream::iter(tasks)
            .buffered(self.options.batch_readahead())
            .boxed()
    }
}

/// An Arrow [`RecordBatchReader`] over the batches of a scan.
pub struct ScanBatchReader {
    cursor: BatchCursor<BlockingStream>,
}

impl ScanBatchReader {
    pub fn state(&self) -> ScanState {
        self.cursor.state()
    }
}

impl Iterator for ScanBatchReader {
    type Item = Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_batch().map_err(ArrowError::from).transpose()
    }
}

impl RecordBatchReader for ScanBatchReader {
    fn schema(&self) -> SchemaRef {
        self.cursor.schema().clone()
    }
}

/// The pull accessor of a scan, see [`Scanner::scan_batches`].
pub struct TaggedBatches {
    cursor: BatchCursor<BlockingStream>,
}

impl TaggedBatches {
    /// Returns the next batch, or the end of the stream once every batch was returned.
    ///
    /// After the end of the stream, or after a failure, every call returns the end of the stream
    /// again.
    pub fn next_batch(&mut self) -> QuiverResult<TaggedBatch> {
        self.cursor.next_tagged()
    }

    pub fn schema(&self) -> &SchemaRef {
        self.cursor.schema()
    }

    pub fn state(&self) -> ScanState {
        self.cursor.state()
    }
}
