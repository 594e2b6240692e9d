use std::collections::VecDeque;
use std::iter::Fuse;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use arrow_select::concat::concat_batches;
use futures::StreamExt;
use futures::executor::LocalPool;
use futures::stream::BoxStream;
use log::{debug, trace};
use quiver_error::{QuiverError, QuiverResult};

use crate::ScanOptions;
use crate::wrap::wrap_batch;

/// The position of a batch accessor in its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No batch has been requested yet.
    Ready,
    /// Batches are being emitted.
    Emitting,
    /// The stream has ended, every further request returns the end of stream.
    Exhausted,
}

/// A batch of the pull accessor, `batch` is `None` once the stream has ended.
#[derive(Debug, Clone)]
pub struct TaggedBatch {
    /// The batch, or `None` for the end of the stream.
    pub batch: Option<RecordBatch>,
    /// The position of the batch in the stream. The end of the stream carries the number of
    /// batches emitted before it.
    pub index: usize,
}

impl TaggedBatch {
    /// Returns true if this marks the end of the stream.
    pub fn is_end(&self) -> bool {
        self.batch.is_none()
    }

    pub fn into_batch(self) -> Option<RecordBatch> {
        self.batch
    }
}

/// Drives a stream of fragment reads to completion on the current thread.
pub(crate) struct BlockingStream {
    pool: LocalPool,
    stream: BoxStream<'static, QuiverResult<RecordBatch>>,
}

impl BlockingStream {
    pub fn new(stream: BoxStream<'static, QuiverResult<RecordBatch>>) -> Self {
        Self {
            pool: LocalPool::new(),
            stream,
        }
    }
}

impl Iterator for BlockingStream {
    type Item = QuiverResult<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pool.run_until(self.stream.next())
    }
}

/// Cuts the batches of a fragment stream into batches of exactly `batch_size` rows, after
/// skipping `offset` rows and up to `limit` rows.
pub(crate) struct BatchCursor<I: Iterator> {
    source: Fuse<I>,
    schema: SchemaRef,
    batch_size: usize,
    skip: usize,
    remaining: Option<usize>,
    pending: VecDeque<RecordBatch>,
    pending_rows: usize,
    emitted: usize,
    state: ScanState,
}

impl<I> BatchCursor<I>
where
    I: Iterator<Item = QuiverResult<RecordBatch>>,
{
    pub fn new(source: I, options: &ScanOptions) -> Self {
        Self {
            source: source.fuse(),
            schema: options.output_schema().clone(),
            batch_size: options.batch_size(),
            skip: options.offset(),
            remaining: options.limit(),
            pending: VecDeque::new(),
            pending_rows: 0,
            emitted: 0,
            state: ScanState::Ready,
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Returns the next batch, or `None` once the stream has ended.
    ///
    /// A failure ends the stream as well, later calls return `None`.
    pub fn next_batch(&mut self) -> QuiverResult<Option<RecordBatch>> {
        if self.state == ScanState::Exhausted {
            return Ok(None);
        }
        self.state = ScanState::Emitting;

        match self.take_batch() {
            Ok(Some(batch)) => {
                trace!(
                    "emitting batch {} with {} rows",
                    self.emitted,
                    batch.num_rows()
                );
                self.emitted += 1;
                Ok(Some(batch))
            }
            Ok(None) => {
                self.exhaust();
                Ok(None)
            }
            Err(err) => {
                debug!("scan failed after {} batches: {err}", self.emitted);
                self.exhaust();
                Err(err)
            }
        }
    }

    pub fn next_tagged(&mut self) -> QuiverResult<TaggedBatch> {
        let index = self.emitted;
        self.next_batch().map(|batch| TaggedBatch { batch, index })
    }

    fn exhaust(&mut self) {
        if self.state != ScanState::Exhausted {
            debug!("scan exhausted after {} batches", self.emitted);
        }
        self.state = ScanState::Exhausted;
        self.pending.clear();
        self.pending_rows = 0;
    }

    fn take_batch(&mut self) -> QuiverResult<Option<RecordBatch>> {
        let target = match self.remaining {
            Some(remaining) => remaining.min(self.batch_size),
            None => self.batch_size,
        };
        if target == 0 {
            return Ok(None);
        }

        while self.pending_rows < target {
            let Some(batch) = self.source.next() else {
                break;
            };
            let batch = self.skip_rows(batch.map_err(QuiverError::underlying_read)?);
            if batch.num_rows() == 0 {
                continue;
            }
            let batch = wrap_batch(&batch, &self.schema)?;
            self.pending_rows += batch.num_rows();
            self.pending.push_back(batch);
        }

        if self.pending_rows == 0 {
            return Ok(None);
        }
        let rows = target.min(self.pending_rows);
        let batch = self.split_off(rows)?;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= rows;
        }
        Ok(Some(batch))
    }

    fn skip_rows(&mut self, batch: RecordBatch) -> RecordBatch {
        if self.skip == 0 {
            return batch;
        }
        let skipped = self.skip.min(batch.num_rows());
        self.skip -= skipped;
        batch.slice(skipped, batch.num_rows() - skipped)
    }

    /// Removes the first `rows` pending rows as a single batch.
    fn split_off(&mut self, rows: usize) -> QuiverResult<RecordBatch> {
        let mut parts = Vec::new();
        let mut needed = rows;
        while needed > 0 {
            let Some(front) = self.pending.pop_front() else {
                break;
            };
            if front.num_rows() <= needed {
                needed -= front.num_rows();
                parts.push(front);
            } else {
                parts.push(front.slice(0, needed));
                self.pending
                    .push_front(front.slice(needed, front.num_rows() - needed));
                needed = 0;
            }
        }
        self.pending_rows -= rows;

        if let [batch] = parts.as_slice() {
            return Ok(batch.clone());
        }
        Ok(concat_batches(&self.schema, &parts)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_array::cast::AsArray;
    use arrow_array::types::Int64Type;
    use arrow_array::{ArrayRef, Int64Array};
    use arrow_schema::{DataType, Field, Schema};
    use quiver_dtype::{ExtensionBindings, ProjectionMask, StructDType};
    use quiver_error::quiver_err;
    use rstest::rstest;

    use super::*;

    fn options(batch_size: usize, offset: usize, limit: Option<usize>) -> ScanOptions {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, false)]));
        ScanOptions {
            dataset_schema: Arc::new(StructDType::empty()),
            projection: ProjectionMask::All,
            projected_schema: Arc::new(StructDType::empty()),
            output_schema: schema,
            filter: None,
            read_mask: ProjectionMask::All,
            limit,
            offset,
            batch_size,
            batch_readahead: 1,
            bindings: ExtensionBindings::default(),
        }
    }

    fn batches(sizes: &[usize]) -> Vec<QuiverResult<RecordBatch>> {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, false)]));
        let mut next = 0_i64;
        sizes
            .iter()
            .map(|size| {
                let values: Vec<i64> = (0..*size)
                    .map(|_| {
                        next += 1;
                        next - 1
                    })
                    .collect();
                Ok(RecordBatch::try_new(
                    schema.clone(),
                    vec![Arc::new(Int64Array::from(values)) as ArrayRef],
                )
                .unwrap())
            })
            .collect()
    }

    fn drain<I>(cursor: &mut BatchCursor<I>) -> Vec<Vec<i64>>
    where
        I: Iterator<Item = QuiverResult<RecordBatch>>,
    {
        let mut out = Vec::new();
        while let Some(batch) = cursor.next_batch().unwrap() {
            out.push(batch.column(0).as_primitive::<Int64Type>().values().to_vec());
        }
        out
    }

    #[rstest]
    #[case(&[10], 4, vec![4, 4, 2])]
    #[case(&[3, 3, 3, 3], 4, vec![4, 4, 4])]
    #[case(&[1, 0, 7, 1], 3, vec![3, 3, 3])]
    #[case(&[5], 5, vec![5])]
    #[case(&[], 5, vec![])]
    fn rechunks_across_fragments(
        #[case] sizes: &[usize],
        #[case] batch_size: usize,
        #[case] expected: Vec<usize>,
    ) {
        let mut cursor =
            BatchCursor::new(batches(sizes).into_iter(), &options(batch_size, 0, None));
        let out = drain(&mut cursor);
        assert_eq!(out.iter().map(Vec::len).collect::<Vec<_>>(), expected);
        let flat: Vec<i64> = out.into_iter().flatten().collect();
        assert!(flat.iter().enumerate().all(|(i, v)| usize::try_from(*v) == Ok(i)));
    }

    #[test]
    fn offset_and_limit() {
        let mut cursor =
            BatchCursor::new(batches(&[4, 4, 4]).into_iter(), &options(3, 5, Some(5)));
        assert_eq!(drain(&mut cursor), vec![vec![5, 6, 7], vec![8, 9]]);
    }

    #[test]
    fn zero_limit_reads_nothing() {
        let mut source = batches(&[4]).into_iter();
        let mut cursor = BatchCursor::new(source.by_ref(), &options(3, 0, Some(0)));
        assert!(cursor.next_batch().unwrap().is_none());
        assert_eq!(cursor.state(), ScanState::Exhausted);
        drop(cursor);
        assert_eq!(source.count(), 1);
    }

    #[test]
    fn sentinel_repeats_after_exhaustion() {
        let mut cursor = BatchCursor::new(batches(&[2]).into_iter(), &options(2, 0, None));
        assert_eq!(cursor.state(), ScanState::Ready);
        let first = cursor.next_tagged().unwrap();
        assert_eq!(first.index, 0);
        assert!(!first.is_end());
        assert_eq!(cursor.state(), ScanState::Emitting);
        for _ in 0..3 {
            let end = cursor.next_tagged().unwrap();
            assert!(end.is_end());
            assert_eq!(end.index, 1);
        }
        assert_eq!(cursor.state(), ScanState::Exhausted);
    }

    #[test]
    fn failure_ends_the_stream() {
        let mut source = batches(&[2]);
        source.push(Err(quiver_err!("disk on fire")));
        source.extend(batches(&[2]));
        let mut cursor = BatchCursor::new(source.into_iter(), &options(2, 0, None));

        assert!(cursor.next_batch().unwrap().is_some());
        let err = cursor.next_batch().unwrap_err();
        assert!(matches!(err, QuiverError::UnderlyingRead(_)));
        assert!(cursor.next_batch().unwrap().is_none());
        assert_eq!(cursor.state(), ScanState::Exhausted);
    }
}
