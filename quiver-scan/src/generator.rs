//! The asynchronous accessor of a scan.
//!
//! A [`BatchGenerator`] owns a worker thread that runs the scan cursor. Every call to
//! [`BatchGenerator::next_batch`] queues a request and returns a [`BatchFuture`]; the worker answers
//! requests in the order they were made and prepares up to `batch_readahead` batches while no
//! request is waiting.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use flume::r#async::RecvFut;
use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use futures::FutureExt;
use futures::stream::BoxStream;
use log::{trace, warn};
use quiver_error::{QuiverError, QuiverResult, quiver_err};

use crate::ScanOptions;
use crate::cursor::{BatchCursor, BlockingStream, ScanState, TaggedBatch};

type Reply = Sender<QuiverResult<TaggedBatch>>;

/// Produces the batches of a scan on a worker thread, see [`Scanner::scan_batches_async`].
///
/// Dropping the generator stops the worker once its current read completes.
///
/// [`Scanner::scan_batches_async`]: crate::Scanner::scan_batches_async
pub struct BatchGenerator {
    requests: Option<Sender<Reply>>,
    worker: Option<JoinHandle<()>>,
    schema: SchemaRef,
}

impl BatchGenerator {
    pub(crate) fn try_new(
        stream: BoxStream<'static, QuiverResult<RecordBatch>>,
        options: Arc<ScanOptions>,
    ) -> QuiverResult<Self> {
        let (requests, inbox) = flume::unbounded::<Reply>();
        let schema = options.output_schema().clone();
        let worker = thread::Builder::new()
            .name("quiver-scan".to_string())
            .spawn(move || {
                let cursor = BatchCursor::new(BlockingStream::new(stream), &options);
                serve(cursor, &inbox, options.batch_readahead());
            })?;

        Ok(Self {
            requests: Some(requests),
            worker: Some(worker),
            schema,
        })
    }

    /// The Arrow schema of every emitted batch.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Requests the next batch.
    ///
    /// Requests are answered in the order they are made, whatever order their futures are
    /// waited on. Once the stream has ended every request resolves to the end of the stream.
    pub fn next_batch(&mut self) -> BatchFuture {
        let (reply, receiver) = flume::bounded(1);
        if let Some(requests) = &self.requests {
            // A stopped worker drops the reply, which the future reports.
            requests.send(reply).ok();
        }
        BatchFuture::new(receiver)
    }
}

impl Drop for BatchGenerator {
    fn drop(&mut self) {
        drop(self.requests.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("scan worker panicked");
            }
        }
    }
}

fn serve<I>(mut cursor: BatchCursor<I>, inbox: &Receiver<Reply>, readahead: usize)
where
    I: Iterator<Item = QuiverResult<RecordBatch>>,
{
    let mut ready = VecDeque::with_capacity(readahead);
    loop {
        let prefetch = ready.len() < readahead && cursor.state() != ScanState::Exhausted;
        let request = if prefetch {
            match inbox.try_recv() {
                Ok(reply) => Some(reply),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match inbox.recv() {
                Ok(reply) => Some(reply),
                Err(_) => break,
            }
        };

        match request {
            Some(reply) => {
                let result = ready.pop_front().unwrap_or_else(|| cursor.next_tagged());
                reply.send(result).ok();
            }
            None => ready.push_back(cursor.next_tagged()),
        }
    }
    trace!("scan worker stopped with {} prepared batches", ready.len());
}

/// The pending answer to a [`BatchGenerator::next_batch`] request.
///
/// Wait on it with a timeout through [`BatchFuture::wait`], block on it with
/// [`BatchFuture::result`] or `.await` it.
pub struct BatchFuture {
    receiver: Receiver<QuiverResult<TaggedBatch>>,
    pending: Option<RecvFut<'static, QuiverResult<TaggedBatch>>>,
    result: Option<QuiverResult<TaggedBatch>>,
}

impl BatchFuture {
    fn new(receiver: Receiver<QuiverResult<TaggedBatch>>) -> Self {
        Self {
            receiver,
            pending: None,
            result: None,
        }
    }

    /// Waits up to `timeout` for the answer, returning true once it is available.
    ///
    /// A timeout only ends this wait, the request stays queued and may be waited on again.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        if self.result.is_some() {
            return true;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => {
                self.result = Some(result);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                self.result = Some(Err(worker_stopped()));
                true
            }
        }
    }

    /// Blocks until the answer is available and returns it.
    pub fn result(mut self) -> QuiverResult<TaggedBatch> {
        match self.result.take() {
            Some(result) => result,
            None => self.receiver.recv().unwrap_or_else(|_| Err(worker_stopped())),
        }
    }
}

impl Future for BatchFuture {
    type Output = QuiverResult<TaggedBatch>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(result) = this.result.take() {
            return Poll::Ready(result);
        }
        let receiver = &this.receiver;
        this.pending
            .get_or_insert_with(|| receiver.clone().into_recv_async())
            .poll_unpin(cx)
            .map(|result| result.unwrap_or_else(|_| Err(worker_stopped())))
    }
}

fn worker_stopped() -> QuiverError {
    quiver_err!(InvalidState: "scan worker stopped before answering")
}
