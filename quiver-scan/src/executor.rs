use crate::FragmentRead;

/// Runs fragment reads somewhere other than the thread that consumes the scan.
///
/// The scanner hands every read to [`TaskExecutor::spawn_read`] as soon as it is planned and polls
/// the returned future in fragment order, so the executor only decides where the reads make
/// progress.
pub trait TaskExecutor: 'static + Send + Sync {
    /// Starts `read` and returns a future resolving to its batch.
    fn spawn_read(&self, read: FragmentRead) -> FragmentRead;
}

#[cfg(feature = "tokio")]
impl TaskExecutor for tokio::runtime::Handle {
    fn spawn_read(&self, read: FragmentRead) -> FragmentRead {
        use futures::FutureExt;
        use quiver_error::quiver_err;

        tokio::runtime::Handle::spawn(self, read)
            .map(|joined| {
                joined.unwrap_or_else(|join_err| {
                    Err(quiver_err!("fragment read did not complete: {join_err}"))
                })
            })
            .boxed()
    }
}
