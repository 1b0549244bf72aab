//! Chunked fan-out/fan-in over async tasks
//!
//! Items are split into contiguous chunks of at most `chunk_size`. Chunks run
//! strictly one after another; inside a chunk every worker future is polled
//! concurrently on the calling task and joined before the next chunk starts.
//! This bounds the number of in-flight requests to `chunk_size` while results
//! come back in input order, exactly as sequential processing would produce.
//!
//! The first worker error in a chunk drops (cancels) its siblings and stops
//! the run; results of the chunks that already finished are handed back in
//! [`BatchFailure::completed`] so the caller can decide what to keep.
//!
//! # Example
//!
//! ```
//! use catalog_harvest::batch::BatchScheduler;
//!
//! # async fn example() {
//! let scheduler = BatchScheduler::new(2);
//! let doubled = scheduler
//!     .run(vec![1, 2, 3, 4, 5], |n| async move { Ok::<_, String>(n * 2) })
//!     .await
//!     .unwrap();
//! assert_eq!(doubled, vec![2, 4, 6, 8, 10]);
//! # }
//! ```

use std::future::Future;

use futures::TryFutureExt;
use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;

/// Why a chunked run stopped early
#[derive(Debug)]
pub enum BatchError<E> {
    /// A worker failed
    Task {
        /// Position of the failing item in the input
        index: usize,
        /// The worker's error
        error: E,
    },
    /// The scheduler's cancellation token fired
    Cancelled,
}

/// A failed chunked run, with the results of every chunk that completed
#[derive(Debug)]
pub struct BatchFailure<R, E> {
    /// Results of the chunks that finished before the failure, in input order
    pub completed: Vec<R>,
    /// What stopped the run
    pub error: BatchError<E>,
}

/// Runs workers over items in fixed-size concurrency windows
#[derive(Clone, Debug)]
pub struct BatchScheduler {
    chunk_size: usize,
    cancel_token: CancellationToken,
}

impl BatchScheduler {
    /// Create a scheduler; a `chunk_size` of 0 is treated as 1
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Stop the run (dropping the running chunk's futures) when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Maximum number of concurrently running workers
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks `items` will be split into
    pub fn chunk_count(&self, items: usize) -> usize {
        items.div_ceil(self.chunk_size)
    }

    /// Run `worker` over every item, chunk by chunk
    pub async fn run<I, R, E, F, Fut>(
        &self,
        items: Vec<I>,
        worker: F,
    ) -> Result<Vec<R>, BatchFailure<R, E>>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        self.run_with_progress(items, worker, |_, _| {}).await
    }

    /// Like [`run`](Self::run), calling `on_chunk(chunk, chunks)` after each chunk completes
    ///
    /// `chunk` counts from 1.
    pub async fn run_with_progress<I, R, E, F, Fut, C>(
        &self,
        items: Vec<I>,
        mut worker: F,
        mut on_chunk: C,
    ) -> Result<Vec<R>, BatchFailure<R, E>>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        C: FnMut(usize, usize),
    {
        let chunks = self.chunk_count(items.len());
        let mut completed = Vec::with_capacity(items.len());
        let mut items = items.into_iter();
        let mut offset = 0;

        for chunk in 1..=chunks {
            if self.cancel_token.is_cancelled() {
                return Err(BatchFailure {
                    completed,
                    error: BatchError::Cancelled,
                });
            }

            let tasks: Vec<_> = items
                .by_ref()
                .take(self.chunk_size)
                .enumerate()
                .map(|(i, item)| {
                    let index = offset + i;
                    worker(item).map_err(move |error| (index, error))
                })
                .collect();
            let len = tasks.len();

            let joined = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    tracing::debug!(chunk, chunks, "chunk cancelled");
                    return Err(BatchFailure {
                        completed,
                        error: BatchError::Cancelled,
                    });
                }
                joined = try_join_all(tasks) => joined,
            };

            match joined {
                Ok(results) => completed.extend(results),
                Err((index, error)) => {
                    tracing::debug!(chunk, chunks, index, "chunk failed");
                    return Err(BatchFailure {
                        completed,
                        error: BatchError::Task { index, error },
                    });
                }
            }

            offset += len;
            on_chunk(chunk, chunks);
        }

        Ok(completed)
    }
}

/// Run `worker` over `items` in chunks of `chunk_size`, returning results in input order
///
/// Convenience form of [`BatchScheduler::run`] without cancellation; results of
/// completed chunks are discarded on failure.
pub async fn run_chunked<I, R, E, F, Fut>(
    items: Vec<I>,
    chunk_size: usize,
    worker: F,
) -> Result<Vec<R>, BatchError<E>>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    BatchScheduler::new(chunk_size)
        .run(items, worker)
        .await
        .map_err(|failure| failure.error)
}
