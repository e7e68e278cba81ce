//! Concurrent fan-out of candidates over a bounded worker pool.
//!
//! A blocking feeder pulls candidates from the (possibly file-backed)
//! iterator into a bounded work queue. `pool_size` worker tasks take from
//! the queue, classify, and push verdicts to a results channel, which the
//! caller drains as a [`VerdictStream`]. Verdicts arrive in completion
//! order, not input order.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::debug;

use crate::candidate::Candidate;
use crate::classifier::{Classifier, Verdict};

/// Worker count used when none is configured.
pub const DEFAULT_POOL_SIZE: usize = 100;

type WorkQueue = Arc<Mutex<mpsc::Receiver<Candidate>>>;

/// Runs the classifier over candidates with bounded concurrency.
pub struct Dispatcher {
    classifier: Arc<Classifier>,
    pool_size: usize,
}

impl Dispatcher {
    pub fn new(classifier: Classifier, pool_size: usize) -> Self {
        Self {
            classifier: Arc::new(classifier),
            pool_size,
        }
    }

    /// Start classifying `candidates` and return the stream of verdicts.
    ///
    /// The pool is capped at the candidate count when the iterator knows it.
    /// Must be called from within a tokio runtime.
    pub fn run<I>(&self, candidates: I) -> VerdictStream
    where
        I: IntoIterator<Item = Candidate>,
        I::IntoIter: Send + 'static,
    {
        let candidates = candidates.into_iter();
        let pool_size = effective_pool_size(self.pool_size, candidates.size_hint().1);

        let (work_tx, work_rx) = mpsc::channel(pool_size);
        let (verdict_tx, verdict_rx) = mpsc::channel(pool_size);

        // Exits once the candidates run out or every worker is gone.
        tokio::task::spawn_blocking(move || {
            for candidate in candidates {
                if work_tx.blocking_send(candidate).is_err() {
                    break;
                }
            }
        });

        let queue: WorkQueue = Arc::new(Mutex::new(work_rx));
        let mut workers = JoinSet::new();
        for id in 0..pool_size {
            workers.spawn(worker(
                id,
                self.classifier.clone(),
                queue.clone(),
                verdict_tx.clone(),
            ));
        }

        VerdictStream {
            verdicts: verdict_rx,
            workers,
            pool_size,
            produced: 0,
        }
    }
}

fn effective_pool_size(requested: usize, candidates: Option<usize>) -> usize {
    let size = match candidates {
        Some(n) => requested.min(n),
        None => requested,
    };
    size.max(1)
}

async fn worker(
    id: usize,
    classifier: Arc<Classifier>,
    queue: WorkQueue,
    verdicts: mpsc::Sender<Verdict>,
) {
    loop {
        let candidate = queue.lock().await.recv().await;
        let Some(candidate) = candidate else {
            break;
        };

        let verdict = classifier.classify(&candidate).await;
        if verdicts.send(verdict).await.is_err() {
            break;
        }
    }
    debug!("worker {} finished", id);
}

/// Verdicts from a running dispatch, in completion order.
///
/// Dropping the stream aborts any probes still in flight.
pub struct VerdictStream {
    verdicts: mpsc::Receiver<Verdict>,
    workers: JoinSet<()>,
    pool_size: usize,
    produced: u64,
}

impl VerdictStream {
    /// Number of workers actually started.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Verdicts handed out so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Stop taking new work, abandon in-flight probes, and return how many
    /// verdicts were handed out before stopping.
    pub fn cancel(mut self) -> u64 {
        self.verdicts.close();
        self.workers.abort_all();
        self.produced
    }
}

impl Stream for VerdictStream {
    type Item = Verdict;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Verdict>> {
        let this = self.get_mut();
        let polled = this.verdicts.poll_recv(cx);
        if let Poll::Ready(Some(_)) = &polled {
            this.produced += 1;
        }
        polled
    }
}
