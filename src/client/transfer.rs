//! Background transfers with progress reporting
//!
//! Every upload or download runs as its own tokio task. The caller gets a
//! [`Transfer`] handle exposing:
//! - the current [`TransferState`]
//! - a stream of [`Progress`] events
//! - the terminal result, delivered exactly once
//!
//! There is no cancellation and no retry: the first error ends the task.

use crate::common::{percent, Error, Result};
use futures_util::StreamExt;
use std::future::Future;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Lifecycle of a transfer: `Idle → InProgress → {Completed | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    InProgress,
    Completed,
    Failed,
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Failed)
    }
}

/// One progress event; `percent` is `done * 100 / total`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub done: u64,
    pub total: u64,
}

impl Progress {
    pub fn new(done: u64, total: u64) -> Self {
        Self {
            percent: percent(done, total),
            done,
            total,
        }
    }
}

/// Sending half handed to the transfer task
#[derive(Clone)]
pub struct ProgressReporter {
    tx: mpsc::UnboundedSender<Progress>,
}

impl ProgressReporter {
    pub fn report(&self, done: u64, total: u64) {
        // Nobody listening is fine
        let _ = self.tx.send(Progress::new(done, total));
    }
}

pub struct Transfer<T> {
    state: watch::Receiver<TransferState>,
    progress: Option<mpsc::UnboundedReceiver<Progress>>,
    handle: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> Transfer<T> {
    /// Run `work` on a new task, tracking its state
    pub fn spawn<F, Fut>(work: F) -> Self
    where
        F: FnOnce(ProgressReporter) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (state_tx, state_rx) = watch::channel(TransferState::Idle);
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        // Held until the terminal state is published, so the progress
        // stream never ends before `state()` reports the outcome
        let keep_open = progress_tx.clone();
        let fut = work(ProgressReporter { tx: progress_tx });

        let handle = tokio::spawn(async move {
            state_tx.send_replace(TransferState::InProgress);
            let result = fut.await;
            let terminal = if result.is_ok() {
                TransferState::Completed
            } else {
                TransferState::Failed
            };
            state_tx.send_replace(terminal);
            drop(keep_open);
            result
        });

        Self {
            state: state_rx,
            progress: Some(progress_rx),
            handle,
        }
    }

    pub fn state(&self) -> TransferState {
        *self.state.borrow()
    }

    /// Progress events, available once per transfer.
    ///
    /// The stream ends when the task finishes.
    pub fn progress(&mut self) -> Option<UnboundedReceiverStream<Progress>> {
        self.progress.take().map(UnboundedReceiverStream::new)
    }

    /// Wait for the terminal result
    pub async fn wait(self) -> Result<T> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::Internal(format!("Transfer task failed: {}", e))),
        }
    }

    /// Callback adapter: `on_progress` runs for each event, then `on_done`
    /// runs once with the terminal result.
    pub fn on_events<P, D>(mut self, mut on_progress: P, on_done: D) -> JoinHandle<()>
    where
        P: FnMut(Progress) + Send + 'static,
        D: FnOnce(Result<T>) + Send + 'static,
    {
        let progress = self.progress();
        tokio::spawn(async move {
            if let Some(mut progress) = progress {
                while let Some(event) = progress.next().await {
                    on_progress(event);
                }
            }
            on_done(self.wait().await);
        })
    }
}
