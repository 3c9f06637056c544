//! In-process delivery queue backed by an unbounded `tokio::sync::mpsc`
//! channel and exactly one worker task.
//!
//! [`enqueue`](DeliveryQueue::enqueue) returns immediately and never errors
//! toward the caller. The worker executes jobs strictly in enqueue order,
//! one at a time; a failing or panicking job is logged with its metadata and
//! dropped without disturbing the jobs behind it. There is no retry, no
//! persistence, and no depth limit -- callers durably record a
//! notification's `queued` state in the database before enqueueing, so a
//! lost job leaves a stale status rather than losing data.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One unit of work for the delivery worker.
pub struct DeliveryJob {
    /// Opaque metadata echoed into worker log lines.
    pub meta: serde_json::Value,
    task: BoxFuture<'static, anyhow::Result<()>>,
}

/// Handle for enqueueing delivery jobs.
///
/// Cheaply cloneable; dropping every clone closes the channel and lets the
/// worker drain remaining jobs and exit.
#[derive(Clone)]
pub struct DeliveryQueue {
    sender: mpsc::UnboundedSender<DeliveryJob>,
}

impl DeliveryQueue {
    /// Create the queue and spawn its single worker task.
    pub fn start() -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(worker(receiver));
        (Self { sender }, handle)
    }

    /// Enqueue a job. Never blocks and never fails toward the caller; if
    /// the worker is already gone the job is logged and dropped.
    pub fn enqueue<F>(&self, meta: serde_json::Value, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let job = DeliveryJob {
            meta,
            task: task.boxed(),
        };
        if let Err(rejected) = self.sender.send(job) {
            tracing::error!(meta = %rejected.0.meta, "Delivery queue is closed, dropping job");
        }
    }
}

/// The single worker loop. Exits when the channel closes.
async fn worker(mut receiver: mpsc::UnboundedReceiver<DeliveryJob>) {
    while let Some(job) = receiver.recv().await {
        let meta = job.meta;
        match std::panic::AssertUnwindSafe(job.task).catch_unwind().await {
            Ok(Ok(())) => {
                tracing::info!(meta = %meta, "Delivery job succeeded");
            }
            Ok(Err(error)) => {
                tracing::error!(meta = %meta, error = %error, "Delivery job failed");
            }
            Err(_) => {
                tracing::error!(meta = %meta, "Delivery job panicked");
            }
        }
    }
    tracing::info!("Delivery queue closed, worker shutting down");
}
