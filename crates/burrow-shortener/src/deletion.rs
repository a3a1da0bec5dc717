//! Asynchronous batch soft-deletion.
//!
//! A batch flows through four stages:
//!
//! 1. a source task handing short URLs one at a time into a capacity-1
//!    channel,
//! 2. [`DELETE_WORKERS`] workers sharing that channel and calling
//!    [`Repository::mark_deleted`], each with its own output channel,
//! 3. one aggregator per worker forwarding into a merged channel, plus a
//!    closer that drops the last merged sender once every aggregator is done,
//! 4. a sink draining the merged channel and logging failures.
//!
//! Failures are never retried and never reported to the caller that
//! scheduled the batch.

use burrow_core::error::StorageError;
use burrow_core::Repository;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Number of concurrent workers per deletion batch.
pub const DELETE_WORKERS: usize = 5;

/// Summary of a finished deletion batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Short URLs a worker called `mark_deleted` for.
    pub attempted: usize,
    /// Calls that returned a storage error.
    pub failed: usize,
}

#[derive(Debug)]
struct Outcome {
    short_url: String,
    result: Result<(), StorageError>,
}

type SharedReceiver = Arc<Mutex<mpsc::Receiver<String>>>;

/// Runs a deletion batch on a detached task.
///
/// Dropping the returned handle does not stop the batch; cancelling
/// `cancel` does.
pub fn spawn(
    repository: Arc<dyn Repository>,
    owner_id: String,
    short_urls: Vec<String>,
    cancel: CancellationToken,
) -> JoinHandle<DeletionReport> {
    tokio::spawn(run(repository, owner_id, short_urls, cancel))
}

/// Runs a deletion batch to completion and returns its report.
pub async fn run(
    repository: Arc<dyn Repository>,
    owner_id: String,
    short_urls: Vec<String>,
    cancel: CancellationToken,
) -> DeletionReport {
    debug!(owner_id = %owner_id, count = short_urls.len(), "starting deletion batch");

    let (handoff_tx, handoff_rx) = mpsc::channel(1);
    tokio::spawn(source(short_urls, handoff_tx, cancel.clone()));

    let handoff_rx: SharedReceiver = Arc::new(Mutex::new(handoff_rx));
    let owner_id: Arc<str> = owner_id.into();
    let (merged_tx, merged_rx) = mpsc::channel(DELETE_WORKERS);

    let mut aggregators = Vec::with_capacity(DELETE_WORKERS);
    for worker_id in 0..DELETE_WORKERS {
        let (out_tx, out_rx) = mpsc::channel(1);
        tokio::spawn(worker(
            worker_id,
            Arc::clone(&repository),
            Arc::clone(&owner_id),
            Arc::clone(&handoff_rx),
            out_tx,
            cancel.clone(),
        ));
        aggregators.push(tokio::spawn(aggregate(out_rx, merged_tx.clone())));
    }
    tokio::spawn(close(aggregators, merged_tx));

    sink(&owner_id, merged_rx).await
}

async fn source(short_urls: Vec<String>, handoff: mpsc::Sender<String>, cancel: CancellationToken) {
    for short_url in short_urls {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("deletion source cancelled");
                return;
            }
            sent = handoff.send(short_url) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

async fn worker(
    worker_id: usize,
    repository: Arc<dyn Repository>,
    owner_id: Arc<str>,
    handoff: SharedReceiver,
    output: mpsc::Sender<Outcome>,
    cancel: CancellationToken,
) {
    loop {
        let next = {
            let mut handoff = handoff.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = handoff.recv() => next,
            }
        };
        let Some(short_url) = next else {
            break;
        };

        let result = repository.mark_deleted(&short_url, &owner_id).await;
        if output.send(Outcome { short_url, result }).await.is_err() {
            break;
        }
    }

    debug!(worker_id, "deletion worker finished");
}

async fn aggregate(mut input: mpsc::Receiver<Outcome>, merged: mpsc::Sender<Outcome>) {
    while let Some(outcome) = input.recv().await {
        if merged.send(outcome).await.is_err() {
            break;
        }
    }
}

async fn close(aggregators: Vec<JoinHandle<()>>, merged: mpsc::Sender<Outcome>) {
    for aggregator in aggregators {
        if let Err(err) = aggregator.await {
            warn!(error = %err, "deletion aggregator did not finish cleanly");
        }
    }
    drop(merged);
}

async fn sink(owner_id: &str, mut merged: mpsc::Receiver<Outcome>) -> DeletionReport {
    let mut report = DeletionReport::default();

    while let Some(outcome) = merged.recv().await {
        report.attempted += 1;
        if let Err(err) = outcome.result {
            report.failed += 1;
            error!(
                owner_id,
                short_url = %outcome.short_url,
                error = %err,
                "failed to mark url as deleted"
            );
        }
    }

    info!(
        owner_id,
        attempted = report.attempted,
        failed = report.failed,
        "deletion batch finished"
    );
    report
}
