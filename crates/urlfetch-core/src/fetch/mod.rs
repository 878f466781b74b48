//! Fetch stage: bounded-parallelism HTTP GETs.
//!
//! A single dispatch loop takes URLs off the source channel, acquires one
//! admission permit per URL (which backpressures the source when the cap is
//! reached) and spawns a fetch task into a `JoinSet`. Successful bodies go to
//! the sink channel; failures are counted and logged. Once the URL stream is
//! closed (or the scope is cancelled) the loop stops admitting, joins every
//! task, closes the payload channel and fires the completion signal, in that
//! order.

mod error;
mod http;
mod limiter;
mod metrics;

pub use error::{check_status, FetchError, FIRST_ERROR_STATUS};
pub use http::{CurlFetcher, CurlOptions, Fetcher};
pub use limiter::{AdmissionLimiter, AdmissionPermit, DEFAULT_MAX_CONCURRENT};
pub use metrics::{FetchMetrics, MetricsSnapshot};

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Everything the fetch stage needs. Channels are moved in so that dropping
/// the stage's ends is what closes them.
pub struct FetchStage {
    pub url_rx: mpsc::Receiver<String>,
    pub payload_tx: mpsc::Sender<Vec<u8>>,
    pub completion_tx: oneshot::Sender<()>,
    pub limiter: AdmissionLimiter,
    pub fetcher: Arc<dyn Fetcher>,
    pub metrics: Arc<FetchMetrics>,
    pub cancel: CancellationToken,
}

/// Dispatch-side counts, returned when the stage finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStageSummary {
    /// Fetch tasks spawned.
    pub dispatched: u64,
    /// Highest number of permits held at once.
    pub peak_in_flight: usize,
    /// True if admission stopped because the scope was cancelled.
    pub stopped_by_cancel: bool,
}

fn log_join(res: Result<(), JoinError>) {
    if let Err(e) = res {
        tracing::error!(error = %e, "fetch task did not complete");
    }
}

/// Runs the dispatch loop to completion. See the module docs for the
/// shutdown sequence.
pub async fn run_fetch_stage(stage: FetchStage) -> FetchStageSummary {
    let FetchStage {
        mut url_rx,
        payload_tx,
        completion_tx,
        limiter,
        fetcher,
        metrics,
        cancel,
    } = stage;

    tracing::info!(max_concurrent = limiter.max_permits(), "fetch stage started");

    let mut tasks = JoinSet::new();
    let mut summary = FetchStageSummary::default();

    loop {
        let url = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                summary.stopped_by_cancel = true;
                break;
            }
            next = url_rx.recv() => match next {
                Some(url) => url,
                None => break,
            },
        };

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                summary.stopped_by_cancel = true;
                break;
            }
            permit = limiter.acquire() => match permit {
                Ok(p) => p,
                Err(e) => {
                    tracing::error!(error = %e, "admission limiter closed");
                    break;
                }
            },
        };

        // Reap finished tasks so the set doesn't grow with the input.
        while let Some(res) = tasks.try_join_next() {
            log_join(res);
        }

        summary.dispatched += 1;
        tasks.spawn(fetch_one(
            url,
            permit,
            Arc::clone(&fetcher),
            Arc::clone(&metrics),
            payload_tx.clone(),
            cancel.clone(),
        ));
    }

    // Unblocks a source that is waiting to send.
    drop(url_rx);

    tracing::debug!(in_flight = tasks.len(), "dispatch loop stopped, waiting for fetches");
    while let Some(res) = tasks.join_next().await {
        log_join(res);
    }

    summary.peak_in_flight = limiter.peak_in_flight();
    drop(payload_tx);
    let _ = completion_tx.send(());

    tracing::info!(
        dispatched = summary.dispatched,
        peak_in_flight = summary.peak_in_flight,
        cancelled = summary.stopped_by_cancel,
        "fetch stage finished"
    );
    summary
}

/// One fetch. The permit is held for the whole task, including the hand-off
/// to the sink, and released when the task returns.
async fn fetch_one(
    url: String,
    _permit: AdmissionPermit,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<FetchMetrics>,
    payload_tx: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) {
    let start = Instant::now();
    let result = {
        let url = url.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || fetcher.get(&url, &cancel))
            .await
            .unwrap_or_else(|e| Err(FetchError::Task(e.to_string())))
    };

    match result {
        Ok(body) => {
            metrics.record_success(start.elapsed());
            tracing::debug!(url = %url, bytes = body.len(), "fetched");
            tokio::select! {
                biased;
                sent = payload_tx.send(body) => {
                    if sent.is_err() {
                        tracing::warn!(url = %url, "sink closed, payload dropped");
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::debug!(url = %url, "payload dropped on cancellation");
                }
            }
        }
        Err(e) => {
            metrics.record_failure();
            if e.is_cancellation() {
                tracing::debug!(url = %url, "fetch aborted");
            } else {
                tracing::error!(url = %url, error = %e, "fetch failed");
            }
        }
    }
}

#[cfg(test)]
mod tests;
