//! Driver: wires source → fetch → sink and owns the cancellation scope.
//!
//! The run ends on whichever comes first: a shutdown request (grace period,
//! then cancel) or the fetch stage's completion signal (short flush grace,
//! then cancel). All three stages are joined before metrics are read, so the
//! report only ever sees final counter values.

mod report;
mod shutdown;

pub use report::RunReport;
pub use shutdown::shutdown_signal;

use crate::config::FetcherConfig;
use crate::fetch::{run_fetch_stage, AdmissionLimiter, FetchMetrics, FetchStage, Fetcher};
use crate::sink::{self, SinkConfig, SinkError};
use crate::source;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Runtime parameters for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_concurrent_fetches: usize,
    /// Wait after a shutdown request before cancelling.
    pub shutdown_grace: Duration,
    /// Wait after natural completion before cancelling.
    pub completion_grace: Duration,
    pub url_channel_capacity: usize,
    pub payload_channel_capacity: usize,
    pub sink: SinkConfig,
}

impl PipelineConfig {
    pub fn from_config(cfg: &FetcherConfig) -> Self {
        Self {
            max_concurrent_fetches: cfg.max_concurrent_fetches,
            shutdown_grace: Duration::from_secs(cfg.shutdown_grace_secs),
            completion_grace: Duration::from_secs(cfg.completion_grace_secs),
            url_channel_capacity: cfg.url_channel_capacity,
            payload_channel_capacity: cfg.payload_channel_capacity,
            sink: SinkConfig {
                output_dir: cfg.output_dir.clone(),
                file_extension: cfg.file_extension.clone(),
            },
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

/// Runs the whole pipeline over `input` until natural completion or until
/// `shutdown` resolves.
///
/// Fails only if the output directory cannot be prepared; every other stage
/// failure is logged and reflected in the returned report.
pub async fn run_pipeline<S>(
    input: &Path,
    cfg: &PipelineConfig,
    fetcher: Arc<dyn Fetcher>,
    shutdown: S,
) -> Result<RunReport, SinkError>
where
    S: Future<Output = ()>,
{
    // Checked up front: without it every payload would pile up undelivered.
    sink::prepare_output_dir(&cfg.sink.output_dir).await?;

    let cancel = CancellationToken::new();
    let (url_tx, url_rx) = mpsc::channel::<String>(cfg.url_channel_capacity.max(1));
    let (payload_tx, payload_rx) = mpsc::channel::<Vec<u8>>(cfg.payload_channel_capacity.max(1));
    let (completion_tx, completion_rx) = oneshot::channel::<()>();
    let metrics = Arc::new(FetchMetrics::new());

    tracing::info!(input = %input.display(), "starting pipeline");

    let source_task = {
        let path = input.to_path_buf();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || source::stream_urls(&path, url_tx, &cancel))
    };
    let fetch_task = tokio::spawn(run_fetch_stage(FetchStage {
        url_rx,
        payload_tx,
        completion_tx,
        limiter: AdmissionLimiter::new(cfg.max_concurrent_fetches),
        fetcher,
        metrics: Arc::clone(&metrics),
        cancel: cancel.clone(),
    }));
    let sink_task = {
        let sink_cfg = cfg.sink.clone();
        tokio::spawn(async move { sink::drain_random(payload_rx, &sink_cfg).await })
    };

    tokio::pin!(shutdown);
    let mut interrupted = false;
    tokio::select! {
        _ = &mut shutdown => {
            interrupted = true;
            tracing::warn!(
                grace_secs = cfg.shutdown_grace.as_secs_f64(),
                "shutdown signal received, waiting for in-flight downloads"
            );
            tokio::time::sleep(cfg.shutdown_grace).await;
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
        done = completion_rx => {
            if done.is_err() {
                tracing::warn!("fetch stage exited without signalling completion");
            }
            tokio::time::sleep(cfg.completion_grace).await;
            cancel.cancel();
        }
    }

    let (source, source_error) = match source_task.await {
        Ok(Ok(summary)) => (Some(summary), None),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "source stage failed");
            (None, Some(e))
        }
        Err(e) => {
            tracing::error!(error = %e, "source task did not complete");
            (None, None)
        }
    };

    let fetch = match fetch_task.await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, "fetch stage did not complete");
            Default::default()
        }
    };

    let sink = match sink_task.await {
        Ok(Ok(summary)) => Some(summary),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "sink stage failed");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "sink task did not complete");
            None
        }
    };

    let report = RunReport {
        metrics: metrics.snapshot(),
        fetch,
        sink,
        source,
        source_error,
        interrupted,
    };
    report.log();
    Ok(report)
}
