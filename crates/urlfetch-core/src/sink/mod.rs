//! Sink stage: single writer that persists payloads as files.
//!
//! One task, no internal concurrency: payloads are written one after another
//! in arrival order, each under a fresh random name. A failed write is logged
//! and skipped; the stage only returns once the payload channel is closed and
//! drained.

mod error;
mod naming;

pub use error::SinkError;
pub use naming::{random_file_name, NAME_LEN};

use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Where and how the sink writes.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub output_dir: PathBuf,
    pub file_extension: String,
}

/// Per-run write counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkSummary {
    /// Payloads taken off the channel.
    pub received: u64,
    /// Files written.
    pub written: u64,
    /// Payloads whose write failed.
    pub failed: u64,
}

/// Creates `dir` (and parents) if missing.
pub async fn prepare_output_dir(dir: &Path) -> Result<(), SinkError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| SinkError::Directory {
            path: dir.to_path_buf(),
            source,
        })
}

async fn write_payload(path: &Path, payload: &[u8]) -> Result<(), SinkError> {
    tokio::fs::write(path, payload)
        .await
        .map_err(|source| SinkError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Drains `payload_rx` into `cfg.output_dir`, naming each file with
/// `next_name()`. Only a directory failure is returned as an error.
pub async fn drain<F>(
    mut payload_rx: mpsc::Receiver<Vec<u8>>,
    cfg: &SinkConfig,
    mut next_name: F,
) -> Result<SinkSummary, SinkError>
where
    F: FnMut() -> String,
{
    prepare_output_dir(&cfg.output_dir).await?;
    tracing::info!(dir = %cfg.output_dir.display(), "sink started");

    let mut summary = SinkSummary::default();
    while let Some(payload) = payload_rx.recv().await {
        summary.received += 1;
        let path = cfg.output_dir.join(next_name());
        match write_payload(&path, &payload).await {
            Ok(()) => {
                summary.written += 1;
                tracing::info!(file = %path.display(), bytes = payload.len(), "file saved");
            }
            Err(e) => {
                summary.failed += 1;
                tracing::error!(error = %e, "write failed, payload skipped");
            }
        }
    }

    tracing::info!(
        written = summary.written,
        failed = summary.failed,
        "sink finished"
    );
    Ok(summary)
}

/// `drain` with random `<8 alphanumerics>.<ext>` names.
pub async fn drain_random(
    payload_rx: mpsc::Receiver<Vec<u8>>,
    cfg: &SinkConfig,
) -> Result<SinkSummary, SinkError> {
    let ext = cfg.file_extension.clone();
    drain(payload_rx, cfg, move || random_file_name(&ext)).await
}
