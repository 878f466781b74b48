//! Source stage: stream URLs out of a CSV file.
//!
//! Reads one record at a time (never the whole file), validates the `urls`
//! header, normalizes each first-column token and hands it to the fetch stage
//! over a bounded channel. Runs on a blocking thread; the driver spawns it
//! with `spawn_blocking`.

mod error;
mod normalize;

pub use error::SourceError;
pub use normalize::{normalize_url, DEFAULT_SCHEME};

use std::fs::File;
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Required (case-insensitive) first header field.
pub const HEADER: &str = "urls";

/// Only accepted input extension.
pub const INPUT_EXTENSION: &str = "csv";

/// What the source stage did before returning successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSummary {
    /// URLs handed to the fetch stage.
    pub emitted: u64,
    /// Data rows skipped because they had no usable first field.
    pub skipped: u64,
    /// True if streaming stopped early because of cancellation.
    pub cancelled: bool,
}

/// Outcome of one send attempt.
enum Offer {
    Sent,
    Stopped,
}

fn offer(url_tx: &mpsc::Sender<String>, cancel: &CancellationToken, url: String) -> Offer {
    if cancel.is_cancelled() {
        return Offer::Stopped;
    }
    // The dispatch loop drops its receiver once it sees cancellation, which
    // wakes a send that is blocked on a full channel.
    match url_tx.blocking_send(url) {
        Ok(()) => Offer::Sent,
        Err(_) => Offer::Stopped,
    }
}

/// Returns true if `path` has the `.csv` extension (any case).
pub fn has_input_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(INPUT_EXTENSION))
        .unwrap_or(false)
}

/// Streams normalized URLs from the CSV at `path` into `url_tx`.
///
/// `url_tx` is consumed and dropped on every return path, which is what tells
/// the fetch stage no more URLs are coming. Cancellation is not an error: the
/// stage returns `Ok` with `cancelled` set.
///
/// Blocking; must not be called from inside an async task.
pub fn stream_urls(
    path: &Path,
    url_tx: mpsc::Sender<String>,
    cancel: &CancellationToken,
) -> Result<SourceSummary, SourceError> {
    if !has_input_extension(path) {
        return Err(SourceError::Format {
            path: path.to_path_buf(),
            reason: format!("expected a .{} file", INPUT_EXTENSION),
        });
    }

    let file = File::open(path).map_err(|source| SourceError::Access {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut record = csv::StringRecord::new();

    match reader.read_record(&mut record) {
        Ok(true) => {}
        Ok(false) => {
            return Err(SourceError::Format {
                path: path.to_path_buf(),
                reason: "missing header".to_string(),
            });
        }
        Err(e) => {
            return Err(SourceError::Format {
                path: path.to_path_buf(),
                reason: format!("unreadable header: {}", e),
            });
        }
    }
    let header_ok = record
        .get(0)
        .map(|h| h.trim().eq_ignore_ascii_case(HEADER))
        .unwrap_or(false);
    if !header_ok {
        return Err(SourceError::Format {
            path: path.to_path_buf(),
            reason: format!("first header field must be '{}'", HEADER),
        });
    }

    // The first data row has to exist; anything else (EOF or a read error) is an empty input.
    match reader.read_record(&mut record) {
        Ok(true) => {}
        Ok(false) | Err(_) => {
            return Err(SourceError::EmptyInput {
                path: path.to_path_buf(),
            });
        }
    }

    let mut summary = SourceSummary::default();
    let mut record_no: u64 = 1;
    loop {
        match record.get(0).map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => {
                let url = normalize_url(token);
                tracing::trace!(url = %url, "emitting url");
                match offer(&url_tx, cancel, url) {
                    Offer::Sent => summary.emitted += 1,
                    Offer::Stopped => {
                        tracing::info!(emitted = summary.emitted, "source stopped by cancellation");
                        summary.cancelled = true;
                        return Ok(summary);
                    }
                }
            }
            None => {
                tracing::debug!(record = record_no, "row has no url in the first column, skipped");
                summary.skipped += 1;
            }
        }

        record_no += 1;
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(source) => {
                return Err(SourceError::Read {
                    path: path.to_path_buf(),
                    record: record_no,
                    source,
                });
            }
        }
    }

    tracing::info!(
        emitted = summary.emitted,
        skipped = summary.skipped,
        "finished reading {}",
        path.display()
    );
    Ok(summary)
}
