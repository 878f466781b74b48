//! Sink stage error type.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Output directory could not be created; nothing can be persisted.
    #[error("cannot create output directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A single payload could not be written. Logged and skipped by `drain`.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
