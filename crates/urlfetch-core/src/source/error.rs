//! Source stage error type.

use std::path::PathBuf;

/// Fatal errors of the source stage. Each one ends the stage and closes the
/// URL stream; downstream stages then see an empty or truncated stream.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Input file could not be opened.
    #[error("cannot open input {}: {source}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Wrong extension, unreadable header, or header not starting with `urls`.
    #[error("invalid input format in {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },
    /// Header present but no data rows follow it.
    #[error("input {} has no data rows", path.display())]
    EmptyInput { path: PathBuf },
    /// A record after the first data row could not be read.
    #[error("read error in {} at record {record}: {source}", path.display())]
    Read {
        path: PathBuf,
        record: u64,
        #[source]
        source: csv::Error,
    },
}
