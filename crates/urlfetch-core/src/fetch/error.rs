//! Per-URL fetch error type.

/// Error returned by a single fetch. Every variant counts as one failure;
/// none of them affects sibling fetches.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The URL could not be turned into a request.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Curl reported an error (timeout, connection, TLS, etc.).
    #[error("{0}")]
    Transport(#[source] curl::Error),
    /// Response status in the 4xx/5xx range.
    #[error("HTTP {0}")]
    Status(u32),
    /// The shared scope was cancelled before or during the transfer.
    #[error("fetch aborted by cancellation")]
    Aborted,
    /// The blocking fetch task panicked or was torn down by the runtime.
    #[error("fetch task failed: {0}")]
    Task(String),
}

impl FetchError {
    /// True for failures caused by shutdown rather than by the remote end.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FetchError::Aborted)
    }
}

/// First status code treated as failure.
pub const FIRST_ERROR_STATUS: u32 = 400;

/// Maps a final response code to success/failure.
pub fn check_status(code: u32) -> Result<(), FetchError> {
    if code >= FIRST_ERROR_STATUS {
        Err(FetchError::Status(code))
    } else {
        Ok(())
    }
}
