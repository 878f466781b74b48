//! HTTP GET via libcurl.
//!
//! Runs in the current thread; the fetch stage calls it from `spawn_blocking`.
//! The progress callback polls the shared cancellation token so an in-flight
//! transfer is aborted within one progress tick of shutdown.

use super::error::{check_status, FetchError};
use crate::config::FetcherConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Performs one GET and returns the body. Implementations are blocking.
pub trait Fetcher: Send + Sync + 'static {
    fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError>;
}

/// Per-request curl settings.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_redirections: u32,
    pub user_agent: Option<String>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self::from(&FetcherConfig::default())
    }
}

impl From<&FetcherConfig> for CurlOptions {
    fn from(cfg: &FetcherConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.request_timeout_secs),
            max_redirections: cfg.max_redirections,
            user_agent: cfg.user_agent.clone(),
        }
    }
}

/// Production fetcher: one curl easy handle per request.
#[derive(Debug, Clone, Default)]
pub struct CurlFetcher {
    opts: CurlOptions,
}

impl CurlFetcher {
    pub fn new(opts: CurlOptions) -> Self {
        Self { opts }
    }
}

impl Fetcher for CurlFetcher {
    fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        let parsed = url::Url::parse(url)?;
        if cancel.is_cancelled() {
            return Err(FetchError::Aborted);
        }

        let mut easy = curl::easy::Easy::new();
        easy.url(parsed.as_str()).map_err(FetchError::Transport)?;
        easy.get(true).map_err(FetchError::Transport)?;
        easy.follow_location(true).map_err(FetchError::Transport)?;
        easy.max_redirections(self.opts.max_redirections)
            .map_err(FetchError::Transport)?;
        easy.connect_timeout(self.opts.connect_timeout)
            .map_err(FetchError::Transport)?;
        easy.timeout(self.opts.timeout).map_err(FetchError::Transport)?;
        if let Some(ua) = &self.opts.user_agent {
            easy.useragent(ua).map_err(FetchError::Transport)?;
        }
        // Progress callbacks are off by default in libcurl.
        easy.progress(true).map_err(FetchError::Transport)?;

        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(FetchError::Transport)?;
            transfer
                .progress_function(|_, _, _, _| !cancel.is_cancelled())
                .map_err(FetchError::Transport)?;
            if let Err(e) = transfer.perform() {
                if e.is_aborted_by_callback() && cancel.is_cancelled() {
                    return Err(FetchError::Aborted);
                }
                return Err(FetchError::Transport(e));
            }
        }

        let code = easy.response_code().map_err(FetchError::Transport)?;
        check_status(code)?;
        Ok(body)
    }
}
