use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/urlfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Maximum number of fetches in flight at once.
    pub max_concurrent_fetches: usize,
    /// Seconds to let in-flight work finish after Ctrl+C / SIGTERM before cancelling.
    pub shutdown_grace_secs: u64,
    /// Seconds to let the sink flush after the fetch stage reports completion.
    pub completion_grace_secs: u64,
    /// Directory where payload files are written (relative to the working dir unless absolute).
    pub output_dir: PathBuf,
    /// Extension appended to generated file names.
    pub file_extension: String,
    /// Connect timeout per request in seconds.
    pub connect_timeout_secs: u64,
    /// Hard timeout per request in seconds.
    pub request_timeout_secs: u64,
    /// Redirects followed per request.
    pub max_redirections: u32,
    /// Capacity of the source → fetch channel (1 is the closest tokio gets to a rendezvous).
    #[serde(default = "default_channel_capacity")]
    pub url_channel_capacity: usize,
    /// Capacity of the fetch → sink channel.
    #[serde(default = "default_channel_capacity")]
    pub payload_channel_capacity: usize,
    /// Optional User-Agent header; libcurl sends none when unset.
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_channel_capacity() -> usize {
    1
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 50,
            shutdown_grace_secs: 5,
            completion_grace_secs: 2,
            output_dir: PathBuf::from("downloads"),
            file_extension: "txt".to_string(),
            connect_timeout_secs: 30,
            request_timeout_secs: 300,
            max_redirections: 10,
            url_channel_capacity: default_channel_capacity(),
            payload_channel_capacity: default_channel_capacity(),
            user_agent: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("urlfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetcherConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetcherConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FetcherConfig = toml::from_str(&data)?;
    Ok(cfg)
}
