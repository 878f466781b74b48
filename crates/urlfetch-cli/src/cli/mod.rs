//! CLI for urlfetch.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use urlfetch_core::config::{self, FetcherConfig};
use urlfetch_core::fetch::{CurlFetcher, CurlOptions};
use urlfetch_core::pipeline::{self, PipelineConfig};

/// Fetch every URL listed in a CSV file and save each response body to its own file.
#[derive(Debug, Parser)]
#[command(name = "urlfetch")]
#[command(about = "urlfetch: download a CSV list of URLs with bounded concurrency", long_about = None)]
pub struct Cli {
    /// CSV file whose first column is headed `urls`.
    pub input: PathBuf,

    /// Directory for downloaded files (overrides config; default "downloads").
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum concurrent downloads (overrides config; default 50).
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Log to stderr instead of the state-dir log file.
    #[arg(long)]
    pub log_stderr: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded config.
    pub fn apply_overrides(&self, cfg: &mut FetcherConfig) {
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = dir.clone();
        }
        if let Some(n) = self.concurrency {
            cfg.max_concurrent_fetches = n.max(1);
        }
    }

    pub async fn run(&self) -> Result<()> {
        let mut cfg = match config::load_or_init() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "could not load config, using defaults");
                FetcherConfig::default()
            }
        };
        self.apply_overrides(&mut cfg);
        tracing::debug!("effective config: {:?}", cfg);

        tracing::info!("starting URL fetcher");
        let fetcher = Arc::new(CurlFetcher::new(CurlOptions::from(&cfg)));
        let report = pipeline::run_pipeline(
            &self.input,
            &PipelineConfig::from_config(&cfg),
            fetcher,
            pipeline::shutdown_signal(),
        )
        .await
        .context("output directory unavailable")?;

        println!("{}", report);
        if let Some(e) = report.source_error {
            return Err(e).context("could not read URL list");
        }
        Ok(())
    }
}
