//! End-of-run summary.

use crate::fetch::{FetchStageSummary, MetricsSnapshot};
use crate::sink::SinkSummary;
use crate::source::{SourceError, SourceSummary};
use std::fmt;

/// What a pipeline run did. Built after every stage has been joined.
#[derive(Debug)]
pub struct RunReport {
    pub metrics: MetricsSnapshot,
    pub fetch: FetchStageSummary,
    /// `None` if the sink task failed (its error is logged).
    pub sink: Option<SinkSummary>,
    /// `None` if the source failed; see `source_error`.
    pub source: Option<SourceSummary>,
    pub source_error: Option<SourceError>,
    /// True if the run ended because of a shutdown signal.
    pub interrupted: bool,
}

impl RunReport {
    /// Single structured summary line.
    pub fn log(&self) {
        let avg = self.metrics.avg_success_duration();
        tracing::info!(
            total_urls = self.metrics.attempted(),
            successful = self.metrics.succeeded,
            failed = self.metrics.failed,
            avg_download_ms = avg.as_secs_f64() * 1000.0,
            files_written = self.sink.map(|s| s.written).unwrap_or(0),
            interrupted = self.interrupted,
            "processing complete"
        );
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total: {}  ok: {}  failed: {}  avg: {:.1?}",
            self.metrics.attempted(),
            self.metrics.succeeded,
            self.metrics.failed,
            self.metrics.avg_success_duration()
        )?;
        if let Some(sink) = &self.sink {
            write!(f, "  files: {}", sink.written)?;
            if sink.failed > 0 {
                write!(f, " ({} write errors)", sink.failed)?;
            }
        }
        if self.interrupted {
            write!(f, "  [interrupted]")?;
        }
        Ok(())
    }
}
