//! Metrics for the audit pipeline.
//!
//! Recording is always cheap: without an installed recorder the `metrics`
//! macros are no-ops. `init()` installs a Prometheus recorder whose text
//! snapshot the CLI can print.

use std::fmt;
use std::sync::OnceLock;
use tracing::info;

use crate::types::RiskLevel;

/// Enum representing all metric names used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    UploadsProcessed,
    UploadsFailed,
    RowsClassified,
    RowsDropped,
    HeadersUnmapped,
    ReportsWritten,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::UploadsProcessed => "autoaudit_uploads_processed_total",
            MetricName::UploadsFailed => "autoaudit_uploads_failed_total",
            MetricName::RowsClassified => "autoaudit_rows_classified_total",
            MetricName::RowsDropped => "autoaudit_rows_dropped_total",
            MetricName::HeadersUnmapped => "autoaudit_headers_unmapped_total",
            MetricName::ReportsWritten => "autoaudit_reports_written_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            UploadsProcessed,
            UploadsFailed,
            RowsClassified,
            RowsDropped,
            HeadersUnmapped,
            ReportsWritten,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it twice is harmless.
pub fn init() -> Result<(), String> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics recorder installed");
    Ok(())
}

/// Prometheus text exposition of everything recorded so far.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

pub mod upload {
    use super::MetricName;

    pub fn processed() {
        ::metrics::counter!(MetricName::UploadsProcessed.as_str()).increment(1);
    }

    pub fn failed(reason: &'static str) {
        ::metrics::counter!(MetricName::UploadsFailed.as_str(), "reason" => reason).increment(1);
    }

    pub fn report_written(kind: &'static str) {
        ::metrics::counter!(MetricName::ReportsWritten.as_str(), "kind" => kind).increment(1);
    }
}

pub mod mapping {
    use super::MetricName;

    pub fn header_unmapped() {
        ::metrics::counter!(MetricName::HeadersUnmapped.as_str()).increment(1);
    }

    pub fn rows_dropped(count: usize) {
        ::metrics::counter!(MetricName::RowsDropped.as_str()).increment(count as u64);
    }
}

pub mod classify {
    use super::{MetricName, RiskLevel};

    pub fn row_classified(level: RiskLevel) {
        ::metrics::counter!(MetricName::RowsClassified.as_str(), "level" => level.as_str()).increment(1);
    }
}
