use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::app::ports::{ReportContext, ReportSink, SheetSelector, SheetSource};
use crate::constants::DEFAULT_REPORT_TITLE;
use crate::error::{AuditError, Result};
use crate::observability::metrics;
use crate::pipeline::processing::{AuditSummary, ColumnMapping};
use crate::pipeline::AuditPipeline;
use crate::types::AuditTable;

/// One uploaded spreadsheet.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub sheet: SheetSelector,
}

impl UploadRequest {
    pub fn new(path: impl Into<PathBuf>, sheet: SheetSelector) -> Self {
        Self {
            path: path.into(),
            sheet,
        }
    }
}

/// Result of one upload. Nothing here is shared with other uploads.
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    pub upload_id: Uuid,
    pub source_digest: String,
    pub sheet: String,
    pub header_index: usize,
    pub dropped_rows: usize,
    pub mapping: ColumnMapping,
    #[serde(skip_serializing)]
    pub table: AuditTable,
    pub summary: AuditSummary,
    pub artifacts: Vec<PathBuf>,
}

/// Use case for running one upload through source → pipeline → summary → report sinks
pub struct AuditUseCase {
    source: Box<dyn SheetSource>,
    pipeline: AuditPipeline,
    sinks: Vec<Box<dyn ReportSink>>,
    report_title: String,
}

impl AuditUseCase {
    pub fn new(source: Box<dyn SheetSource>, pipeline: AuditPipeline) -> Self {
        Self {
            source,
            pipeline,
            sinks: Vec::new(),
            report_title: DEFAULT_REPORT_TITLE.to_string(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_report_title(mut self, title: impl Into<String>) -> Self {
        self.report_title = title.into();
        self
    }

    pub fn run(&self, request: &UploadRequest) -> Result<AuditOutcome> {
        let upload_id = Uuid::new_v4();
        let span = info_span!("upload", upload_id = %upload_id, file = %request.path.display());
        let _enter = span.enter();

        match self.run_inner(upload_id, request) {
            Ok(outcome) => {
                metrics::upload::processed();
                Ok(outcome)
            }
            Err(e) => {
                error!("upload failed: {}", e);
                metrics::upload::failed(failure_reason(&e));
                Err(e)
            }
        }
    }

    fn run_inner(&self, upload_id: Uuid, request: &UploadRequest) -> Result<AuditOutcome> {
        let loaded = self.source.load(&request.path, &request.sheet)?;
        info!(
            sheet = %loaded.sheet.name,
            rows = loaded.sheet.len(),
            bytes = loaded.size_bytes,
            digest = %loaded.digest,
            "spreadsheet loaded"
        );

        let processed = self.pipeline.process(&loaded.sheet)?;
        let summary = AuditSummary::from_table(&processed.table);

        let source_name = request
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ctx = ReportContext {
            title: &self.report_title,
            source_name: &source_name,
            generated_at: Utc::now(),
            table: &processed.table,
            summary: &summary,
        };

        let mut artifacts = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            let path = match sink.write_report(&ctx) {
                Ok(path) => path,
                Err(e) => {
                    discard_artifacts(&artifacts);
                    return Err(e);
                }
            };
            metrics::upload::report_written(sink.kind());
            info!(kind = sink.kind(), path = %path.display(), "report written");
            artifacts.push(path);
        }

        Ok(AuditOutcome {
            upload_id,
            source_digest: loaded.digest,
            sheet: loaded.sheet.name,
            header_index: processed.header_index,
            dropped_rows: processed.dropped_rows,
            mapping: processed.mapping,
            table: processed.table,
            summary,
            artifacts,
        })
    }
}

/// An upload either yields every requested report or none of them.
fn discard_artifacts(paths: &[PathBuf]) {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "removed report from failed upload"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove report from failed upload"),
        }
    }
}

fn failure_reason(err: &AuditError) -> &'static str {
    if !err.is_upload_fatal() {
        return "report";
    }
    match err {
        AuditError::HeaderNotFound { .. } => "header_not_found",
        AuditError::RequiredColumnsMissing { .. } => "required_columns_missing",
        _ => "file_read",
    }
}
