use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::pipeline::processing::AuditSummary;
use crate::types::{AuditTable, RawSheet};

/// Which worksheet of a workbook to read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SheetSelector {
    #[default]
    First,
    Named(String),
}

impl SheetSelector {
    pub fn from_option(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(name) if !name.is_empty() => SheetSelector::Named(name.to_string()),
            _ => SheetSelector::First,
        }
    }
}

/// One worksheet read from an uploaded file, with the file's fingerprint.
#[derive(Debug, Clone)]
pub struct LoadedSheet {
    pub sheet: RawSheet,
    /// SHA-256 of the file bytes, hex encoded.
    pub digest: String,
    pub size_bytes: usize,
}

pub trait SheetSource: Send + Sync {
    fn load(&self, path: &Path, selector: &SheetSelector) -> Result<LoadedSheet>;
}

/// Everything a report writer may render.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub title: &'a str,
    pub source_name: &'a str,
    pub generated_at: DateTime<Utc>,
    pub table: &'a AuditTable,
    pub summary: &'a AuditSummary,
}

pub trait ReportSink: Send + Sync {
    /// Short name used in logs and metrics ("csv", "pdf").
    fn kind(&self) -> &'static str;

    /// Write the report and return where it went.
    fn write_report(&self, ctx: &ReportContext<'_>) -> Result<PathBuf>;
}
