use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::str::FromStr;

use csv::{ReaderBuilder, WriterBuilder};
use tracing::info;

use crate::app::ports::{ReportContext, ReportSink};
use crate::error::{AuditError, Result};
use crate::types::{AuditRecord, AuditTable, CanonicalField, RiskLevel, RiskTriple};

/// Writes the classified table as UTF-8 CSV.
#[derive(Debug, Clone)]
pub struct CsvReportSink {
    path: PathBuf,
}

impl CsvReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for CsvReportSink {
    fn kind(&self) -> &'static str {
        "csv"
    }

    fn write_report(&self, ctx: &ReportContext<'_>) -> Result<PathBuf> {
        let file = File::create(&self.path)?;
        write_audit_csv(ctx.table, file)?;
        info!(path = %self.path.display(), records = ctx.table.len(), "wrote CSV report");
        Ok(self.path.clone())
    }
}

pub fn write_audit_csv<W: Write>(table: &AuditTable, writer: W) -> Result<()> {
    let header = table.header();
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(header.iter().map(|f| f.as_str()))?;
    for record in &table.records {
        let row: Vec<String> = header
            .iter()
            .map(|f| record.value(*f).map(|v| v.into_owned()).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Re-parse a file produced by [`write_audit_csv`].
pub fn read_audit_csv<R: Read>(reader: R) -> Result<AuditTable> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let header: Vec<CanonicalField> = rdr
        .headers()?
        .iter()
        .map(|name| {
            CanonicalField::from_str(name)
                .map_err(|_| AuditError::InvalidExport(format!("unknown column '{name}'")))
        })
        .collect::<Result<_>>()?;

    let position = |field: CanonicalField| {
        header
            .iter()
            .position(|f| *f == field)
            .ok_or_else(|| AuditError::InvalidExport(format!("missing column '{field}'")))
    };
    let label_at = position(CanonicalField::StatusEnglish)?;
    let score_at = position(CanonicalField::RiskScore)?;
    let level_at = position(CanonicalField::RiskLevel)?;

    let mut columns: Vec<CanonicalField> = header.iter().copied().filter(|f| !f.is_derived()).collect();
    columns.sort();
    columns.dedup();

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let line = i + 2;
        let level = RiskLevel::from_str(&row[level_at])
            .map_err(|_| AuditError::InvalidExport(format!("line {line}: bad risk level '{}'", &row[level_at])))?;
        let score: u8 = row[score_at]
            .trim()
            .parse()
            .map_err(|_| AuditError::InvalidExport(format!("line {line}: bad risk score '{}'", &row[score_at])))?;
        if score != level.score() {
            return Err(AuditError::InvalidExport(format!(
                "line {line}: risk score {score} does not match level {level}"
            )));
        }

        let values: BTreeMap<CanonicalField, String> = header
            .iter()
            .zip(row.iter())
            .filter(|(f, _)| !f.is_derived())
            .map(|(f, v)| (*f, v.to_string()))
            .collect();
        records.push(AuditRecord::new(values, RiskTriple::new(&row[label_at], level)));
    }

    Ok(AuditTable { columns, records })
}
