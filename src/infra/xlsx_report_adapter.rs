use std::path::PathBuf;

use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::app::ports::{ReportContext, ReportSink};
use crate::error::{AuditError, Result};
use crate::types::{AuditTable, CanonicalField};

pub const XLSX_SHEET_NAME: &str = "Audit Report";

fn xlsx_err(err: rust_xlsxwriter::XlsxError) -> AuditError {
    AuditError::Xlsx(err.to_string())
}

/// Writes the classified table to a single "Audit Report" worksheet.
#[derive(Debug, Clone)]
pub struct XlsxReportSink {
    path: PathBuf,
}

impl XlsxReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for XlsxReportSink {
    fn kind(&self) -> &'static str {
        "xlsx"
    }

    fn write_report(&self, ctx: &ReportContext<'_>) -> Result<PathBuf> {
        let mut workbook = build_workbook(ctx.table)?;
        workbook.save(&self.path).map_err(xlsx_err)?;
        info!(path = %self.path.display(), records = ctx.table.len(), "wrote XLSX report");
        Ok(self.path.clone())
    }
}

fn build_workbook(table: &AuditTable) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let header = table.header();

    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET_NAME).map_err(xlsx_err)?;

    for (col, field) in header.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, field.as_str(), &header_format)
            .map_err(xlsx_err)?;
    }

    for (i, record) in table.records.iter().enumerate() {
        let row = i as u32 + 1;
        for (col, field) in header.iter().enumerate() {
            let col = col as u16;
            // scores stay numeric so the sheet can be sorted and charted
            if *field == CanonicalField::RiskScore {
                sheet
                    .write_number(row, col, f64::from(record.risk.score()))
                    .map_err(xlsx_err)?;
                continue;
            }
            match record.value(*field) {
                Some(value) if !value.is_empty() => {
                    sheet.write_string(row, col, &*value).map_err(xlsx_err)?;
                }
                _ => {}
            }
        }
    }

    Ok(workbook)
}

/// Render the table to an in-memory `.xlsx` file.
pub fn render_xlsx(table: &AuditTable) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(table)?;
    workbook.save_to_buffer().map_err(xlsx_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{SheetSelector, SheetSource};
    use crate::infra::workbook_source::{cell_from_data, WorkbookSource};
    use crate::pipeline::processing::AuditSummary;
    use crate::pipeline::AuditPipeline;
    use crate::types::RawSheet;
    use calamine::{open_workbook_auto_from_rs, Reader};
    use chrono::Utc;
    use std::io::Cursor;

    fn classified() -> AuditTable {
        let sheet = RawSheet::from_text_rows(
            "s",
            vec![
                vec!["Klausa/Annex", "Control Name", "Fungsi", "Hasil Observasi"],
                vec!["A.5.1", "Policies", "IT", "Belum Dilakukan"],
                vec!["A.5.2", "Roles", "", "Dilakukan Sebagian"],
                vec!["A.5.3", "Duties", "HR", "tidak jelas"],
            ],
        );
        AuditPipeline::default().process(&sheet).unwrap().table
    }

    fn expected_rows(table: &AuditTable) -> Vec<Vec<String>> {
        let header = table.header();
        std::iter::once(header.iter().map(|f| f.as_str().to_string()).collect())
            .chain(table.records.iter().map(|r| {
                header
                    .iter()
                    .map(|f| r.value(*f).map(|v| v.into_owned()).unwrap_or_default())
                    .collect()
            }))
            .collect()
    }

    #[test]
    fn test_buffer_reads_back_with_calamine() {
        let table = classified();
        let bytes = render_xlsx(&table).unwrap();

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec![XLSX_SHEET_NAME.to_string()]);
        let range = workbook.worksheet_range(XLSX_SHEET_NAME).unwrap();

        let width = table.header().len();
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| {
                let mut cells: Vec<String> = row.iter().map(|d| cell_from_data(d).text().into_owned()).collect();
                cells.resize(width, String::new());
                cells
            })
            .collect();
        assert_eq!(rows, expected_rows(&table));
    }

    #[test]
    fn test_sink_output_feeds_back_into_the_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("laporan.xlsx");
        let table = classified();
        let summary = AuditSummary::from_table(&table);
        let ctx = ReportContext {
            title: "Audit",
            source_name: "checklist.xlsx",
            generated_at: Utc::now(),
            table: &table,
            summary: &summary,
        };

        let written = XlsxReportSink::new(&path).write_report(&ctx).unwrap();
        assert_eq!(written, path);

        let loaded = WorkbookSource::new()
            .load(&path, &SheetSelector::Named("audit report".into()))
            .unwrap();
        assert_eq!(loaded.sheet.name, XLSX_SHEET_NAME);
        assert_eq!(loaded.sheet.rows.len(), table.len() + 1);
        assert_eq!(loaded.sheet.rows[1][5], crate::types::Cell::Number(3.0));
    }
}
