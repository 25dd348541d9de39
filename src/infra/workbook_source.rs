use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, instrument, warn};

use crate::app::ports::{LoadedSheet, SheetSelector, SheetSource};
use crate::error::{AuditError, Result};
use crate::types::{Cell, RawSheet};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads one worksheet from a spreadsheet file on disk.
///
/// `.csv` files go through the `csv` reader (delimiter sniffed from the first
/// line); everything else is handed to calamine, which detects xlsx, xlsm,
/// xlsb, xls and ods by content.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookSource;

impl WorkbookSource {
    pub fn new() -> Self {
        Self
    }

    /// Parse already-read bytes. `path` is only used for format detection and naming.
    pub fn read_bytes(&self, path: &Path, bytes: Vec<u8>, selector: &SheetSelector) -> Result<RawSheet> {
        let display = path.display().to_string();
        if is_csv(path) {
            if let SheetSelector::Named(name) = selector {
                warn!(sheet = %name, "CSV files have a single sheet; ignoring sheet selection");
            }
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "csv".to_string());
            read_csv_sheet(&bytes, name).map_err(|e| AuditError::file_read(display, e))
        } else {
            read_workbook_sheet(&display, bytes, selector)
        }
    }
}

impl SheetSource for WorkbookSource {
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    fn load(&self, path: &Path, selector: &SheetSelector) -> Result<LoadedSheet> {
        let bytes = fs::read(path).map_err(|e| AuditError::file_read(path.display().to_string(), e))?;
        let digest = fingerprint(&bytes);
        let size_bytes = bytes.len();
        let sheet = self.read_bytes(path, bytes, selector)?;
        Ok(LoadedSheet {
            sheet,
            digest,
            size_bytes,
        })
    }
}

/// SHA-256 of the raw file bytes, hex encoded.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Semicolon-separated exports are common with comma-decimal locales.
fn sniff_delimiter(data: &[u8]) -> u8 {
    let first_line = data
        .split(|b| *b == b'\n')
        .find(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
        .unwrap_or(&[]);
    let commas = first_line.iter().filter(|b| **b == b',').count();
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn read_csv_sheet(bytes: &[u8], name: String) -> std::result::Result<RawSheet, csv::Error> {
    let data = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(data))
        .from_reader(data);

    let mut rows = Vec::new();
    for record in rdr.byte_records() {
        let record = record?;
        // lossy decoding keeps legacy-encoded exports readable
        let row: Vec<Cell> = record
            .iter()
            .map(|field| Cell::from(&*String::from_utf8_lossy(field)))
            .collect();
        rows.push(row);
    }
    debug!(rows = rows.len(), "parsed CSV sheet");
    Ok(RawSheet::new(name, rows))
}

fn read_workbook_sheet(display: &str, bytes: Vec<u8>, selector: &SheetSelector) -> Result<RawSheet> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| AuditError::file_read(display, e))?;
    let available = workbook.sheet_names();

    let name = match selector {
        SheetSelector::First => available.first().cloned().ok_or_else(|| {
            AuditError::file_read(display, "workbook contains no sheets")
        })?,
        SheetSelector::Named(wanted) => available
            .iter()
            .find(|n| *n == wanted)
            .or_else(|| available.iter().find(|n| n.eq_ignore_ascii_case(wanted)))
            .cloned()
            .ok_or_else(|| AuditError::SheetNotFound {
                sheet: wanted.clone(),
                available: available.clone(),
            })?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| AuditError::file_read(display, e))?;
    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();
    debug!(sheet = %name, rows = rows.len(), "parsed workbook sheet");
    Ok(RawSheet::new(name, rows))
}

/// Convert a calamine cell. Dates and error cells keep their display text.
pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        other => Cell::from(other.to_string().as_str()),
    }
}
