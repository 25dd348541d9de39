//! Raw header → canonical field mapping.
//!
//! Precedence per header, in column order:
//! 1. exact match against the synonym dictionary;
//! 2. exact (case-insensitive) match against a source canonical name;
//! 3. headers naming a derived field are never mapped;
//! 4. ordered keyword containment on the lower-cased, whitespace-collapsed header;
//! 5. otherwise the column is dropped.
//!
//! Each canonical field is claimed by at most one column; the leftmost wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::{HEADER_EXACT, HEADER_KEYWORDS};
use crate::error::{AuditError, Result};
use crate::types::{CanonicalField, Cell};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Built-in synonym table, shared read-only across uploads.
pub static DEFAULT_SYNONYMS: Lazy<Arc<SynonymTable>> = Lazy::new(|| Arc::new(SynonymTable::builtin()));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSynonym {
    pub raw: String,
    pub field: CanonicalField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    pub keyword: String,
    pub field: CanonicalField,
}

/// Exact spellings plus ordered keyword rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymTable {
    exact: Vec<HeaderSynonym>,
    keywords: Vec<HeaderRule>,
}

impl SynonymTable {
    pub fn new(exact: Vec<HeaderSynonym>, keywords: Vec<HeaderRule>) -> Result<Self> {
        for synonym in &exact {
            if synonym.raw.trim().is_empty() {
                return Err(AuditError::Config("exact header synonym must not be empty".into()));
            }
            check_source_field(synonym.field)?;
        }
        for rule in &keywords {
            if rule.keyword.trim().is_empty() {
                return Err(AuditError::Config("header keyword must not be empty".into()));
            }
            check_source_field(rule.field)?;
        }

        let exact = exact
            .into_iter()
            .map(|s| HeaderSynonym {
                raw: s.raw.trim().to_string(),
                field: s.field,
            })
            .collect();
        let keywords = keywords
            .into_iter()
            .map(|r| HeaderRule {
                keyword: normalize_header(&r.keyword),
                field: r.field,
            })
            .collect();

        Ok(Self { exact, keywords })
    }

    pub fn builtin() -> Self {
        Self {
            exact: HEADER_EXACT
                .iter()
                .map(|(raw, field)| HeaderSynonym {
                    raw: raw.to_string(),
                    field: *field,
                })
                .collect(),
            keywords: HEADER_KEYWORDS
                .iter()
                .map(|(keyword, field)| HeaderRule {
                    keyword: keyword.to_string(),
                    field: *field,
                })
                .collect(),
        }
    }

    pub fn exact(&self) -> &[HeaderSynonym] {
        &self.exact
    }

    pub fn keywords(&self) -> &[HeaderRule] {
        &self.keywords
    }
}

fn check_source_field(field: CanonicalField) -> Result<()> {
    if field.is_derived() {
        return Err(AuditError::Config(format!(
            "'{}' is computed by classification and cannot be mapped from a header",
            field
        )));
    }
    Ok(())
}

/// Lower-case and collapse runs of whitespace (line breaks inside header cells included).
pub fn normalize_header(raw: &str) -> String {
    WHITESPACE
        .replace_all(raw.trim(), " ")
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Canonical,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedReason {
    Blank,
    Derived,
    NoMatch,
    /// Another column already claimed this field (or this exact header).
    Duplicate(CanonicalField),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedColumn {
    pub index: usize,
    pub raw: String,
    pub field: CanonicalField,
    pub matched_by: MatchKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedColumn {
    pub index: usize,
    pub raw: String,
    pub reason: UnmappedReason,
}

/// Raw header → canonical field, built once per upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnMapping {
    mapped: Vec<MappedColumn>,
    unmapped: Vec<UnmappedColumn>,
}

impl ColumnMapping {
    pub fn mapped(&self) -> &[MappedColumn] {
        &self.mapped
    }

    pub fn unmapped(&self) -> &[UnmappedColumn] {
        &self.unmapped
    }

    /// Canonical field for a raw header string (trimmed comparison).
    pub fn get(&self, raw: &str) -> Option<CanonicalField> {
        let raw = raw.trim();
        self.mapped.iter().find(|c| c.raw == raw).map(|c| c.field)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.mapped.iter().any(|c| c.field == field)
    }

    /// Mapped fields in catalog order.
    pub fn fields(&self) -> Vec<CanonicalField> {
        let mut fields: Vec<CanonicalField> = self.mapped.iter().map(|c| c.field).collect();
        fields.sort();
        fields
    }

    /// Required fields absent from the mapping, in catalog order.
    pub fn missing(&self, required: &[CanonicalField]) -> Vec<CanonicalField> {
        let mut missing: Vec<CanonicalField> = required
            .iter()
            .copied()
            .filter(|f| !self.contains(*f))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    pub fn ensure_present(&self, required: &[CanonicalField]) -> Result<()> {
        let missing = self.missing(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AuditError::RequiredColumnsMissing { missing })
        }
    }

    /// Project data rows onto the mapped columns, dropping rows that are blank in all of them.
    pub fn apply(&self, rows: &[Vec<Cell>]) -> CanonicalRows {
        let mut kept = Vec::with_capacity(rows.len());
        let mut dropped = 0usize;

        for row in rows {
            let values: BTreeMap<CanonicalField, Cell> = self
                .mapped
                .iter()
                .map(|col| (col.field, row.get(col.index).cloned().unwrap_or(Cell::Empty)))
                .collect();

            if values.values().all(Cell::is_blank) {
                dropped += 1;
                continue;
            }
            kept.push(values);
        }

        CanonicalRows {
            columns: self.fields(),
            rows: kept,
            dropped,
        }
    }
}

/// Rows renamed to canonical fields, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRows {
    pub columns: Vec<CanonicalField>,
    pub rows: Vec<BTreeMap<CanonicalField, Cell>>,
    pub dropped: usize,
}

enum Resolution {
    Mapped(CanonicalField, MatchKind),
    Unmapped(UnmappedReason),
}

/// Maps raw header rows using an injected synonym table.
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    synonyms: Arc<SynonymTable>,
}

impl ColumnMapper {
    pub fn new(synonyms: Arc<SynonymTable>) -> Self {
        Self { synonyms }
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn map_headers<S: AsRef<str>>(&self, headers: &[S]) -> ColumnMapping {
        let mut mapping = ColumnMapping::default();

        for (index, header) in headers.iter().enumerate() {
            let raw = header.as_ref().trim();
            let resolution = match self.resolve(raw) {
                Resolution::Mapped(field, matched_by) => {
                    if mapping.contains(field) || mapping.get(raw).is_some() {
                        warn!(column = index, header = raw, field = %field, "field already mapped by an earlier column");
                        Resolution::Unmapped(UnmappedReason::Duplicate(field))
                    } else {
                        Resolution::Mapped(field, matched_by)
                    }
                }
                unmapped => unmapped,
            };

            match resolution {
                Resolution::Mapped(field, matched_by) => {
                    debug!(column = index, header = raw, field = %field, ?matched_by, "mapped header");
                    mapping.mapped.push(MappedColumn {
                        index,
                        raw: raw.to_string(),
                        field,
                        matched_by,
                    });
                }
                Resolution::Unmapped(reason) => {
                    if reason != UnmappedReason::Blank {
                        debug!(column = index, header = raw, ?reason, "unmapped header");
                        crate::observability::metrics::mapping::header_unmapped();
                    }
                    mapping.unmapped.push(UnmappedColumn {
                        index,
                        raw: raw.to_string(),
                        reason,
                    });
                }
            }
        }

        mapping
    }

    fn resolve(&self, raw: &str) -> Resolution {
        if raw.is_empty() {
            return Resolution::Unmapped(UnmappedReason::Blank);
        }

        if let Some(synonym) = self.synonyms.exact.iter().find(|s| s.raw == raw) {
            return Resolution::Mapped(synonym.field, MatchKind::Exact);
        }

        if let Ok(field) = raw.parse::<CanonicalField>() {
            return if field.is_derived() {
                Resolution::Unmapped(UnmappedReason::Derived)
            } else {
                Resolution::Mapped(field, MatchKind::Canonical)
            };
        }

        let normalized = normalize_header(raw);
        self.synonyms
            .keywords
            .iter()
            .find(|rule| normalized.contains(&rule.keyword))
            .map(|rule| Resolution::Mapped(rule.field, MatchKind::Keyword))
            .unwrap_or(Resolution::Unmapped(UnmappedReason::NoMatch))
    }
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self::new(Arc::clone(&DEFAULT_SYNONYMS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawSheet;

    #[test]
    fn test_indonesian_header_row_maps_fully() {
        let headers = [
            "Klausa/Annex",
            "Control Name",
            "Persyaratan",
            "Pertanyaan",
            "Fungsi",
            "Hasil Observasi",
        ];
        let mapping = ColumnMapper::default().map_headers(&headers);
        assert!(mapping.unmapped().is_empty());
        assert_eq!(mapping.fields(), CanonicalField::SOURCE.to_vec());
        assert!(mapping.mapped().iter().all(|c| c.matched_by == MatchKind::Exact));
        assert_eq!(mapping.get("Hasil Observasi"), Some(CanonicalField::StatusObservation));
    }

    #[test]
    fn test_canonical_headers_map_to_themselves() {
        let headers: Vec<&str> = CanonicalField::SOURCE.iter().map(|f| f.as_str()).collect();
        let mapping = ColumnMapper::default().map_headers(&headers);
        for column in mapping.mapped() {
            assert_eq!(column.raw, column.field.as_str());
        }
        assert_eq!(mapping.fields(), CanonicalField::SOURCE.to_vec());

        let renamed: Vec<&str> = mapping.fields().iter().map(|f| f.as_str()).collect();
        let again = ColumnMapper::default().map_headers(&renamed);
        assert_eq!(again.fields(), mapping.fields());
    }

    #[test]
    fn test_keyword_fallback_handles_variants() {
        let headers = [
            "No",
            "Annex",
            "Fungsi Terkait",
            "Pedoman / TKO",
            "Gap Assessment",
            "Status",
            "Risk",
        ];
        let mapping = ColumnMapper::default().map_headers(&headers);
        assert_eq!(mapping.get("Annex"), Some(CanonicalField::ClauseAnnex));
        assert_eq!(mapping.get("Fungsi Terkait"), Some(CanonicalField::ResponsibleFunction));
        assert_eq!(mapping.get("Pedoman / TKO"), Some(CanonicalField::ControlDescription));
        assert_eq!(mapping.get("Status"), Some(CanonicalField::StatusObservation));
        assert_eq!(mapping.get("No"), None);
        assert_eq!(mapping.get("Risk"), None);
        assert_eq!(mapping.unmapped().len(), 3);
    }

    #[test]
    fn test_multiline_header_cells_are_collapsed() {
        let mapping = ColumnMapper::default().map_headers(&["CONTROL\n  NAME", "Hasil\tObservasi Auditor"]);
        assert_eq!(mapping.fields(), vec![CanonicalField::ControlName, CanonicalField::StatusObservation]);
    }

    #[test]
    fn test_keyword_order_decides_overlaps() {
        // "klausa" precedes the generic "status" rule
        let mapping = ColumnMapper::default().map_headers(&["Status Klausa"]);
        assert_eq!(mapping.get("Status Klausa"), Some(CanonicalField::ClauseAnnex));
    }

    #[test]
    fn test_derived_headers_are_never_mapped() {
        let mapping = ColumnMapper::default().map_headers(&["Status English", "Risk Level", "Hasil Observasi"]);
        assert_eq!(mapping.fields(), vec![CanonicalField::StatusObservation]);
        assert_eq!(mapping.unmapped()[0].reason, UnmappedReason::Derived);
    }

    #[test]
    fn test_first_column_claims_a_field() {
        let mapping = ColumnMapper::default().map_headers(&["Annex", "Klausa", "Status"]);
        assert_eq!(mapping.get("Annex"), Some(CanonicalField::ClauseAnnex));
        assert_eq!(mapping.get("Klausa"), None);
        assert_eq!(
            mapping.unmapped()[0].reason,
            UnmappedReason::Duplicate(CanonicalField::ClauseAnnex)
        );
    }

    #[test]
    fn test_missing_required_fields_are_listed() {
        let mapping = ColumnMapper::default().map_headers(&["Control Name", "Fungsi"]);
        let err = mapping
            .ensure_present(&[CanonicalField::StatusObservation, CanonicalField::ClauseAnnex])
            .unwrap_err();
        match err {
            AuditError::RequiredColumnsMissing { missing } => {
                assert_eq!(missing, vec![CanonicalField::ClauseAnnex, CanonicalField::StatusObservation]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(mapping.ensure_present(&[CanonicalField::ControlName]).is_ok());
    }

    #[test]
    fn test_apply_drops_blank_rows_and_pads_short_rows() {
        let sheet = RawSheet::from_text_rows(
            "s",
            vec![
                vec!["A.5.1", "ignored", "Sudah Dilakukan"],
                vec!["", "only unmapped data", "  "],
                vec!["A.5.2"],
            ],
        );
        let mapping = ColumnMapper::default().map_headers(&["Klausa/Annex", "Catatan", "Hasil Observasi"]);
        let canonical = mapping.apply(&sheet.rows);
        assert_eq!(canonical.dropped, 1);
        assert_eq!(canonical.rows.len(), 2);
        assert_eq!(canonical.columns, vec![CanonicalField::ClauseAnnex, CanonicalField::StatusObservation]);
        assert_eq!(canonical.rows[1][&CanonicalField::StatusObservation], Cell::Empty);
        assert!(!canonical.rows[0].contains_key(&CanonicalField::ControlName));
    }

    #[test]
    fn test_custom_table_rejects_derived_targets() {
        let result = SynonymTable::new(
            Vec::new(),
            vec![HeaderRule {
                keyword: "risk".into(),
                field: CanonicalField::RiskLevel,
            }],
        );
        assert!(matches!(result, Err(AuditError::Config(_))));
    }

    #[test]
    fn test_custom_keywords_are_normalized() {
        let table = SynonymTable::new(
            Vec::new(),
            vec![HeaderRule {
                keyword: "  Kondisi   SAAT ini ".into(),
                field: CanonicalField::StatusObservation,
            }],
        )
        .unwrap();
        let mapper = ColumnMapper::new(Arc::new(table));
        let mapping = mapper.map_headers(&["Kondisi saat ini (2024)"]);
        assert_eq!(mapping.fields(), vec![CanonicalField::StatusObservation]);
    }
}
