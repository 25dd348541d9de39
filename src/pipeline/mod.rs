// Audit pipeline: raw grid → header-located table → canonical table → classified table

pub mod processing;

use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::types::{AuditRecord, AuditTable, CanonicalField, RawSheet};
use processing::{ColumnMapper, ColumnMapping, HeaderLocator, RiskClassifier, StatusClassifier};

/// Header row and mapping, without classifying any rows.
#[derive(Debug, Clone)]
pub struct HeaderInspection {
    pub header_index: usize,
    pub headers: Vec<String>,
    pub mapping: ColumnMapping,
}

/// Everything one upload produced.
#[derive(Debug, Clone)]
pub struct ProcessedSheet {
    pub header_index: usize,
    pub mapping: ColumnMapping,
    pub table: AuditTable,
    pub dropped_rows: usize,
}

pub struct AuditPipeline {
    locator: HeaderLocator,
    mapper: ColumnMapper,
    classifier: Box<dyn StatusClassifier + Send + Sync>,
    required: Vec<CanonicalField>,
}

impl AuditPipeline {
    /// Status Observation is always required; classification has nothing to read otherwise.
    pub fn new(
        locator: HeaderLocator,
        mapper: ColumnMapper,
        classifier: Box<dyn StatusClassifier + Send + Sync>,
        required: Vec<CanonicalField>,
    ) -> Self {
        let mut required = required;
        if !required.contains(&CanonicalField::StatusObservation) {
            required.push(CanonicalField::StatusObservation);
        }
        required.sort();
        required.dedup();

        Self {
            locator,
            mapper,
            classifier,
            required,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            HeaderLocator::new(config.marker_phrase.clone()),
            ColumnMapper::new(Arc::clone(&config.synonyms)),
            Box::new(RiskClassifier::new(Arc::clone(&config.risk_table))),
            config.required_fields.clone(),
        )
    }

    pub fn required(&self) -> &[CanonicalField] {
        &self.required
    }

    pub fn inspect(&self, sheet: &RawSheet) -> Result<HeaderInspection> {
        let header_index = self.locator.locate(sheet)?;
        let headers: Vec<String> = sheet.rows[header_index]
            .iter()
            .map(|cell| cell.text().into_owned())
            .collect();
        let mapping = self.mapper.map_headers(&headers);
        Ok(HeaderInspection {
            header_index,
            headers,
            mapping,
        })
    }

    /// Run all stages. Any fatal condition returns an error and no table.
    #[instrument(level = "info", skip(self, sheet), fields(sheet = %sheet.name))]
    pub fn process(&self, sheet: &RawSheet) -> Result<ProcessedSheet> {
        let inspection = self.inspect(sheet)?;
        inspection.mapping.ensure_present(&self.required)?;

        let data_rows = &sheet.rows[inspection.header_index + 1..];
        let canonical = inspection.mapping.apply(data_rows);

        let records: Vec<AuditRecord> = canonical
            .rows
            .into_iter()
            .map(|row| {
                let risk = self
                    .classifier
                    .classify_cell(row.get(&CanonicalField::StatusObservation));
                crate::observability::metrics::classify::row_classified(risk.level);
                let values = row
                    .into_iter()
                    .map(|(field, cell)| (field, cell.text().into_owned()))
                    .collect();
                AuditRecord::new(values, risk)
            })
            .collect();

        crate::observability::metrics::mapping::rows_dropped(canonical.dropped);
        info!(
            header_index = inspection.header_index,
            columns = canonical.columns.len(),
            records = records.len(),
            dropped = canonical.dropped,
            "sheet classified"
        );

        Ok(ProcessedSheet {
            header_index: inspection.header_index,
            mapping: inspection.mapping,
            table: AuditTable {
                columns: canonical.columns,
                records,
            },
            dropped_rows: canonical.dropped,
        })
    }
}

impl Default for AuditPipeline {
    fn default() -> Self {
        Self::new(
            HeaderLocator::default(),
            ColumnMapper::default(),
            Box::new(RiskClassifier::default()),
            Vec::new(),
        )
    }
}
