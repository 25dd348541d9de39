use serde::Serialize;
use std::collections::BTreeMap;

use crate::constants::UNASSIGNED_FUNCTION;
use crate::types::{AuditRecord, AuditTable, CanonicalField, RiskLevel};

/// A high-risk control that needs mitigation first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityItem {
    pub clause: String,
    pub control: String,
    pub function: String,
    pub status: String,
    /// Auditor's observation text as written in the sheet.
    pub observation: String,
}

/// Tallies over one classified table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    /// Low, Medium and High are always present; Unknown is included as well.
    pub by_level: BTreeMap<RiskLevel, usize>,
    pub implemented: usize,
    pub not_implemented: usize,
    /// Responsible function → English status → count.
    pub per_function: BTreeMap<String, BTreeMap<String, usize>>,
    pub high_risk: Vec<PriorityItem>,
}

impl AuditSummary {
    pub fn from_table(table: &AuditTable) -> Self {
        let mut by_level: BTreeMap<RiskLevel, usize> = RiskLevel::RANKED
            .iter()
            .chain(std::iter::once(&RiskLevel::Unknown))
            .map(|level| (*level, 0))
            .collect();
        let mut per_function: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        let mut high_risk = Vec::new();

        for record in &table.records {
            *by_level.entry(record.risk.level).or_default() += 1;

            *per_function
                .entry(function_of(record))
                .or_default()
                .entry(record.risk.label.clone())
                .or_default() += 1;

            if record.risk.level == RiskLevel::High {
                high_risk.push(PriorityItem {
                    clause: text_of(record, CanonicalField::ClauseAnnex),
                    control: text_of(record, CanonicalField::ControlName),
                    function: function_of(record),
                    status: record.risk.label.clone(),
                    observation: text_of(record, CanonicalField::StatusObservation),
                });
            }
        }

        let total = table.records.len();
        let implemented = by_level.get(&RiskLevel::Low).copied().unwrap_or(0);

        Self {
            total,
            by_level,
            implemented,
            not_implemented: total - implemented,
            per_function,
            high_risk,
        }
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        self.by_level.get(&level).copied().unwrap_or(0)
    }
}

fn text_of(record: &AuditRecord, field: CanonicalField) -> String {
    record
        .value(field)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn function_of(record: &AuditRecord) -> String {
    let function = text_of(record, CanonicalField::ResponsibleFunction);
    if function.is_empty() {
        UNASSIGNED_FUNCTION.to_string()
    } else {
        function
    }
}
