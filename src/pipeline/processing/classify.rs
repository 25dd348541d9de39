use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constants::{RISK_RULES_ENGLISH, RISK_RULES_INDONESIAN};
use crate::error::{AuditError, Result};
use crate::types::{Cell, RiskLevel, RiskTriple};

/// Default lookup table, initialized once and never mutated.
pub static DEFAULT_RISK_TABLE: Lazy<Arc<RiskLookupTable>> =
    Lazy::new(|| Arc::new(RiskLookupTable::indonesian()));

/// One keyword → (label, level) rule. The score follows from the level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRule {
    pub keyword: String,
    pub label: String,
    pub level: RiskLevel,
}

/// Named rule sets shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskPreset {
    #[default]
    Indonesian,
    English,
}

impl RiskPreset {
    pub fn table(&self) -> RiskLookupTable {
        match self {
            RiskPreset::Indonesian => RiskLookupTable::indonesian(),
            RiskPreset::English => RiskLookupTable::english(),
        }
    }
}

/// Ordered keyword rules; the first rule whose keyword occurs in the status wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskLookupTable {
    rules: Vec<RiskRule>,
}

impl RiskLookupTable {
    pub fn new(rules: Vec<RiskRule>) -> Result<Self> {
        let mut normalized = Vec::with_capacity(rules.len());
        for rule in rules {
            let keyword = rule.keyword.trim().to_lowercase();
            if keyword.is_empty() {
                return Err(AuditError::Config(format!(
                    "risk rule for '{}' has an empty keyword",
                    rule.label
                )));
            }
            if rule.level == RiskLevel::Unknown {
                return Err(AuditError::Config(format!(
                    "risk rule '{}' cannot use the Unknown level; it is reserved for unmatched statuses",
                    keyword
                )));
            }
            normalized.push(RiskRule {
                keyword,
                label: rule.label,
                level: rule.level,
            });
        }
        Ok(Self { rules: normalized })
    }

    fn from_static(rules: &[(&str, &str, RiskLevel)]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(keyword, label, level)| RiskRule {
                    keyword: keyword.to_string(),
                    label: label.to_string(),
                    level: *level,
                })
                .collect(),
        }
    }

    pub fn indonesian() -> Self {
        Self::from_static(RISK_RULES_INDONESIAN)
    }

    pub fn english() -> Self {
        Self::from_static(RISK_RULES_ENGLISH)
    }

    pub fn rules(&self) -> &[RiskRule] {
        &self.rules
    }

    /// First rule whose keyword is contained in `status_lower`.
    pub fn lookup(&self, status_lower: &str) -> Option<&RiskRule> {
        self.rules
            .iter()
            .find(|rule| status_lower.contains(rule.keyword.as_str()))
    }
}

/// Trait for status → risk classification.
pub trait StatusClassifier {
    /// Classify a free-text status. Never fails; unmatched or missing input is Unknown.
    fn classify(&self, status: Option<&str>) -> RiskTriple;

    /// Classify a cell. Only text cells are considered; anything else is Unknown.
    fn classify_cell(&self, cell: Option<&Cell>) -> RiskTriple {
        self.classify(cell.and_then(Cell::as_str))
    }
}

/// Keyword classifier over an injected lookup table.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    table: Arc<RiskLookupTable>,
}

impl RiskClassifier {
    pub fn new(table: Arc<RiskLookupTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RiskLookupTable {
        &self.table
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new(Arc::clone(&DEFAULT_RISK_TABLE))
    }
}

impl StatusClassifier for RiskClassifier {
    fn classify(&self, status: Option<&str>) -> RiskTriple {
        let Some(status) = status else {
            return RiskTriple::unknown();
        };
        let lowered = status.to_lowercase();
        match self.table.lookup(&lowered) {
            Some(rule) => RiskTriple::new(rule.label.clone(), rule.level),
            None => RiskTriple::unknown(),
        }
    }
}
