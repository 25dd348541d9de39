use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A spreadsheet cell as read from the source file, before any header is known.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// String representation used for header detection, mapping and export.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    Cow::Owned(format!("{}", *n as i64))
                } else {
                    Cow::Owned(n.to_string())
                }
            }
            Cell::Bool(b) => Cow::Owned(b.to_string()),
        }
    }

    /// The cell's text, only when the cell actually holds text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) | Cell::Bool(_) => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

/// Rows × cells of one worksheet, no header assumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Build a sheet from plain text rows; empty strings become `Cell::Empty`.
    pub fn from_text_rows<R, C>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| Cell::from(c.as_ref())).collect())
            .collect();
        Self::new(name, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Canonical column names the pipeline standardizes on, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CanonicalField {
    #[serde(rename = "Clause/Annex")]
    ClauseAnnex,
    #[serde(rename = "Control Name")]
    ControlName,
    #[serde(rename = "Control Description")]
    ControlDescription,
    #[serde(rename = "Audit Question")]
    AuditQuestion,
    #[serde(rename = "Responsible Function")]
    ResponsibleFunction,
    #[serde(rename = "Status Observation")]
    StatusObservation,
    #[serde(rename = "Status English")]
    StatusEnglish,
    #[serde(rename = "Risk Score")]
    RiskScore,
    #[serde(rename = "Risk Level")]
    RiskLevel,
}

impl CanonicalField {
    pub const CATALOG: [CanonicalField; 9] = [
        CanonicalField::ClauseAnnex,
        CanonicalField::ControlName,
        CanonicalField::ControlDescription,
        CanonicalField::AuditQuestion,
        CanonicalField::ResponsibleFunction,
        CanonicalField::StatusObservation,
        CanonicalField::StatusEnglish,
        CanonicalField::RiskScore,
        CanonicalField::RiskLevel,
    ];

    /// Fields that can be mapped from input headers.
    pub const SOURCE: [CanonicalField; 6] = [
        CanonicalField::ClauseAnnex,
        CanonicalField::ControlName,
        CanonicalField::ControlDescription,
        CanonicalField::AuditQuestion,
        CanonicalField::ResponsibleFunction,
        CanonicalField::StatusObservation,
    ];

    /// Fields computed by classification; never taken from input headers.
    pub const DERIVED: [CanonicalField; 3] = [
        CanonicalField::StatusEnglish,
        CanonicalField::RiskScore,
        CanonicalField::RiskLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::ClauseAnnex => "Clause/Annex",
            CanonicalField::ControlName => "Control Name",
            CanonicalField::ControlDescription => "Control Description",
            CanonicalField::AuditQuestion => "Audit Question",
            CanonicalField::ResponsibleFunction => "Responsible Function",
            CanonicalField::StatusObservation => "Status Observation",
            CanonicalField::StatusEnglish => "Status English",
            CanonicalField::RiskScore => "Risk Score",
            CanonicalField::RiskLevel => "Risk Level",
        }
    }

    pub fn is_derived(&self) -> bool {
        Self::DERIVED.contains(self)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = String;

    /// Matches a catalog name, ignoring surrounding whitespace and ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::CATALOG
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown canonical field: {}", s))
    }
}

/// Three-level risk category plus the fallback for unclassifiable statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    pub const RANKED: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn score(&self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::Unknown => 0,
        }
    }

    pub fn from_score(score: u8) -> Option<Self> {
        match score {
            0 => Some(RiskLevel::Unknown),
            1 => Some(RiskLevel::Low),
            2 => Some(RiskLevel::Medium),
            3 => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "unknown" => Ok(RiskLevel::Unknown),
            other => Err(format!("unknown risk level: {}", other)),
        }
    }
}

/// Classification result: English status label and risk level.
/// The numeric score is always derived from the level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskTriple {
    pub label: String,
    pub level: RiskLevel,
}

impl RiskTriple {
    pub fn new(label: impl Into<String>, level: RiskLevel) -> Self {
        Self {
            label: label.into(),
            level,
        }
    }

    pub fn unknown() -> Self {
        Self::new(crate::constants::UNKNOWN_LABEL, RiskLevel::Unknown)
    }

    pub fn score(&self) -> u8 {
        self.level.score()
    }

    pub fn is_unknown(&self) -> bool {
        self.level == RiskLevel::Unknown
    }
}

/// One classified row of the canonical table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub values: BTreeMap<CanonicalField, String>,
    pub risk: RiskTriple,
}

impl AuditRecord {
    pub fn new(values: BTreeMap<CanonicalField, String>, risk: RiskTriple) -> Self {
        Self { values, risk }
    }

    /// Value of any catalog field; derived fields come from the risk triple.
    pub fn value(&self, field: CanonicalField) -> Option<Cow<'_, str>> {
        match field {
            CanonicalField::StatusEnglish => Some(Cow::Borrowed(self.risk.label.as_str())),
            CanonicalField::RiskScore => Some(Cow::Owned(self.risk.score().to_string())),
            CanonicalField::RiskLevel => Some(Cow::Borrowed(self.risk.level.as_str())),
            source => self.values.get(&source).map(|v| Cow::Borrowed(v.as_str())),
        }
    }

    /// `{Clause/Annex} | {Control Name} | {Status English} → {Risk Level}`
    pub fn report_line(&self) -> String {
        let text = |field| self.value(field).unwrap_or(Cow::Borrowed(""));
        format!(
            "{} | {} | {} → {}",
            text(CanonicalField::ClauseAnnex),
            text(CanonicalField::ControlName),
            self.risk.label,
            self.risk.level
        )
    }
}

/// The classified canonical table for one upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditTable {
    /// Source fields actually found, in catalog order.
    pub columns: Vec<CanonicalField>,
    pub records: Vec<AuditRecord>,
}

impl AuditTable {
    /// Output header: found source columns followed by the derived columns.
    pub fn header(&self) -> Vec<CanonicalField> {
        self.columns
            .iter()
            .copied()
            .chain(CanonicalField::DERIVED)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
