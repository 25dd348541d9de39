//! Built-in reference tables and defaults.
//!
//! Every table here is ordered: the first matching entry wins, so more specific
//! keywords must come before generic ones.

use crate::types::{CanonicalField, RiskLevel};

/// Marker phrase identifying the header row.
pub const DEFAULT_MARKER_PHRASE: &str = "Control Name";

pub const CONFIG_FILE_NAME: &str = "autoaudit.toml";
pub const CONFIG_ENV_VAR: &str = "AUTOAUDIT_CONFIG";

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const LOG_FILE_NAME: &str = "autoaudit.log";

pub const DEFAULT_REPORT_TITLE: &str = "AutoAudit - IT Audit Report";

/// Label used when no risk rule matches a status.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Bucket for rows without a responsible function in per-function tallies.
pub const UNASSIGNED_FUNCTION: &str = "(unassigned)";

/// Exact raw header spellings (trimmed, case-sensitive).
pub const HEADER_EXACT: &[(&str, CanonicalField)] = &[
    ("Klausa/Annex", CanonicalField::ClauseAnnex),
    ("Control Name", CanonicalField::ControlName),
    ("Persyaratan", CanonicalField::ControlDescription),
    ("Pertanyaan", CanonicalField::AuditQuestion),
    ("Fungsi", CanonicalField::ResponsibleFunction),
    ("Hasil Observasi", CanonicalField::StatusObservation),
];

/// Keyword containment rules, tested against the lower-cased header.
pub const HEADER_KEYWORDS: &[(&str, CanonicalField)] = &[
    ("klausa", CanonicalField::ClauseAnnex),
    ("annex", CanonicalField::ClauseAnnex),
    ("clause", CanonicalField::ClauseAnnex),
    ("control name", CanonicalField::ControlName),
    ("nama kontrol", CanonicalField::ControlName),
    ("persyaratan", CanonicalField::ControlDescription),
    ("pedoman", CanonicalField::ControlDescription),
    ("description", CanonicalField::ControlDescription),
    ("deskripsi", CanonicalField::ControlDescription),
    ("pertanyaan", CanonicalField::AuditQuestion),
    ("question", CanonicalField::AuditQuestion),
    ("fungsi", CanonicalField::ResponsibleFunction),
    ("function", CanonicalField::ResponsibleFunction),
    ("observasi", CanonicalField::StatusObservation),
    ("hasil", CanonicalField::StatusObservation),
    ("status", CanonicalField::StatusObservation),
];

/// Indonesian observation keywords (the reference table).
pub const RISK_RULES_INDONESIAN: &[(&str, &str, RiskLevel)] = &[
    ("belum", "Not Implemented", RiskLevel::High),
    ("sebagian", "Partially Implemented", RiskLevel::Medium),
    ("sudah", "Implemented", RiskLevel::Low),
];

/// English status vocabulary. Every negated or qualified form must precede
/// the bare "implemented" rule, which would otherwise swallow it.
pub const RISK_RULES_ENGLISH: &[(&str, &str, RiskLevel)] = &[
    ("not implemented", "Not Implemented", RiskLevel::High),
    ("unimplemented", "Not Implemented", RiskLevel::High),
    ("not yet", "Not Implemented", RiskLevel::High),
    (": no", "Not Implemented", RiskLevel::High),
    ("not fully", "Partially Implemented", RiskLevel::Medium),
    ("partial", "Partially Implemented", RiskLevel::Medium),
    ("implemented", "Implemented", RiskLevel::Low),
];
