use thiserror::Error;

use crate::types::CanonicalField;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("header row not found: no row contains the marker phrase '{marker}'")]
    HeaderNotFound { marker: String },

    #[error("required columns missing: {}", join_fields(.missing))]
    RequiredColumnsMissing { missing: Vec<CanonicalField> },

    #[error("failed to read spreadsheet '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("sheet '{sheet}' not found (available: {})", join_names(.available))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("invalid audit export: {0}")]
    InvalidExport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("XLSX rendering failed: {0}")]
    Xlsx(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuditError {
    pub fn file_read<E>(path: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        AuditError::FileRead {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Fatal errors abort a single upload; everything else is an export or setup failure.
    pub fn is_upload_fatal(&self) -> bool {
        matches!(
            self,
            AuditError::HeaderNotFound { .. }
                | AuditError::RequiredColumnsMissing { .. }
                | AuditError::FileRead { .. }
                | AuditError::SheetNotFound { .. }
        )
    }
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_names(names: &[String]) -> String {
    names.join(", ")
}

pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_columns_message_lists_fields() {
        let err = AuditError::RequiredColumnsMissing {
            missing: vec![CanonicalField::ControlName, CanonicalField::StatusObservation],
        };
        assert_eq!(
            err.to_string(),
            "required columns missing: Control Name, Status Observation"
        );
        assert!(err.is_upload_fatal());
    }

    #[test]
    fn test_file_read_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = AuditError::file_read("audit.xlsx", io);
        assert!(err.to_string().contains("audit.xlsx"));
        assert!(err.to_string().contains("no such file"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
