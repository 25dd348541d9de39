// Pipeline processing: header location, column mapping, classification and tallies

pub mod classify;
pub mod header;
pub mod mapper;
pub mod summary;

pub use classify::{RiskClassifier, RiskLookupTable, RiskPreset, RiskRule, StatusClassifier};
pub use header::HeaderLocator;
pub use mapper::{ColumnMapper, ColumnMapping, SynonymTable};
pub use summary::AuditSummary;
