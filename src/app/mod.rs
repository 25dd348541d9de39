pub mod audit_use_case;
pub mod ports;

pub use audit_use_case::{AuditOutcome, AuditUseCase, UploadRequest};
pub use ports::{LoadedSheet, ReportContext, ReportSink, SheetSelector, SheetSource};
