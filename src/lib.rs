pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod types;

// Layered boundaries: use cases and ports in app, file adapters in infra
pub mod app;
pub mod infra;

pub use error::{AuditError, Result};
