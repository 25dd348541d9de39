use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::LOG_FILE_NAME;

/// Initializes logging with a JSON file layer and a human-readable stderr layer.
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the lifetime of the process.
pub fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autoaudit=info"));

    // console output goes to stderr; stdout carries JSON summaries
    if fs::create_dir_all(log_dir).is_err() {
        let _ = tracing_subscriber::registry()
            .with(filter())
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init();
        tracing::warn!(dir = %log_dir.display(), "log directory unavailable; logging to stderr only");
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(file_layer)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();

    Some(guard)
}
