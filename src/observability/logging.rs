use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging, plus a daily-rotated JSON log file when `log_dir` is given.
///
/// Console output goes to stderr so stdout stays reserved for command results.
/// Keep the returned guard alive for the life of the process so buffered file
/// lines are flushed on exit.
pub fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Respect RUST_LOG if set; otherwise default to info for our crate
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("moodle_gateway=info,warn"));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let _ = fs::create_dir_all(dir);
            let file_appender = tracing_appender::rolling::daily(dir, "moodle-gateway.log");
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().json().with_writer(non_blocking_writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}
