use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the non-blocking writers flushing until dropped at process exit.
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

/// Initialize logging for the pool CLI: `{service_name}.log` under `log_dir`
/// plus console output on stderr (stdout is reserved for command output).
/// Each run starts a fresh log file; the previous one is kept with a timestamp.
pub fn init_service_logging(log_dir: &str, service_name: &str) -> Result<LoggingGuard, anyhow::Error> {
    // RUST_LOG overrides the default level
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if !log_dir_writable(log_dir) {
        let (console_writer, console_guard) = non_blocking(std::io::stderr());
        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_ansi(true)
            .with_target(false)
            .with_thread_ids(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()?;

        info!("Logging initialized - console output only (could not create {log_dir})");
        return Ok(LoggingGuard {
            _guards: vec![console_guard],
        });
    }

    let _ = rotate_logs_on_startup(log_dir, service_name);

    let (file_writer, file_guard) = non_blocking(file_appender(log_dir, service_name));
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    let (console_writer, console_guard) = non_blocking(std::io::stderr());
    let console_layer = fmt::layer()
        .with_writer(console_writer)
        .with_ansi(true)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    info!("Logging initialized - logs will be written to {log_dir}/{service_name}.log");
    Ok(LoggingGuard {
        _guards: vec![file_guard, console_guard],
    })
}

// Undated file name so the startup rotation can find it
fn file_appender(log_dir: &str, service_name: &str) -> RollingFileAppender {
    tracing_appender::rolling::never(log_dir, format!("{service_name}.log"))
}

fn log_dir_writable(log_dir: &str) -> bool {
    let probe = format!("{log_dir}/.test_write");
    std::fs::create_dir_all(log_dir)
        .and_then(|_| std::fs::File::create(&probe))
        .map(|_| std::fs::remove_file(&probe))
        .is_ok()
}

pub fn rotate_logs_on_startup(log_dir: &str, service_name: &str) -> Result<(), anyhow::Error> {
    let log_file = format!("{log_dir}/{service_name}.log");
    let log_path = Path::new(&log_file);

    if log_path.exists() {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let backup_file = format!("{log_dir}/{service_name}.{timestamp}.log");

        std::fs::rename(&log_file, &backup_file)?;
        info!("Previous log file backed up to: {backup_file}");
    }

    Ok(())
}
