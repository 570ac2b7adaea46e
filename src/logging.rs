//! Tracing configuration and log routing.
//!
//! The application logs to stdout using a compact formatter, and to a file. When
//! `RUSTY_RAG_LOG_FILE` is set, logs are appended to that path; otherwise a file logger is
//! created under `logs/rusty-rag.log`. A non‑blocking writer keeps file I/O off request paths.
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "rusty-rag.log";

/// Configure tracing subscribers for stdout and file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when available, a file layer.
/// - Uses a global guard to keep the non‑blocking writer alive for the process lifetime.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer(std::env::var("RUSTY_RAG_LOG_FILE").ok()) {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Build a non‑blocking writer for file logging.
///
/// Returns `None` when the log directory cannot be created or the target file cannot be opened.
fn configure_file_writer(path: Option<String>) -> Option<NonBlocking> {
    let (dir, file) = match path.as_deref().map(Path::new) {
        Some(path) => (
            path.parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| ".".into()),
            path.file_name()?.to_os_string(),
        ),
        None => (DEFAULT_LOG_DIR.into(), DEFAULT_LOG_FILE.into()),
    };

    if let Err(err) = std::fs::create_dir_all(&dir) {
        eprintln!("Failed to create log directory {}: {err}", dir.display());
        return None;
    }

    let file_appender = tracing_appender::rolling::never(&dir, file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}
