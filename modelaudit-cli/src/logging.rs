//! Tracing setup.
//!
//! Stdout carries the NDJSON records, so logs never go there. `LOG_LEVEL`
//! (0 silent, 1 info, 2 debug) and `LOG_FILE` select a JSON log file; `-v`
//! or `RUST_LOG` additionally turn on human-readable logs on stderr.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Resolved logging destinations and levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPlan {
    /// Directive for the stderr layer, `None` when it is off.
    pub stderr: Option<String>,
    /// Log file and its directive.
    pub file: Option<(PathBuf, String)>,
}

fn level_for(log_level: Option<&str>) -> Option<&'static str> {
    match log_level.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(0) {
        i64::MIN..=0 => None,
        1 => Some("info"),
        _ => Some("debug"),
    }
}

pub fn plan(
    verbose: u8,
    rust_log: Option<&str>,
    log_level: Option<&str>,
    log_file: Option<&Path>,
) -> LogPlan {
    let stderr = match (verbose, rust_log) {
        (0, Some(directive)) if !directive.trim().is_empty() => Some(directive.to_string()),
        (0, _) => None,
        (1, _) => Some("info".to_string()),
        _ => Some("debug".to_string()),
    };
    let file = match (log_file, level_for(log_level)) {
        (Some(path), Some(level)) if !path.as_os_str().is_empty() => {
            Some((path.to_path_buf(), level.to_string()))
        }
        _ => None,
    };
    LogPlan { stderr, file }
}

/// Install the subscriber. Keep the returned guard alive until exit so the
/// file writer flushes.
pub fn init(plan: &LogPlan) -> Option<WorkerGuard> {
    let stderr_layer = plan.stderr.as_ref().map(|directive| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::new(directive))
    });

    let mut guard = None;
    let file_layer = plan.file.as_ref().and_then(|(path, directive)| {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let name = path.file_name()?;
        if std::fs::create_dir_all(dir).is_err() {
            eprintln!("Invalid log file path: {}", path.display());
            return None;
        }
        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, worker) = tracing_appender::non_blocking(appender);
        guard = Some(worker);
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(directive)),
        )
    });

    // Fails only when a global subscriber is already set.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    guard
}
