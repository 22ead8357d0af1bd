//! Tracing setup for the CLI.
//!
//! Events go to stdout in compact form and are appended to a log file, `FINSUM_LOG_FILE` when set
//! and `logs/finsum.log` otherwise. The provider and Qdrant calls go through `reqwest`, whose
//! connection-level events are clamped to `warn` unless `RUST_LOG` names those targets itself.
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const BASE_FILTER: &str = "info";
const HTTP_CLIENT_TARGETS: [&str; 3] = ["reqwest", "hyper", "hyper_util"];
const DEFAULT_LOG_FILE: &str = "logs/finsum.log";

/// Install the stdout and file subscribers. Call once, before anything logs.
pub fn init_tracing() {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directives = filter_directives(rust_log.as_deref());
    let env_filter = EnvFilter::try_new(&directives).unwrap_or_else(|err| {
        eprintln!("Ignoring invalid RUST_LOG ({err}); using '{BASE_FILTER}'");
        EnvFilter::new(filter_directives(None))
    });

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact());

    let log_path = log_file_path(std::env::var("FINSUM_LOG_FILE").ok().as_deref());
    match open_log_writer(&log_path) {
        Some(writer) => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_ansi(false)
                    .compact(),
            )
            .init(),
        None => registry.init(),
    }
}

/// Filter directives for `rust_log`, with HTTP client targets it leaves unset clamped to `warn`.
fn filter_directives(rust_log: Option<&str>) -> String {
    let base = rust_log
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(BASE_FILTER);

    let mentioned: Vec<&str> = base
        .split(',')
        .filter_map(|directive| directive.split(['=', '[']).next())
        .map(str::trim)
        .collect();

    let mut directives = base.to_string();
    for target in HTTP_CLIENT_TARGETS {
        if !mentioned.contains(&target) {
            directives.push_str(&format!(",{target}=warn"));
        }
    }
    directives
}

fn log_file_path(configured: Option<&str>) -> PathBuf {
    match configured.map(str::trim) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_LOG_FILE),
    }
}

/// `None` when the parent directory or the file cannot be created; stdout logging still works.
fn open_log_writer(path: &Path) -> Option<NonBlocking> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(err) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create log directory {}: {err}", parent.display());
        return None;
    }

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(writer)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
