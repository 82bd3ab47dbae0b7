//! File logging for cdis-client.
//!
//! Records go to `cdis-client.log.YYYY-MM-DD` under the XDG state directory and
//! never to the terminal, so stdout carries only API responses. Only the most
//! recent week of files is kept.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::error::ClientError;

/// Base name of the daily log files.
pub const LOG_FILE_PREFIX: &str = "cdis-client.log";

const APP_DIR: &str = "cdis-client";
const KEEP_LOG_FILES: usize = 7;

/// Flushes buffered log records when dropped; hold it until the command ends.
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Installs the global subscriber writing to the daily log file.
///
/// The level comes from `RUST_LOG` and falls back to `info`; unparseable
/// directives are skipped rather than failing the command.
///
/// # Errors
/// - If the log directory cannot be resolved or created
/// - If a global subscriber is already installed
pub fn init_logging() -> Result<LogGuard, anyhow::Error> {
    let dir = log_dir()?;
    fs::create_dir_all(&dir)?;

    let pruned = prune_logs(&dir, KEEP_LOG_FILES).unwrap_or_else(|e| {
        eprintln!("Warning: could not prune old logs in {}: {e}", dir.display());
        0
    });

    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, worker) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .try_init()?;

    tracing::debug!("Logging to {} ({} old files pruned)", dir.display(), pruned);
    Ok(LogGuard { _worker: worker })
}

/// Directory holding the log files. It is not created here.
pub fn log_dir() -> Result<PathBuf, ClientError> {
    log_dir_from(std::env::var_os("XDG_STATE_HOME"), dirs::home_dir())
}

/// `$XDG_STATE_HOME/cdis-client`, or `~/.local/state/cdis-client` when the
/// variable is unset, empty or relative.
fn log_dir_from(xdg_state: Option<OsString>, home: Option<PathBuf>) -> Result<PathBuf, ClientError> {
    match xdg_state.map(PathBuf::from).filter(|p| p.is_absolute()) {
        Some(state) => Ok(state.join(APP_DIR)),
        None => home
            .map(|home| home.join(".local").join("state").join(APP_DIR))
            .ok_or(ClientError::Environment),
    }
}

/// Dated log files in `dir`, newest first.
pub fn dated_logs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut logs: Vec<(PathBuf, SystemTime)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.file_name().and_then(|n| n.to_str()).is_some_and(is_dated_log) {
            continue;
        }
        if let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) {
            logs.push((path, modified));
        }
    }
    // Same mtime: the later date in the name wins.
    logs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    Ok(logs.into_iter().map(|(path, _)| path).collect())
}

fn is_dated_log(file_name: &str) -> bool {
    file_name
        .strip_prefix(LOG_FILE_PREFIX)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|date| {
            date.split('-').map(str::len).eq([4, 2, 2]) && date.chars().all(|c| c.is_ascii_digit() || c == '-')
        })
}

/// Deletes all but the `keep` newest dated log files and returns how many went.
fn prune_logs(dir: &Path, keep: usize) -> io::Result<usize> {
    let mut removed = 0;
    for path in dated_logs(dir)?.into_iter().skip(keep) {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Warning: could not delete {}: {e}", path.display()),
        }
    }
    Ok(removed)
}
