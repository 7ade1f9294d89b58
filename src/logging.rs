use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AppConfig, logs_directory};

const LOG_ENV: &str = "TAGFLEET_LOG";
const FALLBACK_DIRECTIVES: &str = "tagfleet=info,warn";
const ROLLING_PREFIX: &str = "tagfleet.log";

/// Keeps the file writer's worker alive for the lifetime of the process.
static WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Everything the subscriber needs, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directives: String,
    /// `None` disables the rolling file.
    pub directory: Option<PathBuf>,
    /// Rolled files kept on disk; 0 keeps all of them.
    pub keep_files: usize,
}

impl LogSettings {
    pub fn resolve(config: &AppConfig, env_directives: Option<&str>, directory: PathBuf) -> Self {
        Self {
            directives: pick_directives(env_directives),
            directory: directory.is_dir().then_some(directory),
            keep_files: config.log_retention_files(),
        }
    }
}

/// `TAGFLEET_LOG` when it parses as a filter, else the built-in directives.
fn pick_directives(candidate: Option<&str>) -> String {
    candidate
        .map(str::trim)
        .filter(|value| !value.is_empty() && EnvFilter::try_new(value).is_ok())
        .unwrap_or(FALLBACK_DIRECTIVES)
        .to_string()
}

/// Installs the global subscriber: compact text on stdout, JSON lines in a daily file.
pub fn init_tracing(config: &AppConfig) {
    let settings = LogSettings::resolve(
        config,
        std::env::var(LOG_ENV).ok().as_deref(),
        logs_directory(),
    );

    let (file_writer, pruned) = match settings.directory.as_deref() {
        Some(dir) => match open_rolling_writer(dir, settings.keep_files) {
            Ok((writer, guard, pruned)) => {
                let _ = WRITER_GUARD.set(guard);
                (Some(writer), pruned)
            }
            Err(_) => (None, 0),
        },
        None => (None, 0),
    };

    let console = fmt::layer().compact().with_target(true);
    let file = file_writer.map(|writer| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer)
    });

    let installed = tracing_subscriber::registry()
        .with(EnvFilter::new(&settings.directives))
        .with(console)
        .with(file)
        .try_init();

    if installed.is_ok() {
        tracing::debug!(
            target: "tagfleet::logging",
            directives = %settings.directives,
            directory = ?settings.directory,
            pruned,
            "logging ready"
        );
    }
}

/// Prunes stale files first, then opens today's file behind a background writer.
fn open_rolling_writer(
    dir: &Path,
    keep_files: usize,
) -> io::Result<(NonBlocking, WorkerGuard, usize)> {
    let pruned = prune_rolled_files(dir, keep_files)?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, ROLLING_PREFIX));
    Ok((writer, guard, pruned))
}

/// Rolled names end in an ISO date, so name order is age order. Returns how many
/// files were removed.
fn prune_rolled_files(dir: &Path, keep_files: usize) -> io::Result<usize> {
    if keep_files == 0 {
        return Ok(0);
    }

    let mut rolled: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(ROLLING_PREFIX))
        })
        .collect();
    if rolled.len() <= keep_files {
        return Ok(0);
    }

    rolled.sort();
    let stale = rolled.len() - keep_files;
    let mut removed = 0;
    for path in &rolled[..stale] {
        if fs::remove_file(path).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}
