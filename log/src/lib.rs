//! Logging setup for the registry editor with file output and optional console output.
//!
//! Logs always go to a file at `warn` level, or at the level set in the environment.
//! Console logging goes to stderr, so stdout stays clean for default dumps. It is enabled
//! when `REGEDIT_LOG` or `RUST_LOG` is set, or in debug builds.
//!
//! ## Environment Variables
//!
//! 1. **`REGEDIT_LOG`** (highest priority) - level for the workspace crates, or a full filter
//! 2. **`RUST_LOG`** - Standard tracing environment variable
//! 3. **Default** - `warn` globally, `info` for workspace crates
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/aoikregistryeditor/logs/regedit-<pid>.log`
//! - Linux: `~/.local/share/aoikregistryeditor/logs/regedit-12345.log`
//! - Windows: `%LOCALAPPDATA%\aoikregistryeditor\logs\regedit-12345.log`
//!
//! Override with `--log-file <path>` or `AOIK_REGEDIT_LOG_FILE`.

use std::{
    env,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub const LOG_ENV: &str = "REGEDIT_LOG";

const CRATES: &[&str] = &["regedit", "regedit_script", "regedit_bin", "regedit_log"];

type Error = Box<dyn std::error::Error + Send + Sync>;

/// Returned from [`init`]; must be held alive to ensure log file flushing.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

#[derive(Debug, Default)]
pub struct LogConfig {
    pub log_file_path: Option<PathBuf>,
}

/// Initialize logging.
///
/// Filters follow the priority in the module docs: `REGEDIT_LOG` > `RUST_LOG` > defaults.
///
/// The returned [`LogGuard`] must be held for the lifetime of the program;
/// dropping it flushes and stops the background file writer.
pub fn init(config: LogConfig) -> Result<LogGuard, Error> {
    let (log_dir, filename) = resolve_log_path(config.log_file_path);

    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(create_file_filter()?);

    let console_enabled =
        env::var(LOG_ENV).is_ok() || env::var("RUST_LOG").is_ok() || cfg!(debug_assertions);

    let console_layer = if console_enabled {
        Some(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(create_filter()?),
        )
    } else {
        None
    };

    Registry::default()
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: log_dir.join(filename),
    })
}

/// Initialize logging for tests.
///
/// Console only, no file output. Will not crash if called multiple times or if
/// logging is already initialized by another test.
#[allow(clippy::let_unit_value)]
pub fn test() {
    let _ = test_init();
}

fn test_init() -> Result<(), Error> {
    let filter = create_filter()?;
    fmt().with_env_filter(filter).with_test_writer().try_init()?;
    Ok(())
}

/// Split the log file location into directory and file name.
///
/// An override with an extension names the file; one without names the directory.
fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("regedit-{}.log", std::process::id());

    if let Some(path) = override_path {
        if path.extension().is_some() {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename);
            return (dir.to_path_buf(), name);
        }
        return (path, filename);
    }

    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aoikregistryeditor")
        .join("logs");

    (dir, filename)
}

/// File filter: uses user-specified level if set, otherwise defaults to `warn`.
fn create_file_filter() -> Result<EnvFilter, Error> {
    if env::var(LOG_ENV).is_ok() || env::var("RUST_LOG").is_ok() {
        return create_filter();
    }
    Ok(EnvFilter::new("warn"))
}

fn create_filter() -> Result<EnvFilter, Error> {
    if let Ok(regedit_log) = env::var(LOG_ENV) {
        return Ok(EnvFilter::new(expand_regedit_log(&regedit_log)));
    }

    if let Ok(rust_log) = env::var("RUST_LOG") {
        return Ok(EnvFilter::new(rust_log));
    }

    Ok(EnvFilter::new(expand_regedit_log("info")))
}

/// Expand a bare level such as `debug` to every workspace crate.
///
/// Values with filter syntax (`=`, `:` or `,`) are used as-is.
fn expand_regedit_log(value: &str) -> String {
    if value.contains('=') || value.contains(':') || value.contains(',') {
        return value.to_string();
    }

    let mut filter = String::from("warn");
    for name in CRATES {
        filter.push_str(&format!(",{name}={value}"));
    }
    filter
}
