//! Logger module
//!
//! Sets up `tracing` for the process:
//! - Diagnostics to stderr or the configured error log file
//! - Access log lines (target `access`) to stdout or the access log file
//! - Level filtering from the `logging.level` directive

mod format;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Target of access log events
pub const ACCESS_TARGET: &str = "access";

/// Initialize the global subscriber
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = EnvFilter::try_new(&config.level)?
        .add_directive(format!("{ACCESS_TARGET}=off").parse()?);

    let error_writer = match config.error_log_file.as_deref() {
        Some(path) => BoxMakeWriter::new(Mutex::new(open_log_file(path)?)),
        None => BoxMakeWriter::new(io::stderr),
    };
    let diagnostics = fmt::layer()
        .with_writer(error_writer)
        .with_ansi(config.error_log_file.is_none())
        .with_filter(filter);

    let access = if config.access_log {
        let access_writer = match config.access_log_file.as_deref() {
            Some(path) => BoxMakeWriter::new(Mutex::new(open_log_file(path)?)),
            None => BoxMakeWriter::new(io::stdout),
        };
        Some(
            fmt::layer()
                .with_writer(access_writer)
                .with_ansi(false)
                .without_time()
                .with_level(false)
                .with_target(false)
                .with_filter(Targets::new().with_target(ACCESS_TARGET, Level::INFO)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(diagnostics)
        .with(access)
        .try_init()?;
    Ok(())
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!("Server started, listening on http://{addr}");
    tracing::info!(
        level = %config.logging.level,
        templates = %config.site.template_dir,
        static_dir = %config.site.static_dir,
        "Site configuration"
    );
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    if let Some(ref path) = config.logging.access_log_file {
        tracing::info!("Access log: {path}");
    }
    if let Some(ref path) = config.logging.error_log_file {
        tracing::info!("Error log: {path}");
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
