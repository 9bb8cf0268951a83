use crate::models::LoggingSettings;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive for the requested verbosity.
///
/// Debug mode only raises this crate to `debug`; HTTP and TLS internals stay at
/// `info` so request bodies and handshakes don't flood the log.
pub fn filter_directive(debug_mode: bool) -> &'static str {
    if debug_mode {
        "info,ppe_console=debug"
    } else {
        "info"
    }
}

/// Setup logging with a daily rotating file appender and optional console output.
///
/// # Arguments
/// * `settings` - Log directory, file prefix, debug level and console toggle
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(settings: &LoggingSettings) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_path = Utf8PathBuf::from(&settings.dir);
    if !log_path.exists() {
        fs::create_dir_all(&log_path)
            .with_context(|| format!("Failed to create log directory: {}", settings.dir))?;
    }

    let file_appender = rolling::daily(&settings.dir, &settings.prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::new(filter_directive(settings.debug));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // The console prints its own prompt and results on stdout, so console logs go to stderr
    let console_layer = settings.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        settings.dir,
        settings.prefix,
        settings.debug,
        settings.console
    );

    Ok(guard)
}
