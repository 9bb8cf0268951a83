//! PPE Console - operator console for PPE entry checks
//!
//! Main entry point for the terminal application.
//!
//! # Overview
//!
//! This binary initializes:
//! - Configuration ([`ConfigManager`]: defaults, `console.yaml`, environment, CLI flags)
//! - Logging infrastructure (daily file rotation + optional console output)
//! - A single-threaded tokio runtime (camera acquisition, HTTP requests, stdin)
//! - The [`DetectionController`] and the interactive console
//!
//! All business logic runs on one thread. Camera frames are produced on a
//! dedicated capture thread when the native backend is compiled in.
//!
//! # Execution Flow
//!
//! 1. Parse CLI flags
//! 2. Load layered configuration from the config directory
//! 3. Initialize logging → logs/ppe-console.<date>
//! 4. Build the current-thread runtime
//! 5. Create the DetectionController (HTTP client, camera backend, preview dir)
//! 6. Run the console until `quit` or end of input
//! 7. Release camera and preview, log the metrics summary

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use ppe_console::models::CameraBackend;
use ppe_console::ui::run_console;
use ppe_console::{APP_NAME, ConfigManager, DetectionController, Metrics, VERSION};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "ppe-console", version, about = "PPE entry check operator console")]
struct Args {
    /// Directory holding console.yaml
    #[arg(long, env = "PPE_CONSOLE_CONFIG_DIR", default_value = "ppe-console-data")]
    config_dir: Utf8PathBuf,

    /// Detection backend base URL (overrides api.base_url)
    #[arg(long)]
    api_url: Option<String>,

    /// Camera backend: native or test-pattern (overrides camera.backend)
    #[arg(long)]
    camera_backend: Option<CameraBackend>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Also log to stderr
    #[arg(long)]
    log_console: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = ConfigManager::new(&args.config_dir)?;
    let mut config = config_manager.load_layered(None)?;

    if let Some(url) = args.api_url {
        config.api.base_url = url;
    }
    if let Some(backend) = args.camera_backend {
        config.camera.backend = backend;
    }
    config.logging.debug |= args.debug;
    config.logging.console |= args.log_console;

    // Guard must live until exit so buffered log lines are flushed
    let _log_guard = ppe_console::logging::setup_logging(&config.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Configuration loaded from {}", config_manager.config_dir());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .thread_name("ppe-console")
        .build()
        .context("Failed to create tokio runtime")?;

    let metrics = Arc::new(Metrics::new());
    let controller = DetectionController::from_config(&config, Arc::clone(&metrics))?;

    let result = runtime.block_on(run_console(controller.clone()));

    tracing::info!("Console closed, shutting down");
    controller.shutdown();
    drop(controller);

    runtime.shutdown_timeout(std::time::Duration::from_secs(2));
    metrics.log_summary();

    tracing::info!("Application shutdown complete");

    result.inspect_err(|e| tracing::error!("Console error: {:#}", e))
}
