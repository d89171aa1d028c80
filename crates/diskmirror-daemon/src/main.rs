//! DiskMirror Daemon - one-way directory mirroring service
//!
//! This binary runs in the foreground (or as a systemd user service) and:
//! - Keeps a Yandex Disk folder identical to a local directory
//! - Polls both sides on a fixed interval
//! - Shuts down gracefully on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon loads the YAML configuration, applies environment overrides,
//! wires the local directory and the Yandex Disk adapters into a
//! `Reconciler` and runs its loop. The loop is controlled by a
//! `CancellationToken` that is triggered on receipt of SIGTERM or SIGINT.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use diskmirror_core::config::{Config, LoggingConfig};
use diskmirror_sync::engine::Reconciler;
use diskmirror_sync::inventory::DirectoryInventory;
use diskmirror_yandex::provider::YandexRemoteStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

// ============================================================================
// Command line
// ============================================================================

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "diskmirrord", version, about = "Mirror a local directory into Yandex Disk")]
struct Cli {
    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Prepare the remote folder, run a single cycle and exit
    #[arg(long)]
    once: bool,
}

/// Log filter directive for the given verbosity, falling back to the config
fn filter_directive(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Loads, overrides and validates the configuration
///
/// An explicit `--config` path must exist; the default path is optional.
fn load_config(explicit: Option<&PathBuf>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => Config::load(path)?,
        None => {
            let path = Config::default_path();
            if path.exists() {
                Config::load(&path)?
            } else {
                Config::default()
            }
        }
    };

    config
        .apply_env_overrides()
        .context("Invalid environment override")?;

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }

    Ok(config)
}

// ============================================================================
// Logging
// ============================================================================

/// Installs the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Output goes to
/// stderr and, when `logging.file` is set, to that file as well. The
/// returned guard flushes the file writer and must live until exit.
fn init_tracing(logging: &LoggingConfig, verbose: u8) -> Result<Option<WorkerGuard>> {
    let directive = filter_directive(verbose, &logging.level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));
    let json = logging.format == "json";

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(true);
    layers.push(if json {
        stderr.json().boxed()
    } else {
        stderr.boxed()
    });

    let mut guard = None;
    if let Some(file) = &logging.file {
        let dir = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = file
            .file_name()
            .with_context(|| format!("Log file path has no file name: {}", file.display()))?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let (writer, worker_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, file_name));
        guard = Some(worker_guard);

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true);
        layers.push(if json {
            file_layer.json().boxed()
        } else {
            file_layer.boxed()
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

// ============================================================================
// DaemonService
// ============================================================================

/// Main daemon service wiring the adapters into the reconciler
struct DaemonService {
    /// Reconciler driving the mirror
    reconciler: Reconciler,
    /// Token for signalling graceful shutdown
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Creates the adapters and the reconciler from the configuration
    fn new(config: &Config, shutdown: CancellationToken) -> Result<Self> {
        let local_folder = config.resolved_local_folder();
        let store = YandexRemoteStore::from_config(config)?;
        info!(
            local = %local_folder.display(),
            remote = %store.folder(),
            "Mirror configured"
        );

        let inventory = DirectoryInventory::new(local_folder);
        let reconciler = Reconciler::new(
            Arc::new(store),
            Arc::new(inventory),
            config.reconciler_settings(),
        )
        .context("Failed to create reconciler")?;

        Ok(Self {
            reconciler,
            shutdown,
        })
    }

    /// Runs until shutdown, or for a single cycle when `once` is set
    async fn run(&self, once: bool) -> Result<()> {
        if once {
            match self.reconciler.run_once(&self.shutdown).await? {
                Some(report) if report.operations.failed() > 0 => {
                    warn!(
                        failed = report.operations.failed(),
                        "Single cycle finished with failed operations"
                    );
                }
                Some(_) => info!("Single cycle finished"),
                None => info!("Shutdown requested before the first cycle"),
            }
            return Ok(());
        }

        self.reconciler.run(self.shutdown.clone()).await?;
        Ok(())
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    let _log_guard = init_tracing(&config.logging, cli.verbose)?;

    info!(version = env!("CARGO_PKG_VERSION"), "DiskMirror daemon starting (diskmirrord)");

    let shutdown_token = CancellationToken::new();

    // Spawn signal handler task
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(&config, shutdown_token)?;
    let result = service.run(cli.once).await;

    match &result {
        Ok(()) => info!("DiskMirror daemon shut down gracefully"),
        Err(e) => error!(error = %e, "DiskMirror daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["diskmirrord"]).unwrap();
        assert!(cli.config.is_none());
        assert_eq!(cli.verbose, 0);
        assert!(!cli.once);
    }

    #[test]
    fn test_cli_flags() {
        let cli =
            Cli::try_parse_from(["diskmirrord", "--config", "/etc/dm.yaml", "-vv", "--once"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/dm.yaml")));
        assert_eq!(cli.verbose, 2);
        assert!(cli.once);
    }

    #[test]
    fn test_cli_rejects_unknown_flag() {
        assert!(Cli::try_parse_from(["diskmirrord", "--daemonize"]).is_err());
    }

    #[test]
    fn test_filter_directive_by_verbosity() {
        assert_eq!(filter_directive(0, "warn"), "warn");
        assert_eq!(filter_directive(1, "warn"), "debug");
        assert_eq!(filter_directive(3, "warn"), "trace");
    }

    #[test]
    fn test_load_config_missing_explicit_file_fails() {
        let path = PathBuf::from("/nonexistent/diskmirror.yaml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_load_config_reports_validation_errors() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"sync:\n  poll_interval: 0\n  local_folder: /nonexistent/src\n")
            .unwrap();
        tmp.flush().unwrap();

        let err = load_config(Some(&tmp.path().to_path_buf())).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("sync.poll_interval"));
        assert!(message.contains("sync.local_folder"));
    }

    #[test]
    fn test_daemon_service_builds_from_valid_config() {
        let local = tempfile::tempdir().unwrap();
        let config = diskmirror_core::config::ConfigBuilder::new()
            .local_folder(local.path().to_path_buf())
            .token("token")
            .cloud_folder("/Mirror")
            .max_concurrent(4)
            .build();

        let service = DaemonService::new(&config, CancellationToken::new()).unwrap();
        assert_eq!(service.reconciler.settings().max_concurrent, 4);
    }

    #[test]
    fn test_daemon_service_requires_token() {
        let local = tempfile::tempdir().unwrap();
        let config = diskmirror_core::config::ConfigBuilder::new()
            .local_folder(local.path().to_path_buf())
            .build();

        assert!(DaemonService::new(&config, CancellationToken::new()).is_err());
    }
}
