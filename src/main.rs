//! survey-compare - directional survey comparison service
//!
//! Aligns a primary survey against a reference on a common MD grid, reports
//! per-station deviations, and keeps an undoable history of offset edits.
//!
//! # Usage
//!
//! ```bash
//! # Serve the HTTP API (default subcommand)
//! survey-compare --addr 127.0.0.1:8080
//!
//! # One-off comparison of two survey files, statistics printed as JSON
//! survey-compare compare --primary mwd.json --reference gyro.json --resolution 10
//! ```
//!
//! # Environment Variables
//!
//! - `SURVEY_COMPARE_CONFIG`: Path to the TOML config file
//! - `SURVEY_COMPARE_CORS_ORIGINS`: Comma-separated allowed CORS origins
//! - `RUST_LOG`: Logging level (default: info)
//! - `RESET_DB`: Set to "true" to wipe the data directory on startup

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use survey_compare::api::{create_app, ApiState};
use survey_compare::config::{self, CompareConfig, StorageBackend};
use survey_compare::types::{Station, Survey, SurveyRole};
use survey_compare::{comparison, storage, ComparisonService};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "survey-compare")]
#[command(about = "Directional survey comparison and curve adjustment")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default from config: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Path to a TOML config file (overrides SURVEY_COMPARE_CONFIG)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Wipe the sled data directory on startup.
    /// Can also be set via RESET_DB=true environment variable.
    #[arg(long)]
    reset_db: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Serve the HTTP API
    Serve,

    /// Compare two survey files and print the statistics as JSON
    Compare {
        /// Primary (comparison) survey JSON file
        #[arg(long)]
        primary: PathBuf,
        /// Reference survey JSON file
        #[arg(long)]
        reference: PathBuf,
        /// Grid step in metres (1-100); defaults to the configured value
        #[arg(long)]
        resolution: Option<u32>,
    },
}

/// Check if database reset is requested via CLI flag or environment variable.
fn should_reset_db(cli_flag: bool) -> bool {
    if cli_flag {
        return true;
    }
    if let Ok(val) = std::env::var("RESET_DB") {
        let val_lower = val.to_lowercase();
        return val_lower == "true" || val_lower == "1" || val_lower == "yes";
    }
    false
}

/// Remove the sled data directory and all its contents.
fn reset_data_directory(data_path: &Path) -> Result<()> {
    if !data_path.exists() {
        info!("Data directory does not exist, nothing to reset");
        return Ok(());
    }

    warn!(path = %data_path.display(), "RESET_DB detected, wiping comparison storage");
    std::fs::remove_dir_all(data_path)
        .with_context(|| format!("Failed to remove data directory {}", data_path.display()))?;
    warn!("Data directory removed; a fresh database will be created");
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<CompareConfig> {
    match explicit {
        Some(path) => CompareConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(CompareConfig::load()),
    }
}

/// Read a survey document.
///
/// Accepts either a full survey object or a bare array of stations, in which
/// case the file stem becomes the survey id.
fn read_survey(path: &Path, role: SurveyRole) -> Result<Survey> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if let Ok(survey) = serde_json::from_str::<Survey>(&text) {
        return Ok(survey);
    }

    let stations: Vec<Station> = serde_json::from_str(&text)
        .with_context(|| format!("{} is neither a survey nor a station array", path.display()))?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| role.to_string());
    Ok(Survey::new(id, role, stations))
}

fn run_compare(primary: &Path, reference: &Path, resolution: Option<u32>) -> Result<()> {
    let primary = read_survey(primary, SurveyRole::Primary)?;
    let reference = read_survey(reference, SurveyRole::Reference)?;
    let resolution = resolution.unwrap_or(config::get().comparison.default_resolution);

    let session = comparison::compare(&primary, &reference, resolution)
        .with_context(|| format!("Comparison of {} against {} failed", primary.id, reference.id))?;

    let report = serde_json::json!({
        "primary_survey_id": session.primary_survey_id,
        "reference_survey_id": session.reference_survey_id,
        "resolution": session.resolution,
        "md_start": session.md_grid.first(),
        "md_end": session.md_grid.last(),
        "statistics": session.statistics,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_server(compare_config: &CompareConfig, addr: String) -> Result<()> {
    let store = storage::open_store(&compare_config.storage)
        .context("Failed to open comparison storage")?;
    let service = ComparisonService::new(store, compare_config);
    let app = create_app(ApiState::new(service));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("HTTP server listening on {}", addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
        })
        .await;

    match result {
        Ok(()) => {
            info!("Graceful shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Server error: {}", e);
            Err(anyhow::anyhow!("HTTP server error: {}", e))
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let compare_config = load_config(args.config.as_deref())?;
    config::init(compare_config.clone());

    match args.command.unwrap_or(SubCommand::Serve) {
        SubCommand::Compare {
            primary,
            reference,
            resolution,
        } => tokio::task::spawn_blocking(move || run_compare(&primary, &reference, resolution))
            .await
            .context("Comparison task panicked")?,
        SubCommand::Serve => {
            // Reset before storage is opened
            if should_reset_db(args.reset_db) {
                if compare_config.storage.backend == StorageBackend::Sled {
                    reset_data_directory(&compare_config.storage.data_dir)?;
                } else {
                    info!("Memory storage configured, nothing to reset");
                }
            }

            let addr = args.addr.unwrap_or_else(|| compare_config.server.addr.clone());
            info!(
                backend = ?compare_config.storage.backend,
                resolution = compare_config.comparison.default_resolution,
                "Starting survey-compare"
            );
            run_server(&compare_config, addr).await
        }
    }
}
