//! ImageBatch - Parameterized batch processing driver for bio-image analysis
//! workflows.
//!
//! # Overview
//!
//! This binary walks an input tree (or takes a single file), mirrors the
//! tree's structure under an output root, writes a flat JSON parameters
//! record next to every per-file output for provenance, and hands each
//! matching file to the configured host imaging application through a
//! suffix → opener dispatch table. The image processing itself is entirely
//! external; this program only orchestrates it.
//!
//! # Execution Flow
//!
//! 1. Initialize logging → logs/imagebatch.<date>
//! 2. Load last-used preferences (fail-soft)
//! 3. Resolve the run configuration from one of the three entry shapes
//!    (saved parameters file, flags, interactive prompts)
//! 4. Load and validate the opener table from `ImageBatch Data/Openers.yaml`
//! 5. Persist the effective configuration as the new preferences
//! 6. Run the batch driver and log the completion notice
//!
//! Execution is single-threaded and synchronous: one file at a time, in a
//! deterministic order, with per-file failures isolated so a bad file never
//! stops the rest of the folder.

use anyhow::Result;
use clap::Parser;
use imagebatch::cli::{self, Cli};
use imagebatch::services::{HostProcessor, PlanProcessor, run};
use imagebatch::{APP_NAME, ConfigManager, VERSION};

fn main() -> Result<()> {
    let args = Cli::parse();

    // Keep the guard alive for the duration of the program
    let _guard = imagebatch::logging::setup_logging("logs", "imagebatch", args.debug, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let prefs_path = imagebatch::config::prefs_path();
    let prefs = match &prefs_path {
        Some(path) => imagebatch::config::load_prefs(path),
        None => {
            tracing::warn!("No preferences location available; starting from defaults");
            imagebatch::ParametersRecord::default()
        }
    };

    let run_config = cli::resolve_run_config(&args, &prefs)?;
    tracing::info!(
        "Run configuration: mode={}, input={}, output={}, suffix={}, threshold={}, reuse={}",
        run_config.mode.as_record_value(),
        run_config.input_path,
        run_config.output_root,
        run_config.suffix_filter,
        run_config.threshold_intensity,
        run_config.reuse_stored_parameters
    );

    let config_manager = ConfigManager::new("ImageBatch Data")?;
    let opener_table = config_manager.load_opener_table()?;

    let host_app = cli::resolve_host_app(&args, &prefs);

    // Remember the effective configuration for the next invocation
    if let Some(path) = &prefs_path {
        let new_prefs = cli::to_prefs(&run_config, host_app.as_deref());
        if let Err(err) = imagebatch::config::save_prefs(path, &new_prefs) {
            tracing::warn!("Could not save preferences: {:#}", err);
        }
    }

    let report = match host_app {
        Some(app_exe) => {
            let mut processor = HostProcessor::new(app_exe, opener_table);
            run(&run_config, &mut processor)?
        }
        None => {
            let mut processor = PlanProcessor::new(opener_table);
            run(&run_config, &mut processor)?
        }
    };

    if report.has_failures() {
        for (path, message) in &report.failed {
            tracing::error!("Failed: {} ({})", path, message);
        }
    }

    println!("Done. {}", report.summary());
    Ok(())
}
