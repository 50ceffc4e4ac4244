use crate::models::parameters::PARAMETERS_FILE_NAME;
use crate::models::{ParametersRecord, RunConfig, RunMode};
use crate::services::dispatch::DispatchError;
use crate::services::traversal::{TreeItem, TreeWalker};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Per-file processing hook supplied by the caller.
///
/// The driver hands each matching file to this hook after it has created the
/// file's output subdirectory and persisted the effective parameters. The
/// `params` argument is the effective record for this file only — config
/// defaults, possibly overlaid with a previously stored record — so no
/// parameter state leaks between files.
///
/// Returning an error fails this file only; the batch continues. An error
/// that is a [`DispatchError`] marks the file as skipped rather than failed.
pub trait FileProcessor {
    fn process(
        &mut self,
        input: &Utf8Path,
        output_dir: &Utf8Path,
        params: &ParametersRecord,
    ) -> Result<()>;
}

impl<F> FileProcessor for F
where
    F: FnMut(&Utf8Path, &Utf8Path, &ParametersRecord) -> Result<()>,
{
    fn process(
        &mut self,
        input: &Utf8Path,
        output_dir: &Utf8Path,
        params: &ParametersRecord,
    ) -> Result<()> {
        self(input, output_dir, params)
    }
}

/// Root-level failures that abort the whole run. Everything below the root
/// is isolated per file and recorded in the [`RunReport`] instead.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Cannot create output root {path}: {source}")]
    OutputRootCreation {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read input root {path}: {source}")]
    InputRootUnreadable {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Inputs handed to the processor that completed successfully.
    pub processed: Vec<Utf8PathBuf>,

    /// Inputs the processor declined because no opener matched.
    pub skipped: Vec<Utf8PathBuf>,

    /// Inputs (or mirrored directories) whose per-file step failed, with the
    /// failure message.
    pub failed: Vec<(Utf8PathBuf, String)>,

    /// Non-fatal traversal problems, e.g. an unreadable subdirectory.
    pub warnings: Vec<String>,

    pub duration: Duration,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Human-readable completion line, emitted at the end of every run.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} processed", self.processed.len())];

        if !self.skipped.is_empty() {
            parts.push(format!("{} skipped", self.skipped.len()));
        }
        if !self.failed.is_empty() {
            parts.push(format!("{} failed", self.failed.len()));
        }
        if !self.warnings.is_empty() {
            parts.push(format!("{} traversal warnings", self.warnings.len()));
        }

        format!(
            "{} in {:.2}s",
            parts.join(", "),
            self.duration.as_secs_f32()
        )
    }
}

/// Run one batch according to `config`, invoking `processor` for every
/// matching file.
///
/// Creates the output root, then either processes the single input file or
/// walks the input tree depth-first in sorted order, mirroring each
/// subdirectory under the output root as it is entered. Per-file failures
/// are recorded and the batch continues; the completion notice is logged
/// even when files failed.
///
/// # Errors
///
/// Only root-level failures are returned: the output root cannot be created
/// or the input root cannot be read.
pub fn run<P: FileProcessor>(
    config: &RunConfig,
    processor: &mut P,
) -> Result<RunReport, BatchError> {
    let start = Instant::now();

    fs::create_dir_all(&config.output_root).map_err(|source| BatchError::OutputRootCreation {
        path: config.output_root.clone(),
        source,
    })?;

    let mut report = RunReport::default();

    match config.mode {
        RunMode::SingleFile => {
            process_one(
                config,
                &config.input_path,
                &config.output_root,
                processor,
                &mut report,
            );
        }
        RunMode::WholeFolder => {
            let walker = TreeWalker::new(&config.input_path, &config.suffix_filter).map_err(
                |source| BatchError::InputRootUnreadable {
                    path: config.input_path.clone(),
                    source,
                },
            )?;

            for item in walker {
                match item {
                    Ok(TreeItem::Directory(rel)) => {
                        let mirrored = config.output_root.join(&rel);
                        if let Err(err) = fs::create_dir_all(&mirrored) {
                            tracing::error!(
                                "Failed to create mirrored directory {}: {}",
                                mirrored,
                                err
                            );
                            report.failed.push((mirrored, err.to_string()));
                        }
                    }
                    Ok(TreeItem::File(task)) => {
                        let out_dir = config.output_root.join(&task.relative_dir);
                        process_one(config, &task.input, &out_dir, processor, &mut report);
                    }
                    Err(err) => {
                        tracing::warn!("Traversal: {}", err);
                        report.warnings.push(err.to_string());
                    }
                }
            }
        }
    }

    report.duration = start.elapsed();

    // Completion notice is unconditional: the run is designed to finish the
    // whole folder even when individual files misbehave.
    tracing::info!("Batch run complete: {}", report.summary());

    Ok(report)
}

/// Run the per-file step and record its outcome.
fn process_one<P: FileProcessor>(
    config: &RunConfig,
    input: &Utf8Path,
    parent_out: &Utf8Path,
    processor: &mut P,
    report: &mut RunReport,
) {
    match per_file_step(config, input, parent_out, processor) {
        Ok(()) => {
            report.processed.push(input.to_path_buf());
        }
        Err(err) if err.downcast_ref::<DispatchError>().is_some() => {
            tracing::warn!("Skipping {}: {}", input, err);
            report.skipped.push(input.to_path_buf());
        }
        Err(err) => {
            tracing::error!("Failed to process {}: {:#}", input, err);
            report.failed.push((input.to_path_buf(), format!("{:#}", err)));
        }
    }
}

/// The per-file step: derive and create the file's output subdirectory,
/// work out the effective parameters (overlaying a stored record when reuse
/// is enabled), persist them, and invoke the processor.
fn per_file_step<P: FileProcessor>(
    config: &RunConfig,
    input: &Utf8Path,
    parent_out: &Utf8Path,
    processor: &mut P,
) -> Result<()> {
    let base = input
        .file_stem()
        .with_context(|| format!("Cannot derive base name for {}", input))?;

    let file_out = parent_out.join(base);
    fs::create_dir_all(&file_out)
        .with_context(|| format!("Failed to create output directory {}", file_out))?;

    let params_path = file_out.join(PARAMETERS_FILE_NAME);

    let mut effective = config.file_parameters();
    if config.reuse_stored_parameters {
        // Stored values win over config defaults; a missing record is a
        // warning inside load(), not an error.
        let stored = ParametersRecord::load(&params_path)?;
        effective.overlay(&stored);
    }

    effective.save(&params_path)?;

    tracing::info!("Processing {}", input);
    processor.process(input, &file_out, &effective)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parameters::{KEY_FILE_SUFFIX, KEY_THRESHOLD_INTENSITY};
    use crate::models::run_config::DEFAULT_THRESHOLD_INTENSITY;
    use anyhow::anyhow;
    use tempfile::TempDir;

    fn setup(mode: RunMode) -> (TempDir, RunConfig) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let input = root.join("in");
        fs::create_dir_all(&input).unwrap();

        let config = RunConfig {
            mode,
            input_path: input,
            output_root: root.join("out"),
            suffix_filter: "tif".to_string(),
            threshold_intensity: DEFAULT_THRESHOLD_INTENSITY,
            reuse_stored_parameters: false,
        };
        (temp_dir, config)
    }

    fn noop() -> impl FnMut(&Utf8Path, &Utf8Path, &ParametersRecord) -> Result<()> {
        |_: &Utf8Path, _: &Utf8Path, _: &ParametersRecord| Ok(())
    }

    #[test]
    fn test_single_file_mode_processes_exactly_once() {
        let (_guard, mut config) = setup(RunMode::SingleFile);
        let file = config.input_path.join("scan.tif");
        fs::write(&file, b"").unwrap();
        config.input_path = file.clone();

        let mut calls = Vec::new();
        let mut processor =
            |input: &Utf8Path, out: &Utf8Path, _: &ParametersRecord| -> Result<()> {
                calls.push((input.to_path_buf(), out.to_path_buf()));
                Ok(())
            };

        let report = run(&config, &mut processor).unwrap();
        assert_eq!(report.processed, vec![file]);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, config.output_root.join("scan"));
        assert!(config
            .output_root
            .join("scan")
            .join(PARAMETERS_FILE_NAME)
            .is_file());
    }

    #[test]
    fn test_per_file_failures_are_isolated() {
        let (_guard, config) = setup(RunMode::WholeFolder);
        for name in ["a.tif", "b.tif", "c.tif"] {
            fs::write(config.input_path.join(name), b"").unwrap();
        }

        let mut processor =
            |input: &Utf8Path, _: &Utf8Path, _: &ParametersRecord| -> Result<()> {
                if input.file_name() == Some("b.tif") {
                    Err(anyhow!("processor crashed"))
                } else {
                    Ok(())
                }
            };

        let report = run(&config, &mut processor).unwrap();
        assert_eq!(report.processed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, config.input_path.join("b.tif"));
        assert!(report.has_failures());
    }

    #[test]
    fn test_dispatch_errors_count_as_skipped() {
        let (_guard, config) = setup(RunMode::WholeFolder);
        fs::write(config.input_path.join("a.tif"), b"").unwrap();

        let mut processor =
            |input: &Utf8Path, _: &Utf8Path, _: &ParametersRecord| -> Result<()> {
                Err(DispatchError::UnsupportedFileType(input.to_path_buf()).into())
            };

        let report = run(&config, &mut processor).unwrap();
        assert!(report.processed.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(report.skipped, vec![config.input_path.join("a.tif")]);
    }

    #[test]
    fn test_effective_parameters_reach_the_processor() {
        let (_guard, mut config) = setup(RunMode::WholeFolder);
        config.threshold_intensity = 1234;
        fs::write(config.input_path.join("a.tif"), b"").unwrap();

        let mut seen = None;
        let mut processor =
            |_: &Utf8Path, _: &Utf8Path, params: &ParametersRecord| -> Result<()> {
                seen = Some(params.clone());
                Ok(())
            };

        run(&config, &mut processor).unwrap();
        let params = seen.unwrap();
        assert_eq!(params.get_str(KEY_FILE_SUFFIX), Some("tif"));
        assert_eq!(params.get_int(KEY_THRESHOLD_INTENSITY), Some(1234));
    }

    #[test]
    fn test_reuse_overlays_stored_record_for_that_file_only() {
        let (_guard, mut config) = setup(RunMode::WholeFolder);
        config.reuse_stored_parameters = true;
        fs::write(config.input_path.join("a.tif"), b"").unwrap();
        fs::write(config.input_path.join("b.tif"), b"").unwrap();

        // Pre-seed a stored record for a.tif only
        let a_out = config.output_root.join("a");
        fs::create_dir_all(&a_out).unwrap();
        let mut stored = ParametersRecord::new();
        stored.set(KEY_THRESHOLD_INTENSITY, 99);
        stored.save(&a_out.join(PARAMETERS_FILE_NAME)).unwrap();

        let mut thresholds = Vec::new();
        let mut processor =
            |input: &Utf8Path, _: &Utf8Path, params: &ParametersRecord| -> Result<()> {
                thresholds.push((
                    input.file_name().unwrap().to_string(),
                    params.get_int(KEY_THRESHOLD_INTENSITY).unwrap(),
                ));
                Ok(())
            };

        run(&config, &mut processor).unwrap();
        assert_eq!(
            thresholds,
            vec![
                ("a.tif".to_string(), 99),
                ("b.tif".to_string(), DEFAULT_THRESHOLD_INTENSITY),
            ]
        );
    }

    #[test]
    fn test_missing_output_root_parent_still_created() {
        let (_guard, mut config) = setup(RunMode::WholeFolder);
        config.output_root = config.output_root.join("deeper/than/before");
        fs::write(config.input_path.join("a.tif"), b"").unwrap();

        let report = run(&config, &mut noop()).unwrap();
        assert_eq!(report.processed.len(), 1);
        assert!(config.output_root.join("a").is_dir());
    }

    #[test]
    fn test_unreadable_input_root_aborts() {
        let (_guard, mut config) = setup(RunMode::WholeFolder);
        config.input_path = config.input_path.join("missing");

        let err = run(&config, &mut noop()).unwrap_err();
        assert!(matches!(err, BatchError::InputRootUnreadable { .. }));
    }
}
