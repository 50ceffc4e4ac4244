use crate::models::parameters::KEY_THRESHOLD_INTENSITY;
use crate::models::run_config::DEFAULT_THRESHOLD_INTENSITY;
use crate::models::{OpenerSpec, OpenerTable, ParametersRecord};
use crate::services::batch::FileProcessor;
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Command;
use thiserror::Error;

/// Errors from opener resolution.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No table entry matches the file's suffix and no generic opener is
    /// configured. The driver records such files as skipped, not failed.
    #[error("No opener matches {0}")]
    UnsupportedFileType(Utf8PathBuf),
}

/// Look up the opener for an input file (first matching table entry, then
/// the generic opener).
pub fn resolve_opener<'a>(
    table: &'a OpenerTable,
    input: &Utf8Path,
) -> Result<&'a OpenerSpec, DispatchError> {
    let name = input.file_name().unwrap_or(input.as_str());
    table
        .resolve(name)
        .ok_or_else(|| DispatchError::UnsupportedFileType(input.to_path_buf()))
}

/// Build the headless host-application command line for one file.
///
/// The host application is addressed purely by name and contract: it is
/// handed the opener identifier, the opener's option string, the input file,
/// the per-file output directory, and the effective threshold. Paths are
/// quoted; option values use the host's `key=[value]` convention.
pub fn build_open_command(
    app_exe: &Utf8Path,
    spec: &OpenerSpec,
    input: &Utf8Path,
    output_dir: &Utf8Path,
    params: &ParametersRecord,
) -> String {
    let threshold = params
        .get_int(KEY_THRESHOLD_INTENSITY)
        .unwrap_or(DEFAULT_THRESHOLD_INTENSITY);

    let mut options = String::new();
    if !spec.options.is_empty() {
        options.push_str(&spec.options);
        options.push(' ');
    }

    format!(
        "\"{}\" --headless --run \"{}\" \"{}open=[{}] output=[{}] threshold={}\"",
        app_exe, spec.opener, options, input, output_dir, threshold
    )
}

/// Per-file processor that invokes the configured host imaging application.
///
/// Resolution and command construction are separate from execution so both
/// can be tested without a host installation.
pub struct HostProcessor {
    app_exe: Utf8PathBuf,
    table: OpenerTable,
}

impl HostProcessor {
    pub fn new(app_exe: Utf8PathBuf, table: OpenerTable) -> Self {
        Self { app_exe, table }
    }
}

impl FileProcessor for HostProcessor {
    fn process(
        &mut self,
        input: &Utf8Path,
        output_dir: &Utf8Path,
        params: &ParametersRecord,
    ) -> Result<()> {
        let spec = resolve_opener(&self.table, input)?;
        let command = build_open_command(&self.app_exe, spec, input, output_dir, params);

        tracing::info!("Executing: {}", command);

        // Synchronous, no timeout: the driver blocks until the host returns.
        let status = shell_command(&command)
            .status()
            .context("Failed to spawn host application")?;

        let exit_code = status.code().unwrap_or(-1);
        if !status.success() {
            bail!("Host application exited with code {}", exit_code);
        }

        tracing::debug!("Host application completed with exit code {}", exit_code);
        Ok(())
    }
}

/// Per-file processor used when no host application is configured: resolves
/// the opener and logs the invocation that a configured run would execute.
pub struct PlanProcessor {
    table: OpenerTable,
}

impl PlanProcessor {
    pub fn new(table: OpenerTable) -> Self {
        Self { table }
    }
}

impl FileProcessor for PlanProcessor {
    fn process(
        &mut self,
        input: &Utf8Path,
        output_dir: &Utf8Path,
        params: &ParametersRecord,
    ) -> Result<()> {
        let spec = resolve_opener(&self.table, input)?;
        let threshold = params
            .get_int(KEY_THRESHOLD_INTENSITY)
            .unwrap_or(DEFAULT_THRESHOLD_INTENSITY);

        tracing::info!(
            "No host application configured; {} would open with \"{}\" ({}) into {} at threshold {}",
            input,
            spec.opener,
            spec.options,
            output_dir,
            threshold
        );
        Ok(())
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        c
    }
}
