use crate::models::parameters::{
    KEY_FILE_SUFFIX, KEY_HOST_APPLICATION, KEY_MODE, KEY_THRESHOLD_INTENSITY, ParametersRecord,
};
use crate::models::run_config::{
    DEFAULT_SUFFIX_FILTER, DEFAULT_THRESHOLD_INTENSITY, RunConfig, RunMode,
};
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use std::io::{self, Write};

/// Command-line arguments.
///
/// Three entry shapes converge on the same [`RunConfig`]:
/// - `--params <file>`: headless, everything read from a saved record
/// - `--input`/`--output` flags: headless, gaps filled from preferences
/// - no paths at all: interactive (native pickers + prompts), seeded from
///   the last-used preferences
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Batch processing driver for bio-image analysis workflows"
)]
pub struct Cli {
    /// Run headless from a saved parameters file (no prompts)
    #[arg(long)]
    pub params: Option<Utf8PathBuf>,

    /// Input file or folder
    #[arg(long)]
    pub input: Option<Utf8PathBuf>,

    /// Output root directory
    #[arg(long)]
    pub output: Option<Utf8PathBuf>,

    /// Process the input as a single file instead of walking a folder
    #[arg(long)]
    pub single: bool,

    /// File name suffix filter, e.g. "tif"
    #[arg(long)]
    pub suffix: Option<String>,

    /// Threshold intensity recorded with, and passed to, each file's
    /// processing step
    #[arg(long)]
    pub threshold: Option<i64>,

    /// Reuse parameter records already stored next to each file's output
    #[arg(long)]
    pub reuse: bool,

    /// Host imaging application executable; omit to log planned commands
    /// instead of executing them
    #[arg(long)]
    pub app: Option<Utf8PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Build the run configuration from whichever entry shape the arguments
/// select, then validate it.
pub fn resolve_run_config(cli: &Cli, prefs: &ParametersRecord) -> Result<RunConfig> {
    let run_config = if let Some(params_path) = &cli.params {
        headless_config(params_path)?
    } else if cli.input.is_some() || cli.output.is_some() {
        flags_config(cli, prefs)?
    } else {
        interactive_config(prefs)?
    };

    run_config.validate()?;
    Ok(run_config)
}

/// The host application to invoke, if any: the flag wins, then the stored
/// preference.
pub fn resolve_host_app(cli: &Cli, prefs: &ParametersRecord) -> Option<Utf8PathBuf> {
    cli.app.clone().or_else(|| {
        prefs
            .get_str(KEY_HOST_APPLICATION)
            .map(Utf8PathBuf::from)
    })
}

/// The record saved as last-used preferences after a run starts.
pub fn to_prefs(run_config: &RunConfig, app: Option<&Utf8Path>) -> ParametersRecord {
    let mut record = run_config.to_parameters();
    if let Some(app) = app {
        record.set(KEY_HOST_APPLICATION, app.as_str());
    }
    record
}

fn headless_config(params_path: &Utf8Path) -> Result<RunConfig> {
    if !params_path.exists() {
        bail!("Parameters file not found: {}", params_path);
    }

    let record = ParametersRecord::load(params_path)?;
    let run_config = RunConfig::from_parameters(&record)
        .with_context(|| format!("Invalid parameters file: {}", params_path))?;

    tracing::info!("Running headless from {}", params_path);
    Ok(run_config)
}

fn flags_config(cli: &Cli, prefs: &ParametersRecord) -> Result<RunConfig> {
    let Some(input_path) = cli.input.clone() else {
        bail!("--input is required when --output is given");
    };
    let Some(output_root) = cli.output.clone() else {
        bail!("--output is required when --input is given");
    };

    let mode = if cli.single || input_path.is_file() {
        RunMode::SingleFile
    } else {
        RunMode::WholeFolder
    };

    Ok(RunConfig {
        mode,
        input_path,
        output_root,
        suffix_filter: cli
            .suffix
            .clone()
            .or_else(|| prefs.get_str(KEY_FILE_SUFFIX).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_SUFFIX_FILTER.to_string()),
        threshold_intensity: cli
            .threshold
            .or_else(|| prefs.get_int(KEY_THRESHOLD_INTENSITY))
            .unwrap_or(DEFAULT_THRESHOLD_INTENSITY),
        reuse_stored_parameters: cli.reuse,
    })
}

/// Collect a configuration interactively: native pickers for paths, stdin
/// prompts for scalars, defaults seeded from the last-used preferences.
fn interactive_config(prefs: &ParametersRecord) -> Result<RunConfig> {
    let mode_default = prefs
        .get_str(KEY_MODE)
        .unwrap_or(RunMode::WholeFolder.as_record_value());
    let mode = RunMode::parse(&prompt("Mode (single file / whole folder)", mode_default)?)?;

    let input_path = match mode {
        RunMode::SingleFile => pick_file("Select input image")?,
        RunMode::WholeFolder => pick_folder("Select input folder")?,
    };
    let output_root = pick_folder("Select output root")?;

    let suffix_default = prefs.get_str(KEY_FILE_SUFFIX).unwrap_or(DEFAULT_SUFFIX_FILTER);
    let suffix_filter = prompt("File suffix", suffix_default)?;

    let threshold_default = prefs
        .get_int(KEY_THRESHOLD_INTENSITY)
        .unwrap_or(DEFAULT_THRESHOLD_INTENSITY);
    let threshold_raw = prompt("Threshold intensity", &threshold_default.to_string())?;
    let threshold_intensity: i64 = threshold_raw
        .parse()
        .with_context(|| format!("Threshold intensity must be an integer, got {:?}", threshold_raw))?;

    let reuse_raw = prompt("Reuse stored parameters (y/n)", "n")?;
    let reuse_stored_parameters = matches!(
        reuse_raw.to_lowercase().as_str(),
        "y" | "yes" | "true"
    );

    Ok(RunConfig {
        mode,
        input_path,
        output_root,
        suffix_filter,
        threshold_intensity,
        reuse_stored_parameters,
    })
}

/// Read one line from stdin, falling back to `default` on empty input.
fn prompt(label: &str, default: &str) -> Result<String> {
    print!("{} [{}]: ", label, default);
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;

    let trimmed = line.trim();
    Ok(if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    })
}

/// Show a native file picker dialog.
fn pick_file(title: &str) -> Result<Utf8PathBuf> {
    use rfd::FileDialog;

    let picked = FileDialog::new()
        .set_title(title)
        .add_filter("Images", &["tif", "tiff", "h5", "ims", "nd2", "qptiff"])
        .pick_file();

    match picked {
        Some(path) => Utf8PathBuf::try_from(path).context("Selected path is not UTF-8"),
        None => bail!("No file selected"),
    }
}

/// Show a native folder picker dialog.
fn pick_folder(title: &str) -> Result<Utf8PathBuf> {
    use rfd::FileDialog;

    match FileDialog::new().set_title(title).pick_folder() {
        Some(path) => Utf8PathBuf::try_from(path).context("Selected path is not UTF-8"),
        None => bail!("No folder selected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parameters::{KEY_INPUT_PATH, KEY_OUTPUT_ROOT};
    use std::fs;
    use tempfile::TempDir;

    fn cli_with(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("imagebatch").chain(args.iter().copied()))
    }

    #[test]
    fn test_flags_config_infers_folder_mode() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

        let cli = cli_with(&[
            "--input",
            root.as_str(),
            "--output",
            root.join("out").as_str(),
            "--threshold",
            "500",
        ]);

        let run_config = resolve_run_config(&cli, &ParametersRecord::new()).unwrap();
        assert_eq!(run_config.mode, RunMode::WholeFolder);
        assert_eq!(run_config.threshold_intensity, 500);
        assert_eq!(run_config.suffix_filter, DEFAULT_SUFFIX_FILTER);
    }

    #[test]
    fn test_flags_config_infers_single_file_mode() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let file = root.join("scan.tif");
        fs::write(&file, b"").unwrap();

        let cli = cli_with(&[
            "--input",
            file.as_str(),
            "--output",
            root.join("out").as_str(),
        ]);

        let run_config = resolve_run_config(&cli, &ParametersRecord::new()).unwrap();
        assert_eq!(run_config.mode, RunMode::SingleFile);
    }

    #[test]
    fn test_flags_fall_back_to_prefs() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

        let mut prefs = ParametersRecord::new();
        prefs.set(KEY_FILE_SUFFIX, "nd2");
        prefs.set(KEY_THRESHOLD_INTENSITY, 750);
        prefs.set(KEY_HOST_APPLICATION, "/opt/Fiji.app/ImageJ-linux64");

        let cli = cli_with(&[
            "--input",
            root.as_str(),
            "--output",
            root.join("out").as_str(),
        ]);

        let run_config = resolve_run_config(&cli, &prefs).unwrap();
        assert_eq!(run_config.suffix_filter, "nd2");
        assert_eq!(run_config.threshold_intensity, 750);

        assert_eq!(
            resolve_host_app(&cli, &prefs).unwrap(),
            Utf8PathBuf::from("/opt/Fiji.app/ImageJ-linux64")
        );
    }

    #[test]
    fn test_headless_config_from_saved_record() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let input = root.join("in");
        fs::create_dir_all(&input).unwrap();

        let mut record = ParametersRecord::new();
        record.set(KEY_INPUT_PATH, input.as_str());
        record.set(KEY_OUTPUT_ROOT, root.join("out").as_str());
        record.set(KEY_FILE_SUFFIX, "ims");
        let params_path = root.join("Parameters.txt");
        record.save(&params_path).unwrap();

        let cli = cli_with(&["--params", params_path.as_str()]);
        let run_config = resolve_run_config(&cli, &ParametersRecord::new()).unwrap();

        assert_eq!(run_config.mode, RunMode::WholeFolder);
        assert_eq!(run_config.input_path, input);
        assert_eq!(run_config.suffix_filter, "ims");
    }

    #[test]
    fn test_headless_config_requires_existing_file() {
        let cli = cli_with(&["--params", "/no/such/Parameters.txt"]);
        assert!(resolve_run_config(&cli, &ParametersRecord::new()).is_err());
    }

    #[test]
    fn test_to_prefs_includes_host_app() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

        let run_config = RunConfig {
            mode: RunMode::WholeFolder,
            input_path: root.clone(),
            output_root: root.join("out"),
            suffix_filter: "tif".to_string(),
            threshold_intensity: 3000,
            reuse_stored_parameters: false,
        };

        let record = to_prefs(&run_config, Some(Utf8Path::new("fiji")));
        assert_eq!(record.get_str(KEY_HOST_APPLICATION), Some("fiji"));
        assert_eq!(record.get_str(KEY_MODE), Some("whole folder"));
    }
}
