use crate::models::parameters::{
    KEY_FILE_SUFFIX, KEY_INPUT_PATH, KEY_MODE, KEY_OUTPUT_ROOT, KEY_REUSE_PARAMETERS,
    KEY_THRESHOLD_INTENSITY, ParametersRecord,
};
use camino::Utf8PathBuf;
use thiserror::Error;

/// Suffix filter applied when none is configured.
pub const DEFAULT_SUFFIX_FILTER: &str = "tif";

/// Threshold intensity applied when none is configured.
pub const DEFAULT_THRESHOLD_INTENSITY: i64 = 3000;

/// Errors raised while building or validating a [`RunConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Unrecognized mode {0:?} (expected \"single file\" or \"whole folder\")")]
    InvalidMode(String),

    #[error("File suffix filter must not be empty")]
    EmptySuffix,

    #[error("Input path does not exist: {0}")]
    InputNotFound(Utf8PathBuf),

    #[error("Single file mode requires a file, got a directory: {0}")]
    ExpectedFile(Utf8PathBuf),

    #[error("Whole folder mode requires a directory, got a file: {0}")]
    ExpectedFolder(Utf8PathBuf),

    #[error("Opener table entry {0:?} is invalid: {1}")]
    InvalidOpener(String, String),
}

/// Whether a run processes one file or walks a folder tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    SingleFile,
    WholeFolder,
}

impl RunMode {
    /// The value persisted under the `"Mode"` key.
    pub fn as_record_value(self) -> &'static str {
        match self {
            RunMode::SingleFile => "single file",
            RunMode::WholeFolder => "whole folder",
        }
    }

    /// Parse a persisted or prompted mode value. Accepts the short forms
    /// used by earlier parameter files ("single", "folder").
    pub fn parse(value: &str) -> Result<RunMode, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "single" | "single file" => Ok(RunMode::SingleFile),
            "folder" | "whole folder" => Ok(RunMode::WholeFolder),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Immutable description of one batch invocation.
///
/// Constructed once at startup — from command-line flags, interactive
/// prompts, or a persisted [`ParametersRecord`] — and passed by reference to
/// everything that needs it. There is deliberately no ambient global
/// configuration; values overlaid from a stored per-file record are scoped
/// to that file's processing and never written back here.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: RunMode,
    /// A file in [`RunMode::SingleFile`], a directory in
    /// [`RunMode::WholeFolder`].
    pub input_path: Utf8PathBuf,
    pub output_root: Utf8PathBuf,
    /// Literal name-ending filter, e.g. `"tif"`. Matched with `ends_with`,
    /// so `"tif"` also matches `stack.ome.tif`.
    pub suffix_filter: String,
    pub threshold_intensity: i64,
    /// When set, a `Parameters.txt` already present in a file's output
    /// subdirectory overrides the configured defaults for that file.
    pub reuse_stored_parameters: bool,
}

impl RunConfig {
    /// Check the configuration against the filesystem.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptySuffix`] if the suffix filter is empty
    /// - [`ConfigError::InputNotFound`] if the input path does not exist
    /// - [`ConfigError::ExpectedFile`] / [`ConfigError::ExpectedFolder`] if
    ///   the input kind does not match the mode
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suffix_filter.is_empty() {
            return Err(ConfigError::EmptySuffix);
        }

        if !self.input_path.exists() {
            return Err(ConfigError::InputNotFound(self.input_path.clone()));
        }

        match self.mode {
            RunMode::SingleFile if self.input_path.is_dir() => {
                Err(ConfigError::ExpectedFile(self.input_path.clone()))
            }
            RunMode::WholeFolder if !self.input_path.is_dir() => {
                Err(ConfigError::ExpectedFolder(self.input_path.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Full record of this configuration, used for headless runs and the
    /// last-used preferences file.
    pub fn to_parameters(&self) -> ParametersRecord {
        let mut record = ParametersRecord::new();
        record.set(KEY_MODE, self.mode.as_record_value());
        record.set(KEY_INPUT_PATH, self.input_path.as_str());
        record.set(KEY_OUTPUT_ROOT, self.output_root.as_str());
        record.set(KEY_FILE_SUFFIX, self.suffix_filter.as_str());
        record.set(KEY_THRESHOLD_INTENSITY, self.threshold_intensity);
        record.set(KEY_REUSE_PARAMETERS, self.reuse_stored_parameters);
        record
    }

    /// Per-file provenance subset: the values that determined how a single
    /// file was processed. Self-contained, so a record written next to an
    /// output can be read back without any other file.
    pub fn file_parameters(&self) -> ParametersRecord {
        let mut record = ParametersRecord::new();
        record.set(KEY_FILE_SUFFIX, self.suffix_filter.as_str());
        record.set(KEY_THRESHOLD_INTENSITY, self.threshold_intensity);
        record
    }

    /// Build a configuration from a persisted record (the headless entry
    /// shape). `"Input path"` and `"Output root"` are required; the suffix
    /// filter and threshold fall back to their defaults; a missing `"Mode"`
    /// is inferred from whether the input path is a file.
    pub fn from_parameters(record: &ParametersRecord) -> Result<RunConfig, ConfigError> {
        let input_path = record
            .get_str(KEY_INPUT_PATH)
            .map(Utf8PathBuf::from)
            .ok_or(ConfigError::MissingParameter(KEY_INPUT_PATH))?;

        let output_root = record
            .get_str(KEY_OUTPUT_ROOT)
            .map(Utf8PathBuf::from)
            .ok_or(ConfigError::MissingParameter(KEY_OUTPUT_ROOT))?;

        let mode = match record.get_str(KEY_MODE) {
            Some(value) => RunMode::parse(value)?,
            None if input_path.is_file() => RunMode::SingleFile,
            None => RunMode::WholeFolder,
        };

        Ok(RunConfig {
            mode,
            input_path,
            output_root,
            suffix_filter: record
                .get_str(KEY_FILE_SUFFIX)
                .unwrap_or(DEFAULT_SUFFIX_FILTER)
                .to_string(),
            threshold_intensity: record
                .get_int(KEY_THRESHOLD_INTENSITY)
                .unwrap_or(DEFAULT_THRESHOLD_INTENSITY),
            reuse_stored_parameters: record.get_bool(KEY_REUSE_PARAMETERS).unwrap_or(false),
        })
    }
}
