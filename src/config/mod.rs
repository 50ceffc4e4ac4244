use crate::models::{OpenerTable, ParametersRecord};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Environment variable overriding the last-used preferences path.
pub const PREFS_PATH_ENV: &str = "IMAGEBATCH_PREFS";

const PREFS_FILE_NAME: &str = ".imagebatch_prefs.json";
const OPENERS_FILE_NAME: &str = "Openers.yaml";

/// Configuration manager for the on-disk opener table.
///
/// Owns the configuration directory (e.g. "ImageBatch Data"), creating it on
/// first use, and loads/saves `Openers.yaml` — the suffix → opener dispatch
/// table handed to the host-application processors.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    openers_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            openers_path: config_dir.join(OPENERS_FILE_NAME),
            config_dir,
        })
    }

    /// Load the opener table, validated.
    ///
    /// # Returns
    /// The table from `Openers.yaml`, or the built-in default table if the
    /// file doesn't exist.
    pub fn load_opener_table(&self) -> Result<OpenerTable> {
        if !self.openers_path.exists() {
            tracing::warn!(
                "Opener table not found at {}, using defaults",
                self.openers_path
            );
            return Ok(OpenerTable::default());
        }

        let file_contents = fs::read_to_string(&self.openers_path)
            .with_context(|| format!("Failed to read opener table: {}", self.openers_path))?;

        let table: OpenerTable = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse opener table: {}", self.openers_path))?;

        table
            .validate()
            .with_context(|| format!("Invalid opener table: {}", self.openers_path))?;

        tracing::info!("Loaded opener table from {}", self.openers_path);
        Ok(table)
    }

    /// Save the opener table.
    pub fn save_opener_table(&self, table: &OpenerTable) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(table).context("Failed to serialize opener table to YAML")?;

        fs::write(&self.openers_path, yaml_string)
            .with_context(|| format!("Failed to write opener table: {}", self.openers_path))?;

        tracing::info!("Saved opener table to {}", self.openers_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

/// Where last-used preferences live: the `IMAGEBATCH_PREFS` environment
/// variable if set, otherwise a dotfile in the home directory. `None` when
/// neither is available.
pub fn prefs_path() -> Option<Utf8PathBuf> {
    if let Ok(overridden) = std::env::var(PREFS_PATH_ENV) {
        return Some(Utf8PathBuf::from(overridden));
    }

    dirs::home_dir()
        .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
        .map(|home| home.join(PREFS_FILE_NAME))
}

/// Load last-used preferences, fail-soft: any problem (missing file,
/// malformed content) yields an empty record and a warning. Preferences
/// only seed defaults, so they are never worth failing a run over.
pub fn load_prefs(path: &Utf8Path) -> ParametersRecord {
    match ParametersRecord::load(path) {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!("Ignoring unreadable preferences at {}: {:#}", path, err);
            ParametersRecord::default()
        }
    }
}

/// Persist last-used preferences.
pub fn save_prefs(path: &Utf8Path, record: &ParametersRecord) -> Result<()> {
    record
        .save(path)
        .with_context(|| format!("Failed to save preferences: {}", path))
}
