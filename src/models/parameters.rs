use anyhow::{Context, Result};
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;

/// File name used for the per-file parameters record written next to each
/// output, and for the headless/prefs records.
pub const PARAMETERS_FILE_NAME: &str = "Parameters.txt";

// Well-known parameter keys. The names are the ones that appear verbatim in
// persisted records, so they are human-readable rather than snake_case.
pub const KEY_MODE: &str = "Mode";
pub const KEY_INPUT_PATH: &str = "Input path";
pub const KEY_OUTPUT_ROOT: &str = "Output root";
pub const KEY_FILE_SUFFIX: &str = "File suffix";
pub const KEY_THRESHOLD_INTENSITY: &str = "Threshold intensity";
pub const KEY_REUSE_PARAMETERS: &str = "Reuse stored parameters";
pub const KEY_HOST_APPLICATION: &str = "Host application";

/// A scalar parameter value.
///
/// Records are restricted to flat scalar values; anything nested in a
/// persisted file fails deserialization rather than being silently accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// A flat, insertion-ordered mapping from parameter name to scalar value.
///
/// This is the provenance record persisted next to each per-file output and
/// the interchange format for headless runs and last-used preferences. Key
/// order is stable across identical inputs so that persisted records diff
/// cleanly.
///
/// On disk the record is a single-level JSON object: string values quoted,
/// integers and booleans bare, one entry per line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParametersRecord {
    values: IndexMap<String, ParamValue>,
}

impl ParametersRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Replacing keeps the key's original
    /// position; new keys append.
    pub fn set<V: Into<ParamValue>>(&mut self, key: &str, value: V) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(ParamValue::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(ParamValue::as_int)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(ParamValue::as_bool)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    /// Overlay another record onto this one: values from `other` win,
    /// existing keys keep their position, unknown keys append in `other`'s
    /// order.
    pub fn overlay(&mut self, other: &ParametersRecord) {
        for (key, value) in other.iter() {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Serialize the record to `path` as a flat JSON object.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let mut text = serde_json::to_string_pretty(&self)
            .context("Failed to serialize parameters record")?;
        text.push('\n');

        fs::write(path, text)
            .with_context(|| format!("Failed to write parameters record: {}", path))?;

        tracing::debug!("Saved parameters record to {}", path);
        Ok(())
    }

    /// Load a record from `path`.
    ///
    /// A missing file is not an error: it returns an empty record and logs a
    /// warning, so callers can proceed with their defaults. A present but
    /// malformed file (bad syntax, nested values) is an error.
    pub fn load(path: &Utf8Path) -> Result<ParametersRecord> {
        if !path.exists() {
            tracing::warn!("Parameters record not found at {}, using defaults", path);
            return Ok(ParametersRecord::default());
        }

        let file_contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameters record: {}", path))?;

        let record: ParametersRecord = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse parameters record: {}", path))?;

        tracing::debug!("Loaded parameters record from {}", path);
        Ok(record)
    }
}
