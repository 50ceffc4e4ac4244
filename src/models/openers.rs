use crate::models::run_config::ConfigError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How the host imaging application should open one class of files: a named
/// importer plus its option string, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenerSpec {
    #[serde(rename = "Opener")]
    pub opener: String,

    #[serde(rename = "Options", default)]
    pub options: String,
}

/// Declarative suffix → opener dispatch table, loaded from `Openers.yaml`.
///
/// Resolution is a first-match lookup in table order: the first suffix the
/// file name ends with wins, and anything unmatched falls through to the
/// generic opener if one is configured. The table order is the file order,
/// preserved by [`IndexMap`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenerTable {
    #[serde(rename = "Openers")]
    pub openers: IndexMap<String, OpenerSpec>,

    #[serde(rename = "Generic", default)]
    pub generic: Option<OpenerSpec>,
}

impl Default for OpenerTable {
    fn default() -> Self {
        let mut openers = IndexMap::new();
        openers.insert(
            "h5".to_string(),
            OpenerSpec {
                opener: "Scriptable load HDF5".to_string(),
                options: "datasetnames=/Data nframes=1 nchannels=1".to_string(),
            },
        );
        openers.insert(
            "ims".to_string(),
            OpenerSpec {
                opener: "Bio-Formats Importer".to_string(),
                options: "autoscale color_mode=Default view=Hyperstack".to_string(),
            },
        );
        openers.insert(
            "nd2".to_string(),
            OpenerSpec {
                opener: "Bio-Formats Importer".to_string(),
                options: "autoscale color_mode=Composite view=Hyperstack".to_string(),
            },
        );
        openers.insert(
            "qptiff".to_string(),
            OpenerSpec {
                opener: "Bio-Formats Importer".to_string(),
                options: "autoscale color_mode=Default series_1".to_string(),
            },
        );

        Self {
            openers,
            generic: Some(OpenerSpec {
                opener: "Open".to_string(),
                options: String::new(),
            }),
        }
    }
}

impl OpenerTable {
    /// Check the table at configuration load time.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidOpener`] for an empty suffix key or an entry
    /// with an empty opener identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (suffix, spec) in &self.openers {
            if suffix.is_empty() {
                return Err(ConfigError::InvalidOpener(
                    suffix.clone(),
                    "suffix must not be empty".to_string(),
                ));
            }
            if spec.opener.is_empty() {
                return Err(ConfigError::InvalidOpener(
                    suffix.clone(),
                    "opener identifier must not be empty".to_string(),
                ));
            }
        }

        if let Some(generic) = &self.generic {
            if generic.opener.is_empty() {
                return Err(ConfigError::InvalidOpener(
                    "Generic".to_string(),
                    "opener identifier must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// First-match opener lookup for a file name. Returns the generic
    /// opener when no suffix matches, or `None` when there is no generic
    /// opener either.
    pub fn resolve(&self, file_name: &str) -> Option<&OpenerSpec> {
        self.openers
            .iter()
            .find(|(suffix, _)| file_name.ends_with(suffix.as_str()))
            .map(|(_, spec)| spec)
            .or(self.generic.as_ref())
    }
}
