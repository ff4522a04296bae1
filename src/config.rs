//! Checker configuration, persisted as TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::eval::DEFAULT_MAX_DEFINITION_DEPTH;
use crate::model::ModelKind;

/// How documents and formulas are checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Models every proposition is checked in, in order.
    #[serde(default = "default_models")]
    pub models: Vec<ModelKind>,
    /// Valuations to visit per proposition and model before giving up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u64>,
    /// Nesting bound for derived constants that use other derived constants.
    #[serde(default = "default_max_definition_depth")]
    pub max_definition_depth: usize,
    /// Check propositions on the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,
}

fn default_models() -> Vec<ModelKind> {
    ModelKind::ALL.to_vec()
}
fn default_max_definition_depth() -> usize {
    DEFAULT_MAX_DEFINITION_DEPTH
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            max_iterations: None,
            max_definition_depth: default_max_definition_depth(),
            parallel: false,
        }
    }
}

impl CheckerConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
