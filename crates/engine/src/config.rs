use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use casefold_storage::StoreOptions;

use crate::error::EngineError;

pub const DEFAULT_UNDO_DEPTH: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub attachments: AttachmentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file; `None` keeps the store in memory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub atomic_batches: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            atomic_batches: default_true(),
        }
    }
}

impl StoreConfig {
    pub fn options(&self) -> StoreOptions {
        StoreOptions {
            atomic_batches: self.atomic_batches,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_undo_depth")]
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: default_undo_depth(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentConfig {
    /// Directory uploaded evidence is copied into. Attachments are disabled
    /// when unset.
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_undo_depth() -> usize {
    DEFAULT_UNDO_DEPTH
}

impl EngineConfig {
    pub fn from_toml(content: &str) -> Result<Self, EngineError> {
        toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("failed to parse {}: {e}", path.display())))
    }
}
