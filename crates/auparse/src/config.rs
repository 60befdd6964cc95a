//! Decoder configuration, usually read from a TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Options that control how audit messages are decoded.
///
/// ```toml
/// max_msg_depth = 4
/// tables = "/etc/auparse/tables.toml"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// How many levels of embedded `msg='...'` payloads are re-tokenized.
    /// Userspace records nest one level; anything deeper is kept verbatim.
    pub max_msg_depth: usize,

    /// Supplemental lookup tables merged over the built-in ones.
    pub tables: Option<PathBuf>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_msg_depth: default_max_msg_depth(),
            tables: None,
        }
    }
}

fn default_max_msg_depth() -> usize {
    8
}

impl DecoderConfig {
    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file. A relative `tables` path is resolved against
    /// the directory containing the config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let (Some(tables), Some(dir)) = (config.tables.as_ref(), path.parent()) {
            if tables.is_relative() {
                config.tables = Some(dir.join(tables));
            }
        }
        Ok(config)
    }
}
