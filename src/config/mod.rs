use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::engine::ParseMode;
use crate::source::SourceKind;


#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Defaults for tag replacement
    #[serde(default)]
    pub replace: ReplaceConfig,

    /// Defaults for property and secret resolution
    #[serde(default)]
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceConfig {
    /// Parse mode used when none is given on the command line
    #[serde(default)]
    pub parse_mode: ParseMode,

    /// Format of tag source files
    #[serde(default)]
    pub source_type: SourceKind,

    /// Prepend provenance comments to the output
    #[serde(default = "default_provenance")]
    pub provenance: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Namespace plain secrets are materialized in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Resolved properties and secrets file
    pub resolved: Option<PathBuf>,
}

fn default_provenance() -> bool {
    true
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Default for ReplaceConfig {
    fn default() -> Self {
        Self {
            parse_mode: ParseMode::default(),
            source_type: SourceKind::default(),
            provenance: default_provenance(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            resolved: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("retag").join("config.toml");
            if config_path.exists() {
                return Self::load_from(&config_path);
            }
        }
        Ok(Config::default())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
