//! The optional `sg13g2.toml` configuration file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "sg13g2.toml";

/// Settings shared by the layout commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory that GDS files are written to when no output path is given.
    pub output_dir: PathBuf,
    /// GDS library name. Defaults to the name of the top cell.
    pub library_name: Option<ArcStr>,
    /// Whether to emit a text label for each port.
    pub port_labels: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("build"),
            library_name: None,
            port_labels: true,
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads the configuration.
    ///
    /// An explicit `path` must exist. Without one, [`CONFIG_FILE`] is read if
    /// present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.exists() {
                    tracing::debug!("no {CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}.", path))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Failed to parse config file {:?}.", path))?;
        tracing::debug!(?path, ?config, "loaded config");
        Ok(config)
    }
}
