//! User settings (`~/.config/stackcraft/config.yaml`)

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PROJECT: &str = "stackcraft";
pub const DEFAULT_STACK: &str = "dev";
pub const DEFAULT_STATE_DIR: &str = ".stackcraft";

const SETTINGS_FILE: &str = "config.yaml";

/// Optional defaults for every command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Project name used in resource URNs
    pub project: Option<String>,

    /// Stack used when neither `--stack` nor `STACKCRAFT_STACK` is given
    pub default_stack: Option<String>,

    /// Where stack state is written, relative to the working directory
    pub state_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from `STACKCRAFT_CONFIG` or the user config directory
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = match std::env::var("STACKCRAFT_CONFIG") {
            Ok(path) => PathBuf::from(path),
            Err(_) => match dirs::config_dir() {
                Some(dir) => dir.join("stackcraft").join(SETTINGS_FILE),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| ConfigError::InvalidSettings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn project(&self) -> &str {
        self.project.as_deref().unwrap_or(DEFAULT_PROJECT)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
    }
}

/// Pick the stack name
///
/// Order: the CLI flag, `STACKCRAFT_STACK`, the settings default, then `dev`.
pub fn resolve_stack(flag: Option<&str>, settings: &Settings) -> String {
    if let Some(stack) = flag.filter(|s| !s.is_empty()) {
        return stack.to_string();
    }
    if let Ok(stack) = std::env::var("STACKCRAFT_STACK")
        && !stack.is_empty()
    {
        return stack;
    }
    settings
        .default_stack
        .clone()
        .unwrap_or_else(|| DEFAULT_STACK.to_string())
}
