//! Server configuration
//!
//! Loaded from JSON:
//! ```json
//! {
//!   "max_broken_links": 100,
//!   "progress_interval": 10,
//!   "user_agent": "my-bot/1.0"
//! }
//! ```
//!
//! Lookup order: explicit `--config PATH`, then
//! `{config_dir}/linkscan-mcp/config.json`, then built-in defaults.
//! Command line flags override whatever the file says.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::scan::report::DEFAULT_MAX_BROKEN_LINKS;

/// Links checked between periodic progress updates
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Broken links listed in a report before the overflow line
    pub max_broken_links: usize,
    /// Checked links between periodic progress updates
    pub progress_interval: u64,
    /// Default user agent of the built-in engine
    pub user_agent: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_broken_links: DEFAULT_MAX_BROKEN_LINKS,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            user_agent: None,
        }
    }
}

impl ServerConfig {
    /// Load config from a JSON file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ServerConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file as JSON: {}", path.display()))?;

        Ok(config)
    }

    /// Per-user config location
    ///
    /// - Linux: ~/.config/linkscan-mcp/config.json
    /// - macOS: ~/Library/Application Support/linkscan-mcp/config.json
    /// - Windows: %APPDATA%\linkscan-mcp\config.json
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("linkscan-mcp").join("config.json"))
    }

    /// Load from `explicit` when given, else from the default location if it
    /// exists, else defaults
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.progress_interval == 0 {
            bail!("progress_interval must be at least 1");
        }
        Ok(())
    }
}
