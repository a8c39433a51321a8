//! Configuration management for Radiocast

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::media::HLS_MIME_TYPE;
use crate::types::SectionId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fragments: FragmentsConfig,
    pub feed: FeedConfig,
    pub shell: ShellConfig,
    pub player: PlayerConfig,
    pub http: HttpConfig,
}

/// Where section fragments are served from
///
/// A section resolves to `{base_url}{directory}/{section}.{extension}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentsConfig {
    pub base_url: String,
    pub directory: String,
    pub extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub default_section: SectionId,
    pub container_id: String,
    pub error_markup: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub native_mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: Option<u64>,
}

impl Default for FragmentsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            directory: "partials".to_string(),
            extension: "html".to_string(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "https://cards-wol-fa.yinzcam.com/V1/Card/PROGRAMMES".to_string(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            default_section: SectionId::home(),
            container_id: crate::document::ids::CONTENT.to_string(),
            error_markup: "<p>Error loading content.</p>".to_string(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            native_mime_type: HLS_MIME_TYPE.to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("radiocast/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from the default location, falling back to defaults
    /// when no file exists there
    pub fn load_or_default() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default_config());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    fn validate(&self) -> Result<()> {
        if self.fragments.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField("fragments.base_url".to_string()).into());
        }
        if self.feed.url.trim().is_empty() {
            return Err(ConfigError::MissingField("feed.url".to_string()).into());
        }
        if self.shell.container_id.trim().is_empty() {
            return Err(ConfigError::MissingField("shell.container_id".to_string()).into());
        }
        Ok(())
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("RADIOCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("radiocast").join("config.toml"))
}
