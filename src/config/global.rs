//! Global configuration for the content engine.
//!
//! Settings live in a TOML file:
//!
//! - **Unix/macOS**: `~/.cms/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\cms\config.toml`
//!
//! The location can be overridden using the `CMS_CONFIG_PATH` environment variable.
//! A missing file yields defaults.
//!
//! ```toml
//! [site]
//! fullname = "Acme Learning"
//! shortname = "acme"
//! wwwroot = "https://learn.example.com"
//!
//! [cache]
//! enabled = true
//!
//! [store]
//! path = "cms-store.json"
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use cms_engine::config::GlobalConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut config = GlobalConfig::load().await?;
//! config.site.fullname = "Acme".to_string();
//! config.save().await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "CMS_CONFIG_PATH";

/// Site-wide facts exposed to templates through the `site` data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub fullname: String,
    pub shortname: String,
    pub wwwroot: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            fullname: "Learning site".to_string(),
            shortname: "site".to_string(),
            wwwroot: "http://localhost".to_string(),
        }
    }
}

/// Content cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false, rendering never reads or writes the content cache.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Snapshot store settings used by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cms-store.json"),
        }
    }
}

/// Global configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl GlobalConfig {
    /// Load from the default location, falling back to defaults when absent.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from an explicit path if given, else the default location.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    pub async fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path).await
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// `CMS_CONFIG_PATH` if set, else the platform default.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("cms")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".cms")
        };

        Ok(config_dir.join("config.toml"))
    }
}
