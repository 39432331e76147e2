//! Shared state of CLI commands.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::CliConfig;
use crate::config::GlobalConfig;
use crate::datasource::{DataSourceRegistry, FormData, FormSubmission, ValidationError};
use crate::services::{Services, Snapshot, Workspace};

/// Configuration, the loaded snapshot and the services built over it.
pub struct CommandContext {
    pub config: GlobalConfig,
    /// Snapshot file the workspace was loaded from and is saved back to.
    pub store_path: PathBuf,
    pub workspace: Workspace,
    services: Services,
}

impl CommandContext {
    /// Load configuration and snapshot as selected by `cli`.
    pub async fn load(cli: &CliConfig) -> Result<Self> {
        let config = GlobalConfig::load_with_optional(cli.config_path.clone()).await?;
        let store_path = cli.store_path.clone().unwrap_or_else(|| config.store.path.clone());
        Self::open(config, store_path).await
    }

    /// Open the snapshot at `store_path`; a missing file is an empty site.
    pub async fn open(config: GlobalConfig, store_path: PathBuf) -> Result<Self> {
        let snapshot = Snapshot::load(&store_path)
            .await
            .with_context(|| format!("Failed to load store {}", store_path.display()))?;
        let workspace = Workspace::from_snapshot(snapshot)?;

        let registry = DataSourceRegistry::with_builtins();
        registry.register()?;
        let services = workspace.services(&config, Arc::new(registry));
        debug!("Loaded store {}", store_path.display());

        Ok(Self {
            config,
            store_path,
            workspace,
            services,
        })
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Write the workspace back to the snapshot file.
    pub async fn save(&self) -> Result<()> {
        self.workspace
            .snapshot()?
            .save(&self.store_path)
            .await
            .with_context(|| format!("Failed to save store {}", self.store_path.display()))?;
        debug!("Saved store {}", self.store_path.display());
        Ok(())
    }
}

/// Build a form submission from a JSON object given inline or as `@file`.
pub async fn read_submission(data: Option<&str>) -> Result<FormSubmission> {
    let Some(data) = data else {
        return Ok(FormSubmission::default());
    };
    let raw = match data.strip_prefix('@') {
        Some(path) => read_text(Path::new(path)).await?,
        None => data.to_string(),
    };
    let value: Value = serde_json::from_str(&raw).context("Form data is not valid JSON")?;
    let Value::Object(map) = value else {
        anyhow::bail!("Form data must be a JSON object");
    };
    Ok(FormSubmission::new(map.into_iter().collect::<FormData>()))
}

pub async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Write `content` to `output`, or print it when no path is given.
pub async fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

/// Fail with every validation message at once.
pub fn ensure_valid(errors: &[ValidationError]) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    let lines: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
    anyhow::bail!("Form validation failed:\n{}", lines.join("\n"))
}
