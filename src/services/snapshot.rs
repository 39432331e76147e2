//! JSON snapshot of an in-memory workspace.
//!
//! The CLI works on a single JSON file holding every table plus the state of the
//! in-memory collaborators. [`Workspace`] keeps concrete handles to those
//! collaborators so the state can be written back after a command.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

use super::fields::{FieldsState, MemoryFieldHandler};
use super::files::{FileEntry, MemoryFileStorage};
use super::roles::{MemoryRoleProvider, RolesState};
use super::{Services, cache_for};
use crate::config::GlobalConfig;
use crate::datasource::DataSourceRegistry;
use crate::models::{ContentItem, ContentType, UserListRow, UserListSchema};
use crate::store::{MemoryTable, Repository, Store};
use crate::templating::TeraEngine;

/// Serialised form of a [`Workspace`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub types: Vec<ContentType>,
    #[serde(default)]
    pub contents: Vec<ContentItem>,
    #[serde(default)]
    pub userlist_schemas: Vec<UserListSchema>,
    #[serde(default)]
    pub userlist_rows: Vec<UserListRow>,
    #[serde(default)]
    pub fields: FieldsState,
    #[serde(default)]
    pub roles: RolesState,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

impl Snapshot {
    /// Load a snapshot; a missing file is an empty workspace.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No snapshot at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create snapshot directory {}", parent.display())
                })?;
            }
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize snapshot")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write snapshot {}", path.display()))
    }
}

/// In-memory collaborators with concrete handles.
pub struct Workspace {
    pub store: Store,
    pub fields: Arc<MemoryFieldHandler>,
    pub roles: Arc<MemoryRoleProvider>,
    pub files: Arc<MemoryFileStorage>,
}

impl Workspace {
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let store = Store {
            types: Arc::new(MemoryTable::from_records(snapshot.types)),
            contents: Arc::new(MemoryTable::from_records(snapshot.contents)),
            userlist_schemas: Arc::new(MemoryTable::from_records(snapshot.userlist_schemas)),
            userlist_rows: Arc::new(MemoryTable::from_records(snapshot.userlist_rows)),
        };
        Ok(Self {
            store,
            fields: Arc::new(MemoryFieldHandler::from_state(snapshot.fields)),
            roles: Arc::new(MemoryRoleProvider::from_state(snapshot.roles)),
            files: Arc::new(MemoryFileStorage::from_entries(snapshot.files)?),
        })
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            types: self.store.types.all()?,
            contents: self.store.contents.all()?,
            userlist_schemas: self.store.userlist_schemas.all()?,
            userlist_rows: self.store.userlist_rows.all()?,
            fields: self.fields.state(),
            roles: self.roles.state()?,
            files: self.files.entries(),
        })
    }

    /// Services over this workspace, using `registry` for data sources.
    pub fn services(&self, config: &GlobalConfig, registry: Arc<DataSourceRegistry>) -> Services {
        Services {
            store: self.store.clone(),
            cache: cache_for(config),
            fields: self.fields.clone(),
            roles: self.roles.clone(),
            files: self.files.clone(),
            templates: Arc::new(TeraEngine::default()),
            site: config.site.clone(),
            registry,
        }
    }
}
