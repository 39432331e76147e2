//! External collaborators and the [`Services`] bundle.
//!
//! The engine reaches the host platform only through the traits in this module
//! plus the [`Store`] and [`ContentCache`]. Every data source instance is handed
//! a [`Services`] handle, a cheap clone of shared `Arc`s, so implementations can
//! be swapped wholesale (in-memory for the CLI and tests, host-backed elsewhere).

pub mod fields;
pub mod files;
pub mod roles;
pub mod snapshot;

use std::sync::Arc;

use crate::cache::{ContentCache, MemoryContentCache, NoopContentCache};
use crate::config::{GlobalConfig, SiteConfig};
use crate::core::RegistryError;
use crate::datasource::DataSourceRegistry;
use crate::store::Store;
use crate::templating::{TemplateEngine, TeraEngine};

pub use fields::{CustomFieldHandler, FieldDefinition, FieldKind, MemoryFieldHandler};
pub use files::{FileArea, FileStorage, MemoryFileStorage, StoredFile};
pub use roles::{MemoryRoleProvider, Role, RoleProvider, UserProfile};
pub use snapshot::{Snapshot, Workspace};

/// Context id under which type-level files are stored.
pub const SYSTEM_CONTEXT_ID: i64 = 1;

/// Handles to every collaborator the engine uses.
#[derive(Clone)]
pub struct Services {
    pub store: Store,
    pub cache: Arc<dyn ContentCache>,
    pub fields: Arc<dyn CustomFieldHandler>,
    pub roles: Arc<dyn RoleProvider>,
    pub files: Arc<dyn FileStorage>,
    pub templates: Arc<dyn TemplateEngine>,
    pub site: SiteConfig,
    pub registry: Arc<DataSourceRegistry>,
}

impl Services {
    /// Fully in-memory services with the built-in data sources registered.
    pub fn in_memory(config: &GlobalConfig) -> Result<Self, RegistryError> {
        let registry = DataSourceRegistry::with_builtins();
        registry.register()?;
        Ok(Self {
            store: Store::in_memory(),
            cache: cache_for(config),
            fields: Arc::new(MemoryFieldHandler::new()),
            roles: Arc::new(MemoryRoleProvider::new()),
            files: Arc::new(MemoryFileStorage::new()),
            templates: Arc::new(TeraEngine::default()),
            site: config.site.clone(),
            registry: Arc::new(registry),
        })
    }
}

/// Content cache honouring `[cache] enabled`.
pub fn cache_for(config: &GlobalConfig) -> Arc<dyn ContentCache> {
    if config.cache.enabled {
        Arc::new(MemoryContentCache::new())
    } else {
        tracing::debug!("Content cache disabled by configuration");
        Arc::new(NoopContentCache)
    }
}
