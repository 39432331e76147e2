//! Backup and restore of content items.
//!
//! A [`ContentBackup`] holds two documents: the content type with every enabled
//! source's config section, and the item with every instance section. Restoring
//! runs in two phases:
//!
//! 1. The main pass recreates (or reuses) the type, creates the item and hands
//!    each section to its source's restore hook.
//! 2. Deferred handlers registered on the [`RestoreTask`] during the main pass run
//!    once, in registration order. Sources use them to recompute cache keys after
//!    all their rows exist; the name refresh always runs last.
//!
//! # Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "content_type": { "id": 4, "name": "Staff", "idnumber": "staff", ...,
//!                     "sources": { "roles": { "roles_list": ["teacher"], ... } } },
//!   "item": { "id": 17, "course_id": 2, "name": "Staff", "sources": { ... } }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::content::{ContentManager, ContentTypeManager};
use crate::core::CmsError;
use crate::datasource::DataSourceContext;
use crate::models::{ContentItem, ContentType, DatasourceSet};
use crate::services::Services;
use crate::store::Repository;

/// Table names used for id mappings.
pub const TYPE_TABLE: &str = "cms_types";
pub const CONTENT_TABLE: &str = "cms";

type DeferredHandler = Box<dyn FnOnce(&Services) -> Result<()>>;

/// Type-level part of a backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeBackup {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub idnumber: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub title_template: String,
    #[serde(default)]
    pub body_template: String,
    #[serde(default)]
    pub datasources: DatasourceSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Config section per source short name.
    #[serde(default)]
    pub sources: BTreeMap<String, Value>,
}

/// Item-level part of a backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBackup {
    pub id: i64,
    pub course_id: i64,
    #[serde(default)]
    pub name: String,
    /// Instance section per source short name.
    #[serde(default)]
    pub sources: BTreeMap<String, Value>,
}

/// A complete, self-contained backup of one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBackup {
    pub version: u32,
    pub content_type: TypeBackup,
    pub item: ItemBackup,
}

impl ContentBackup {
    /// Current backup format version.
    pub const CURRENT_VERSION: u32 = 1;

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a backup document, refusing versions newer than this build writes.
    pub fn from_json(content: &str) -> Result<Self> {
        let backup: Self = serde_json::from_str(content).map_err(|e| CmsError::InvalidBackup {
            reason: e.to_string(),
        })?;
        if backup.version > Self::CURRENT_VERSION {
            return Err(CmsError::InvalidBackup {
                reason: format!(
                    "backup version {} is newer than supported version {}",
                    backup.version,
                    Self::CURRENT_VERSION
                ),
            }
            .into());
        }
        Ok(backup)
    }
}

/// State of one restore operation.
///
/// Collects id mappings (old id to new id per table) and deferred completion
/// handlers during the main pass.
pub struct RestoreTask {
    services: Services,
    mappings: HashMap<(String, i64), i64>,
    deferred: Vec<(String, DeferredHandler)>,
}

impl RestoreTask {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            mappings: HashMap::new(),
            deferred: Vec::new(),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn set_mapping(&mut self, table: &str, old_id: i64, new_id: i64) {
        self.mappings.insert((table.to_string(), old_id), new_id);
    }

    pub fn get_mapping(&self, table: &str, old_id: i64) -> Option<i64> {
        self.mappings.get(&(table.to_string(), old_id)).copied()
    }

    /// Queue a handler to run after the main pass.
    pub fn defer(
        &mut self,
        label: impl Into<String>,
        handler: impl FnOnce(&Services) -> Result<()> + 'static,
    ) {
        self.deferred.push((label.into(), Box::new(handler)));
    }

    /// Queue a recomputation of one source's instance key for a restored item.
    pub fn defer_instance_key_refresh(&mut self, short_name: &str, item_id: i64) {
        let short_name = short_name.to_string();
        self.defer(format!("{short_name} instance key of item {item_id}"), move |services| {
            let ctx = DataSourceContext::load(services.clone(), item_id)?;
            services.registry.create(&short_name, &ctx)?.update_instance_cache_key()
        });
    }

    /// Queue a recomputation of one source's config key for a restored type.
    pub fn defer_config_key_refresh(&mut self, short_name: &str, type_id: i64) {
        let short_name = short_name.to_string();
        self.defer(format!("{short_name} config key of type {type_id}"), move |services| {
            let content_type = services.store.get_type(type_id)?;
            let ctx = DataSourceContext::for_type(services.clone(), content_type);
            services.registry.create(&short_name, &ctx)?.update_config_cache_key()
        });
    }

    pub fn pending(&self) -> usize {
        self.deferred.len()
    }

    /// Run every deferred handler in registration order.
    pub fn run_deferred(&mut self) -> Result<()> {
        for (label, handler) in std::mem::take(&mut self.deferred) {
            debug!("Running deferred restore step: {label}");
            handler(&self.services).with_context(|| format!("Deferred restore step failed: {label}"))?;
        }
        Ok(())
    }
}

/// Result of [`restore_content`].
#[derive(Debug, Clone)]
pub struct RestoredContent {
    pub content_type: ContentType,
    pub item: ContentItem,
    /// `false` when an existing type with the same idnumber was reused.
    pub type_created: bool,
}

/// Back up one content item together with its type.
pub fn backup_content(services: &Services, content_id: i64) -> Result<ContentBackup> {
    let ctx = DataSourceContext::load(services.clone(), content_id)?;
    let mut type_sections = BTreeMap::new();
    let mut item_sections = BTreeMap::new();
    for source in services.registry.list_enabled(&ctx, true) {
        let short_name = source.short_name().to_string();
        if let Some(section) = source.config_backup()? {
            type_sections.insert(short_name.clone(), section);
        }
        if let Some(section) = source.instance_backup()? {
            item_sections.insert(short_name, section);
        }
    }

    let content_type = ctx.content_type().clone();
    let item = ctx.item().clone();
    info!("Backed up content item {} of type {}", item.id, content_type.id);
    Ok(ContentBackup {
        version: ContentBackup::CURRENT_VERSION,
        content_type: TypeBackup {
            id: content_type.id,
            name: content_type.name,
            idnumber: content_type.idnumber,
            description: content_type.description,
            title_template: content_type.title_template,
            body_template: content_type.body_template,
            datasources: content_type.datasources,
            icon: content_type.icon,
            sources: type_sections,
        },
        item: ItemBackup {
            id: item.id,
            course_id: item.course_id,
            name: item.name,
            sources: item_sections,
        },
    })
}

fn find_type_by_idnumber(services: &Services, idnumber: &str) -> Result<Option<ContentType>> {
    if idnumber.is_empty() {
        return Ok(None);
    }
    Ok(services.store.types.find(&|t: &ContentType| t.idnumber == idnumber)?.into_iter().next())
}

/// Restore a backup into `course_id`.
///
/// A type with the same non-empty idnumber is reused as is; otherwise the type
/// is recreated and its config sections restored.
pub fn restore_content(
    services: &Services,
    backup: &ContentBackup,
    course_id: i64,
) -> Result<RestoredContent> {
    for short_name in backup.content_type.datasources.iter() {
        if !services.registry.contains(short_name) {
            return Err(CmsError::InvalidBackup {
                reason: format!("unknown data source '{short_name}'"),
            }
            .into());
        }
    }

    let mut task = RestoreTask::new(services.clone());
    let doc = &backup.content_type;

    let (content_type, type_created) = match find_type_by_idnumber(services, &doc.idnumber)? {
        Some(existing) => {
            info!("Reusing content type {} for idnumber '{}'", existing.id, doc.idnumber);
            (existing, false)
        }
        None => {
            let mut record = ContentType::new(doc.name.clone());
            record.idnumber = doc.idnumber.clone();
            record.description = doc.description.clone();
            record.title_template = doc.title_template.clone();
            record.body_template = doc.body_template.clone();
            record.datasources = doc.datasources.clone();
            record.icon = doc.icon.clone();
            let created = services.store.types.create(record)?;
            info!("Restored content type {} as {}", doc.id, created.id);
            (created, true)
        }
    };
    task.set_mapping(TYPE_TABLE, doc.id, content_type.id);

    let outcome =
        restore_sections(services, backup, course_id, &content_type, type_created, &mut task);
    let content_id = match outcome {
        Ok(content_id) => content_id,
        Err(e) => {
            warn!("Restore of content item {} failed, discarding partial records", backup.item.id);
            if let Err(cleanup) = discard_partial(services, &task, backup, content_type.id, type_created) {
                warn!("Could not discard partially restored records: {cleanup:#}");
            }
            return Err(e);
        }
    };

    let item = services.store.get_content(content_id)?;
    let content_type = services.store.get_type(item.type_id)?;
    info!("Restored content item {} as {}", backup.item.id, item.id);
    Ok(RestoredContent {
        content_type,
        item,
        type_created,
    })
}

/// Both restore phases; returns the new item's id.
fn restore_sections(
    services: &Services,
    backup: &ContentBackup,
    course_id: i64,
    content_type: &ContentType,
    type_created: bool,
    task: &mut RestoreTask,
) -> Result<i64> {
    if type_created {
        let ctx = DataSourceContext::for_type(services.clone(), content_type.clone());
        for source in services.registry.list_enabled(&ctx, true) {
            match backup.content_type.sources.get(source.short_name()) {
                Some(section) => source.config_restore(section, task)?,
                None => source.update_config_cache_key()?,
            }
        }
    }

    let content_type = services.store.get_type(content_type.id)?;
    let mut item = ContentItem::new(course_id, content_type.id);
    item.name = backup.item.name.clone();
    let item = services.store.contents.create(item)?;
    task.set_mapping(CONTENT_TABLE, backup.item.id, item.id);

    let ctx = DataSourceContext::for_item(services.clone(), content_type, item);
    for source in services.registry.list_enabled(&ctx, true) {
        match backup.item.sources.get(source.short_name()) {
            Some(section) => source.instance_restore(section, task)?,
            None => source.update_instance_cache_key()?,
        }
    }

    let content_id = ctx.item_id();
    task.defer(format!("name of item {content_id}"), move |services| {
        let ctx = DataSourceContext::load(services.clone(), content_id)?;
        ContentManager::new(services.clone()).update_name(&ctx)?;
        Ok(())
    });
    task.run_deferred()?;
    Ok(content_id)
}

/// Remove the item, and the type when this restore created it.
fn discard_partial(
    services: &Services,
    task: &RestoreTask,
    backup: &ContentBackup,
    type_id: i64,
    type_created: bool,
) -> Result<()> {
    if let Some(content_id) = task.get_mapping(CONTENT_TABLE, backup.item.id) {
        ContentManager::new(services.clone()).delete(content_id)?;
    }
    if type_created {
        ContentTypeManager::new(services.clone()).delete(type_id)?;
    }
    Ok(())
}
