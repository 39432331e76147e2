//! Data sources: pluggable providers of render data.
//!
//! A data source contributes one named sub-tree to the data a content item is
//! rendered with, and decides on its own whether that contribution may be
//! cached and under which key. Data sources are ephemeral: a fresh instance is
//! built per request from a [`DataSourceFactory`], bound to one
//! [`DataSourceContext`] (a content type plus a content item, possibly a
//! synthetic preview item).
//!
//! # Cache keys
//!
//! Every data source yields two key fragments:
//!
//! - the **instance** fragment, which changes with the item's own data
//! - the **config** fragment, which changes with the type-level configuration
//!
//! Their concatenation is the source's full key. `None` anywhere means "do not
//! cache", and vetoes caching of the whole rendered item. How fragments are
//! derived is chosen per source through [`CacheStrategy`].
//!
//! # Built-in sources
//!
//! | Short name | Contents | Strategy |
//! |---|---|---|
//! | `site` | site name and base URL | constant `""` fragments, never cached |
//! | `fields` | custom field values | hash |
//! | `images` | type-level image URLs | hash (config only) |
//! | `roles` | course role roster | revision |
//! | `userlist` | author-defined table rows | hash |
//!
//! # Lifecycle hooks
//!
//! Type create/update runs [`DataSource::config_on_update`]; type deletion runs
//! [`DataSource::config_on_delete`] on every registered source. Item
//! create/update runs [`DataSource::instance_on_update`]; item deletion runs
//! [`DataSource::instance_on_delete`] on every registered source.

pub mod fields;
pub mod forms;
pub mod images;
pub mod registry;
pub mod roles;
pub mod site;
pub mod strategy;
pub mod userlist;


use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::backup::RestoreTask;
use crate::cache::datasource_area;
use crate::models::{ContentItem, ContentType};
use crate::services::Services;
use crate::store::Repository;

pub use fields::FieldsDataSource;
pub use forms::{
    FormBuilder, FormData, FormField, FormFieldKind, FormFiles, FormSubmission, UploadedFile,
    ValidationError,
};
pub use images::ImagesDataSource;
pub use registry::{DataSourceFactory, DataSourcePlugin, DataSourceRegistry, FnFactory};
pub use roles::{DuplicatePolicy, RolesDataSource};
pub use site::SiteDataSource;
pub use strategy::{CacheStrategy, hash_value};
pub use userlist::UserListDataSource;

/// The content type and item a data source instance is bound to.
///
/// Cloning shares the underlying records, so every source built for one request
/// sees the others' updates to custom data.
#[derive(Clone)]
pub struct DataSourceContext {
    services: Services,
    content_type: Rc<RefCell<ContentType>>,
    item: Rc<RefCell<ContentItem>>,
}

impl DataSourceContext {
    pub fn for_item(services: Services, content_type: ContentType, item: ContentItem) -> Self {
        Self {
            services,
            content_type: Rc::new(RefCell::new(content_type)),
            item: Rc::new(RefCell::new(item)),
        }
    }

    /// Context for type-level work, bound to a sample item.
    pub fn for_type(services: Services, content_type: ContentType) -> Self {
        let item = ContentItem::sample(&content_type);
        Self::for_item(services, content_type, item)
    }

    /// Load a persisted item and its type.
    pub fn load(services: Services, content_id: i64) -> Result<Self> {
        let item = services.store.get_content(content_id)?;
        let content_type = services.store.get_type(item.type_id)?;
        Ok(Self::for_item(services, content_type, item))
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn content_type(&self) -> Ref<'_, ContentType> {
        self.content_type.borrow()
    }

    pub fn item(&self) -> Ref<'_, ContentItem> {
        self.item.borrow()
    }

    pub fn type_id(&self) -> i64 {
        self.content_type.borrow().id
    }

    pub fn item_id(&self) -> i64 {
        self.item.borrow().id
    }

    pub fn is_sample(&self) -> bool {
        self.item.borrow().is_sample
    }

    /// Mutate the item and persist it when it exists in the store.
    pub fn update_item(&self, f: impl FnOnce(&mut ContentItem)) -> Result<()> {
        let mut item = self.item.borrow_mut();
        f(&mut item);
        if item.is_persisted() {
            item.time_modified = Utc::now();
            self.services.store.contents.update(&item)?;
        }
        Ok(())
    }

    /// Mutate the type and persist it when it exists in the store.
    pub fn update_type(&self, f: impl FnOnce(&mut ContentType)) -> Result<()> {
        let mut content_type = self.content_type.borrow_mut();
        f(&mut content_type);
        if content_type.id > 0 {
            content_type.time_modified = Utc::now();
            self.services.store.types.update(&content_type)?;
        }
        Ok(())
    }

    /// Replace the bound records, e.g. after a manager persisted them.
    pub fn rebind(&self, content_type: ContentType, item: ContentItem) {
        *self.content_type.borrow_mut() = content_type;
        *self.item.borrow_mut() = item;
    }
}

/// A provider of one named sub-tree of render data.
///
/// Only identity, [`get_data`](Self::get_data) and the cache strategy are
/// required; every hook has a no-op default and every cache-key method defaults
/// to the chosen [`CacheStrategy`].
pub trait DataSource {
    /// Registry key; also the top-level key of this source's data.
    fn short_name(&self) -> &str;

    fn display_name(&self) -> String;

    fn context(&self) -> &DataSourceContext;

    /// The fully computed data of this source for the bound item.
    ///
    /// Must be a pure function of persisted state.
    fn get_data(&self) -> Result<Value>;

    fn cache_strategy(&self) -> CacheStrategy;

    /// Whether administrators may disable the source for a type.
    fn is_optional(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        !self.is_optional() || self.context().content_type().datasources.contains(self.short_name())
    }

    /// [`get_data`](Self::get_data) served through the `ds_<shortname>` cache area.
    fn get_cached_data(&self) -> Result<Value> {
        let ctx = self.context();
        if ctx.is_sample() || self.cache_strategy() == CacheStrategy::Null {
            return self.get_data();
        }
        let key = match self.get_full_cache_key()? {
            Some(key) if !key.is_empty() => key,
            _ => return self.get_data(),
        };

        let area = datasource_area(self.short_name());
        let cache = &ctx.services().cache;
        if let Some(data) = cache.get(&area, &key) {
            tracing::debug!("Data cache hit for '{}' ({key})", self.short_name());
            return Ok(data);
        }
        let data = self.get_data()?;
        cache.set(&area, &key, data.clone());
        Ok(data)
    }

    fn config_form_definition(&self, _form: &mut FormBuilder) -> Result<()> {
        Ok(())
    }

    fn config_form_default_data(&self, _data: &mut FormData) -> Result<()> {
        Ok(())
    }

    fn config_form_validation(&self, _data: &FormData, _files: &FormFiles) -> Vec<ValidationError> {
        Vec::new()
    }

    fn instance_form_definition(&self, _form: &mut FormBuilder) -> Result<()> {
        Ok(())
    }

    fn instance_form_default_data(&self, _data: &mut FormData) -> Result<()> {
        Ok(())
    }

    fn instance_form_validation(
        &self,
        _data: &FormData,
        _files: &FormFiles,
    ) -> Vec<ValidationError> {
        Vec::new()
    }

    /// Persist type configuration from the config form, then refresh the config key.
    fn config_on_update(&self, _submission: &FormSubmission) -> Result<()> {
        self.update_config_cache_key()
    }

    /// Remove everything this source stores for the type.
    fn config_on_delete(&self) -> Result<()> {
        Ok(())
    }

    /// Persist item data from the instance form, then refresh the instance key.
    fn instance_on_update(&self, _submission: &FormSubmission) -> Result<()> {
        self.update_instance_cache_key()
    }

    /// Remove everything this source stores for the item.
    fn instance_on_delete(&self) -> Result<()> {
        Ok(())
    }

    fn get_instance_cache_key(&self) -> Result<Option<String>> {
        self.cache_strategy().instance_cache_key(self)
    }

    fn get_config_cache_key(&self) -> Result<Option<String>> {
        self.cache_strategy().config_cache_key(self)
    }

    /// Instance and config fragments concatenated; `None` if either is withheld.
    fn get_full_cache_key(&self) -> Result<Option<String>> {
        let Some(instance) = self.get_instance_cache_key()? else {
            return Ok(None);
        };
        let Some(config) = self.get_config_cache_key()? else {
            return Ok(None);
        };
        Ok(Some(format!("{instance}{config}")))
    }

    fn update_instance_cache_key(&self) -> Result<()> {
        self.cache_strategy().update_instance_cache_key(self)
    }

    fn update_config_cache_key(&self) -> Result<()> {
        self.cache_strategy().update_config_cache_key(self)
    }

    /// Document hashed into the config fragment by [`CacheStrategy::Hash`].
    fn config_hash_source(&self) -> Result<Value> {
        Ok(self.config_export()?.unwrap_or(Value::Null))
    }

    /// Section of the type backup document owned by this source.
    fn config_backup(&self) -> Result<Option<Value>> {
        self.config_export()
    }

    /// Section of the item backup document owned by this source.
    fn instance_backup(&self) -> Result<Option<Value>> {
        Ok(None)
    }

    /// Rebuild type-level state from a backup section.
    fn config_restore(&self, section: &Value, _task: &mut RestoreTask) -> Result<()> {
        self.config_import(section)
    }

    /// Rebuild item-level state from a backup section.
    fn instance_restore(&self, _section: &Value, _task: &mut RestoreTask) -> Result<()> {
        Ok(())
    }

    /// Portable form of this source's type configuration.
    fn config_export(&self) -> Result<Option<Value>> {
        Ok(None)
    }

    fn config_import(&self, _document: &Value) -> Result<()> {
        Ok(())
    }
}
