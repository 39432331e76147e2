//! Lifecycle of content types and content items.
//!
//! The managers persist records and run the data source hooks around each
//! change, so data sources never need to be driven by hand.

use anyhow::Result;
use tracing::{debug, info};

use super::Renderer;
use crate::cache::content_area;
use crate::core::CmsError;
use crate::datasource::{
    CacheStrategy, DataSourceContext, FormBuilder, FormData, FormSubmission, ValidationError,
};
use crate::models::{ContentItem, ContentType};
use crate::services::Services;
use crate::store::Repository;

/// Creates, updates and deletes content types.
pub struct ContentTypeManager {
    services: Services,
}

impl ContentTypeManager {
    pub fn new(services: Services) -> Self {
        Self {
            services,
        }
    }

    fn check_datasources(&self, content_type: &ContentType) -> Result<(), CmsError> {
        for short_name in content_type.datasources.iter() {
            if !self.services.registry.contains(short_name) {
                return Err(CmsError::UnknownDataSource {
                    short_name: short_name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Config form fields and defaults contributed by the type's enabled sources.
    pub fn config_form(&self, content_type: &ContentType) -> Result<(FormBuilder, FormData)> {
        let ctx = DataSourceContext::for_type(self.services.clone(), content_type.clone());
        let mut form = FormBuilder::new();
        let mut data = FormData::new();
        for source in self.services.registry.list_enabled(&ctx, true) {
            source.config_form_definition(&mut form)?;
            source.config_form_default_data(&mut data)?;
        }
        Ok((form, data))
    }

    /// Collected validation messages; empty when the submission is acceptable.
    pub fn validate(
        &self,
        content_type: &ContentType,
        submission: &FormSubmission,
    ) -> Vec<ValidationError> {
        let mut errors: Vec<ValidationError> = content_type
            .datasources
            .iter()
            .filter(|name| !self.services.registry.contains(name))
            .map(|name| ValidationError::new("datasources", format!("Unknown data source '{name}'")))
            .collect();
        let ctx = DataSourceContext::for_type(self.services.clone(), content_type.clone());
        for source in self.services.registry.list_enabled(&ctx, true) {
            errors.extend(source.config_form_validation(&submission.data, &submission.files));
        }
        errors
    }

    pub fn create(
        &self,
        content_type: ContentType,
        submission: &FormSubmission,
    ) -> Result<ContentType> {
        self.check_datasources(&content_type)?;
        let stored = self.services.store.types.create(content_type)?;
        info!("Created content type {} '{}'", stored.id, stored.name);
        self.apply_config(stored, submission)
    }

    pub fn update(
        &self,
        content_type: ContentType,
        submission: &FormSubmission,
    ) -> Result<ContentType> {
        self.check_datasources(&content_type)?;
        self.services.store.types.update(&content_type)?;
        info!("Updated content type {} '{}'", content_type.id, content_type.name);
        self.apply_config(content_type, submission)
    }

    fn apply_config(
        &self,
        content_type: ContentType,
        submission: &FormSubmission,
    ) -> Result<ContentType> {
        let type_id = content_type.id;
        let ctx = DataSourceContext::for_type(self.services.clone(), content_type);
        for source in self.services.registry.list_enabled(&ctx, true) {
            source.config_on_update(submission)?;
        }
        let updated = ctx.content_type().clone();
        self.refresh_items(&updated)?;
        self.services.cache.purge_area(&content_area(type_id));
        Ok(updated)
    }

    /// Recompute hashed instance fragments and names of the type's items.
    ///
    /// A hashed instance fragment may depend on the type's configuration, and
    /// the title template may have changed.
    fn refresh_items(&self, content_type: &ContentType) -> Result<()> {
        let items = self.services.store.contents_of_type(content_type.id)?;
        if items.is_empty() {
            return Ok(());
        }
        let contents = ContentManager::new(self.services.clone());
        for item in items {
            let ctx = DataSourceContext::for_item(self.services.clone(), content_type.clone(), item);
            for source in self.services.registry.list_enabled(&ctx, true) {
                if source.cache_strategy() == CacheStrategy::Hash {
                    source.update_instance_cache_key()?;
                }
            }
            contents.update_name(&ctx)?;
        }
        debug!("Refreshed items of content type {}", content_type.id);
        Ok(())
    }

    /// Delete a type that no content item uses any more.
    ///
    /// Every registered source gets to clean up, enabled or not.
    pub fn delete(&self, type_id: i64) -> Result<()> {
        let count = self.services.store.contents_of_type(type_id)?.len();
        if count > 0 {
            return Err(CmsError::TypeInUse {
                id: type_id,
                count,
            }
            .into());
        }
        let content_type = self.services.store.get_type(type_id)?;
        let ctx = DataSourceContext::for_type(self.services.clone(), content_type);
        for source in self.services.registry.list_all(&ctx) {
            source.config_on_delete()?;
        }
        self.services.store.types.delete(type_id)?;
        self.services.cache.purge_area(&content_area(type_id));
        info!("Deleted content type {type_id}");
        Ok(())
    }

    /// Rendered preview of a type using a sample item.
    pub fn preview(&self, content_type: &ContentType) -> Result<String> {
        Renderer::for_sample(self.services.clone(), content_type.clone()).get_html()
    }
}

/// Creates, updates and deletes content items.
pub struct ContentManager {
    services: Services,
}

impl ContentManager {
    pub fn new(services: Services) -> Self {
        Self {
            services,
        }
    }

    /// Instance form fields and defaults contributed by the item's enabled sources.
    pub fn instance_form(&self, content_id: i64) -> Result<(FormBuilder, FormData)> {
        let ctx = DataSourceContext::load(self.services.clone(), content_id)?;
        let mut form = FormBuilder::new();
        let mut data = FormData::new();
        for source in self.services.registry.list_enabled(&ctx, true) {
            source.instance_form_definition(&mut form)?;
            source.instance_form_default_data(&mut data)?;
        }
        Ok((form, data))
    }

    pub fn validate(&self, type_id: i64, submission: &FormSubmission) -> Result<Vec<ValidationError>> {
        let content_type = self.services.store.get_type(type_id)?;
        let ctx = DataSourceContext::for_type(self.services.clone(), content_type);
        Ok(self
            .services
            .registry
            .list_enabled(&ctx, true)
            .iter()
            .flat_map(|source| source.instance_form_validation(&submission.data, &submission.files))
            .collect())
    }

    pub fn create(
        &self,
        type_id: i64,
        course_id: i64,
        submission: &FormSubmission,
    ) -> Result<ContentItem> {
        let content_type = self.services.store.get_type(type_id)?;
        let item = self.services.store.contents.create(ContentItem::new(course_id, type_id))?;
        info!("Created content item {} of type {type_id}", item.id);
        let ctx = DataSourceContext::for_item(self.services.clone(), content_type, item);
        self.apply_instance(&ctx, submission)
    }

    pub fn update(&self, content_id: i64, submission: &FormSubmission) -> Result<ContentItem> {
        let ctx = DataSourceContext::load(self.services.clone(), content_id)?;
        self.apply_instance(&ctx, submission)
    }

    fn apply_instance(
        &self,
        ctx: &DataSourceContext,
        submission: &FormSubmission,
    ) -> Result<ContentItem> {
        for source in self.services.registry.list_enabled(ctx, true) {
            source.instance_on_update(submission)?;
        }
        self.update_name(ctx)?;
        let item = ctx.item().clone();
        Ok(item)
    }

    /// Re-render the title template and persist the name when it changed.
    pub fn update_name(&self, ctx: &DataSourceContext) -> Result<bool> {
        let name = Renderer::new(ctx.clone()).get_name()?;
        if ctx.item().name == name {
            return Ok(false);
        }
        ctx.update_item(|item| item.name = name)?;
        Ok(true)
    }

    /// Delete an item after every registered source cleaned up after it.
    pub fn delete(&self, content_id: i64) -> Result<()> {
        let ctx = DataSourceContext::load(self.services.clone(), content_id)?;
        for source in self.services.registry.list_all(&ctx) {
            source.instance_on_delete()?;
        }
        self.services.store.contents.delete(content_id)?;
        info!("Deleted content item {content_id}");
        Ok(())
    }

    pub fn render(&self, content_id: i64) -> Result<String> {
        Renderer::for_content(self.services.clone(), content_id)?.get_html()
    }
}
