//! Rendering of content items.
//!
//! The [`Renderer`] merges every active data source's contribution into one data
//! tree and drives the template engine over it. Rendered HTML is cached in the
//! type's `content_<type_id>` area under the item's aggregate cache key:
//!
//! ```text
//! START -> compute aggregate key
//!   any fragment withheld -> render fresh -> return (no store)
//!   else lookup(key)
//!     hit  -> return cached
//!     miss -> render fresh -> store(key) -> return
//! ```
//!
//! Preview (sample) items never touch the content cache.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::debug;

use crate::cache::content_area;
use crate::datasource::{DataSource, DataSourceContext};
use crate::models::ContentType;
use crate::services::Services;
use crate::templating::{RenderingMetadata, TemplateKind, flatten};

/// Top-level key holding the serialised data tree.
pub const DEBUG_KEY: &str = "debug";
/// Top-level key holding the item's display name.
pub const NAME_KEY: &str = "name";

pub struct Renderer {
    ctx: DataSourceContext,
}

impl Renderer {
    pub fn new(ctx: DataSourceContext) -> Self {
        Self {
            ctx,
        }
    }

    /// Renderer for a persisted content item.
    pub fn for_content(services: Services, content_id: i64) -> Result<Self> {
        Ok(Self::new(DataSourceContext::load(services, content_id)?))
    }

    /// Renderer for a preview of a content type.
    pub fn for_sample(services: Services, content_type: ContentType) -> Self {
        Self::new(DataSourceContext::for_type(services, content_type))
    }

    pub fn context(&self) -> &DataSourceContext {
        &self.ctx
    }

    fn sources(&self) -> Vec<Box<dyn DataSource>> {
        self.ctx.services().registry.list_enabled(&self.ctx, true)
    }

    /// Concatenation of every active source's full key; `None` if any is withheld.
    pub fn get_cache_key(&self) -> Result<Option<String>> {
        aggregate_key(&self.sources())
    }

    /// Data from every active source, keyed by short name, without `name`/`debug`.
    fn source_data(&self, sources: &[Box<dyn DataSource>]) -> Result<Map<String, Value>> {
        let mut data = Map::new();
        for source in sources {
            let value = source
                .get_cached_data()
                .with_context(|| format!("Data source '{}' failed", source.short_name()))?;
            data.insert(source.short_name().to_string(), value);
        }
        Ok(data)
    }

    fn assemble(&self, sources: &[Box<dyn DataSource>]) -> Result<Value> {
        let mut data = self.source_data(sources)?;
        data.insert(NAME_KEY.to_string(), Value::String(self.ctx.item().name.clone()));
        let dump = serde_json::to_string_pretty(&data)?;
        data.insert(DEBUG_KEY.to_string(), Value::String(dump));
        Ok(Value::Object(data))
    }

    /// The merged data tree: `name`, one key per active source, and `debug`.
    pub fn get_data(&self) -> Result<Value> {
        self.assemble(&self.sources())
    }

    /// Rendered body HTML, served from the content cache when possible.
    pub fn get_html(&self) -> Result<String> {
        let sources = self.sources();
        let cache_enabled = !self.ctx.is_sample();
        let key = if cache_enabled { aggregate_key(&sources)? } else { None };
        let area = content_area(self.ctx.type_id());
        let cache = &self.ctx.services().cache;

        if let Some(key) = &key {
            if let Some(Value::String(html)) = cache.get(&area, key) {
                debug!("Content cache hit for item {} ({key})", self.ctx.item_id());
                return Ok(html);
            }
            debug!("Content cache miss for item {} ({key})", self.ctx.item_id());
        } else {
            debug!("Item {} is uncacheable, rendering fresh", self.ctx.item_id());
        }

        let data = self.assemble(&sources)?;
        let html = self.render(TemplateKind::Body, &data)?;
        if let Some(key) = key {
            cache.set(&area, &key, Value::String(html.clone()));
        }
        Ok(html)
    }

    /// The computed display name: the title template rendered over source data.
    ///
    /// An empty title template yields the type's name.
    pub fn get_name(&self) -> Result<String> {
        if self.ctx.content_type().title_template.trim().is_empty() {
            return Ok(self.ctx.content_type().name.clone());
        }
        let data = Value::Object(self.source_data(&self.sources())?);
        Ok(self.render(TemplateKind::Title, &data)?.trim().to_string())
    }

    /// Dotted variable paths with sample values, for template authors.
    pub fn get_variable_list(&self) -> Result<Vec<(String, Value)>> {
        let sources = self.sources();
        let mut data = self.source_data(&sources)?;
        data.insert(NAME_KEY.to_string(), Value::String(self.ctx.item().name.clone()));
        Ok(flatten(&Value::Object(data)))
    }

    /// [`get_variable_list`](Self::get_variable_list) as an HTML table.
    pub fn get_data_as_table(&self) -> Result<String> {
        let mut html = String::from(
            "<table class=\"cms-variables\">\n<tr><th>Variable</th><th>Sample value</th></tr>\n",
        );
        for (path, value) in self.get_variable_list()? {
            let shown = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            html.push_str(&format!(
                "<tr><td>{{{{{}}}}}</td><td>{}</td></tr>\n",
                tera::escape_html(&path),
                tera::escape_html(&shown)
            ));
        }
        html.push_str("</table>");
        Ok(html)
    }

    fn render(&self, kind: TemplateKind, data: &Value) -> Result<String> {
        let content_type = self.ctx.content_type();
        let template = match kind {
            TemplateKind::Body => &content_type.body_template,
            TemplateKind::Title => &content_type.title_template,
        };
        let metadata = RenderingMetadata {
            content_type: content_type.name.clone(),
            template: kind,
            content_id: (!self.ctx.is_sample()).then(|| self.ctx.item_id()),
        };
        Ok(self.ctx.services().templates.render(template, data, &metadata)?)
    }
}

/// Aggregate key over `sources`; `None` as soon as one source withholds its key.
pub fn aggregate_key(sources: &[Box<dyn DataSource>]) -> Result<Option<String>> {
    let mut key = String::new();
    for source in sources {
        match source.get_full_cache_key()? {
            Some(fragment) => key.push_str(&fragment),
            None => {
                debug!("Data source '{}' vetoes caching", source.short_name());
                return Ok(None);
            }
        }
    }
    Ok(Some(key))
}
