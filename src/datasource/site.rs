//! Site metadata: the site's names and base URL.

use anyhow::Result;
use serde_json::{Value, json};

use super::{CacheStrategy, DataSource, DataSourceContext};

/// Always-on source exposing `site.fullname`, `site.shortname` and `site.wwwroot`.
///
/// Its data is too cheap to cache, but it reports constant empty fragments
/// rather than withholding keys, so it never vetoes caching of the item.
pub struct SiteDataSource {
    ctx: DataSourceContext,
}

impl SiteDataSource {
    pub fn new(ctx: DataSourceContext) -> Self {
        Self {
            ctx,
        }
    }
}

impl DataSource for SiteDataSource {
    fn short_name(&self) -> &str {
        "site"
    }

    fn display_name(&self) -> String {
        "Site information".to_string()
    }

    fn context(&self) -> &DataSourceContext {
        &self.ctx
    }

    fn get_data(&self) -> Result<Value> {
        let site = &self.ctx.services().site;
        Ok(json!({
            "fullname": site.fullname,
            "shortname": site.shortname,
            "wwwroot": site.wwwroot,
        }))
    }

    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Null
    }

    fn is_optional(&self) -> bool {
        false
    }

    fn get_instance_cache_key(&self) -> Result<Option<String>> {
        Ok(Some(String::new()))
    }

    fn get_config_cache_key(&self) -> Result<Option<String>> {
        Ok(Some(String::new()))
    }

    fn get_full_cache_key(&self) -> Result<Option<String>> {
        Ok(Some(String::new()))
    }
}
