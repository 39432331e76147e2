//! Cache-key strategies.
//!
//! A data source picks exactly one strategy:
//!
//! - [`CacheStrategy::Hash`] content-addresses the source's data. Items with
//!   identical data share one cache entry. The hash is stored under
//!   `<shortname>_instancehash` on the item and `<shortname>_confighash` on the type.
//! - [`CacheStrategy::Revision`] keeps integer counters instead
//!   (`<shortname>_instancerev`, `<shortname>_configrev`), giving keys unique to
//!   one item (`"{item_id}o{rev}"`) and one type (`"{type_id}c{rev}"`).
//! - [`CacheStrategy::Null`] withholds every key, which vetoes caching of the
//!   whole rendered item.
//!
//! A stored hash that is missing when a key is read is repaired in place and
//! logged; it never fails the render.

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::DataSource;
use crate::cache::datasource_area;

/// How a data source derives its cache-key fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    Hash,
    Revision,
    Null,
}

/// SHA-256 of the compact JSON serialisation of `value`, hex encoded.
pub fn hash_value(value: &Value) -> Result<String> {
    let serialized = serde_json::to_string(value).context("Failed to serialize data for hashing")?;
    Ok(hex::encode(Sha256::digest(serialized.as_bytes())))
}

pub(crate) fn instance_hash_key(short_name: &str) -> String {
    format!("{short_name}_instancehash")
}

pub(crate) fn config_hash_key(short_name: &str) -> String {
    format!("{short_name}_confighash")
}

pub(crate) fn instance_rev_key(short_name: &str) -> String {
    format!("{short_name}_instancerev")
}

pub(crate) fn config_rev_key(short_name: &str) -> String {
    format!("{short_name}_configrev")
}

impl CacheStrategy {
    pub fn instance_cache_key<S: DataSource + ?Sized>(self, source: &S) -> Result<Option<String>> {
        let ctx = source.context();
        match self {
            Self::Null => Ok(None),
            Self::Hash => {
                if ctx.is_sample() {
                    return hash_value(&source.get_data()?).map(Some);
                }
                let key = instance_hash_key(source.short_name());
                let stored = ctx.item().custom_data.get_str(&key).map(str::to_string);
                if let Some(hash) = stored {
                    return Ok(Some(hash));
                }
                warn!(
                    "Missing '{key}' on content item {}; recomputing instance hash",
                    ctx.item_id()
                );
                self.update_instance_cache_key(source)?;
                Ok(ctx.item().custom_data.get_str(&key).map(str::to_string))
            }
            Self::Revision => {
                let key = instance_rev_key(source.short_name());
                let item = ctx.item();
                let rev = item.custom_data.get_i64(&key).unwrap_or(0);
                Ok(Some(format!("{}o{rev}", item.id)))
            }
        }
    }

    pub fn config_cache_key<S: DataSource + ?Sized>(self, source: &S) -> Result<Option<String>> {
        let ctx = source.context();
        match self {
            Self::Null => Ok(None),
            Self::Hash => {
                let key = config_hash_key(source.short_name());
                let stored = ctx.content_type().custom_data.get_str(&key).map(str::to_string);
                if let Some(hash) = stored {
                    return Ok(Some(hash));
                }
                if ctx.type_id() > 0 {
                    warn!("Missing '{key}' on content type {}; recomputing config hash", ctx.type_id());
                }
                self.update_config_cache_key(source)?;
                Ok(ctx.content_type().custom_data.get_str(&key).map(str::to_string))
            }
            Self::Revision => {
                let key = config_rev_key(source.short_name());
                let content_type = ctx.content_type();
                let rev = content_type.custom_data.get_i64(&key).unwrap_or(0);
                Ok(Some(format!("{}c{rev}", content_type.id)))
            }
        }
    }

    /// Refresh the instance fragment after the item's data changed.
    ///
    /// The hash strategy also warms the source's data cache for the new key.
    pub fn update_instance_cache_key<S: DataSource + ?Sized>(self, source: &S) -> Result<()> {
        let ctx = source.context();
        match self {
            Self::Null => Ok(()),
            Self::Hash => {
                let data = source.get_data()?;
                let hash = hash_value(&data)?;
                let key = instance_hash_key(source.short_name());
                debug!("Instance hash for '{}' on item {}: {hash}", source.short_name(), ctx.item_id());
                ctx.update_item(|item| item.custom_data.set(key, hash))?;

                if !ctx.is_sample() {
                    if let Some(full_key) = source.get_full_cache_key()? {
                        ctx.services().cache.set_if_absent(
                            &datasource_area(source.short_name()),
                            &full_key,
                            data,
                        );
                    }
                }
                Ok(())
            }
            Self::Revision => {
                let key = instance_rev_key(source.short_name());
                ctx.update_item(|item| {
                    let rev = item.custom_data.get_i64(&key).unwrap_or(0) + 1;
                    item.custom_data.set(key, rev);
                })
            }
        }
    }

    /// Refresh the config fragment after the type's configuration changed.
    pub fn update_config_cache_key<S: DataSource + ?Sized>(self, source: &S) -> Result<()> {
        let ctx = source.context();
        match self {
            Self::Null => Ok(()),
            Self::Hash => {
                let hash = hash_value(&source.config_hash_source()?)?;
                let key = config_hash_key(source.short_name());
                ctx.update_type(|content_type| content_type.custom_data.set(key, hash))
            }
            Self::Revision => {
                let key = config_rev_key(source.short_name());
                ctx.update_type(|content_type| {
                    let rev = content_type.custom_data.get_i64(&key).unwrap_or(0) + 1;
                    content_type.custom_data.set(key, rev);
                })
            }
        }
    }
}
