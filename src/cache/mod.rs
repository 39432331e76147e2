//! Content cache collaborator.
//!
//! The cache is a shared key/value store partitioned into named areas:
//!
//! - `content_<type_id>` - rendered HTML, keyed by the aggregate cache key of an item
//! - `ds_<shortname>` - one data source's `get_data()` tree, keyed by its full cache key
//!
//! Population is best-effort. A lost write only costs a recomputation later, so
//! implementations never report failures; writers use "set if absent" where the
//! value is deterministic for the key.

pub mod memory;

use serde_json::Value;

pub use memory::{MemoryContentCache, NoopContentCache};

/// Area holding rendered HTML for items of one type.
pub fn content_area(type_id: i64) -> String {
    format!("content_{type_id}")
}

/// Area holding a data source's computed data.
pub fn datasource_area(short_name: &str) -> String {
    format!("ds_{short_name}")
}

/// Shared key/value cache.
pub trait ContentCache: Send + Sync {
    fn get(&self, area: &str, key: &str) -> Option<Value>;

    fn set(&self, area: &str, key: &str, value: Value);

    fn delete(&self, area: &str, key: &str);

    /// Drop every entry of an area.
    fn purge_area(&self, area: &str);

    fn has(&self, area: &str, key: &str) -> bool {
        self.get(area, key).is_some()
    }

    /// Store `value` only when no entry exists yet.
    fn set_if_absent(&self, area: &str, key: &str, value: Value) {
        if !self.has(area, key) {
            self.set(area, key, value);
        }
    }
}
