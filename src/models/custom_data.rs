//! Free-form key/value blob attached to content items and content types.
//!
//! Data sources stash private state here: cache-key markers (hashes, revision
//! counters) and type-level configuration such as the role list. Keys are
//! namespaced by the owning data source's short name (`roles_list`,
//! `fields_instancehash`, ...). A `BTreeMap` keeps serialisation deterministic.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomData(BTreeMap<String, Value>);

impl CustomData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value, `None` when absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Integer value, `None` when absent or not an integer.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// Typed value, `None` when absent or of the wrong shape.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Remove every key owned by a data source (`<short_name>_*`).
    pub fn remove_prefixed(&mut self, short_name: &str) {
        let prefix = format!("{short_name}_");
        self.0.retain(|key, _| !key.starts_with(&prefix));
    }
}
