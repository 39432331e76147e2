//! Custom-field collaborator.
//!
//! Custom fields are defined per content type (one category per type) and hold
//! one value per content item. The engine only needs definitions, exported
//! values and deterministic sample values for previews.

use anyhow::Result;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Kinds of custom field the engine knows how to sample and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Checkbox,
    Date,
    Select,
}

/// One custom field definition attached to a content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub shortname: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Options for [`FieldKind::Select`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FieldDefinition {
    pub fn new(shortname: impl Into<String>, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            shortname: shortname.into(),
            name: name.into(),
            kind,
            options: Vec::new(),
        }
    }

    pub fn with_options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Value used when rendering a preview of a type.
    pub fn sample_value(&self) -> Value {
        match self.kind {
            FieldKind::Text => json!(format!("{} sample", self.name)),
            FieldKind::Textarea => json!(format!("<p>{} sample text</p>", self.name)),
            FieldKind::Number => json!(42),
            FieldKind::Checkbox => json!(true),
            FieldKind::Date => json!("2024-01-01"),
            FieldKind::Select => self.options.first().map_or(Value::Null, |o| json!(o)),
        }
    }

    /// Convert a stored raw value into its template-facing form.
    pub fn export_value(&self, raw: &Value) -> Value {
        match (self.kind, raw) {
            (FieldKind::Checkbox, Value::Bool(b)) => json!(if *b { "Yes" } else { "No" }),
            (FieldKind::Checkbox, Value::Null) => json!("No"),
            (FieldKind::Select, Value::Number(n)) => n
                .as_u64()
                .and_then(|i| self.options.get(i as usize))
                .map_or(Value::Null, |o| json!(o)),
            _ => raw.clone(),
        }
    }
}

/// Access to the host's custom-field subsystem.
pub trait CustomFieldHandler: Send + Sync {
    /// Field definitions of a content type, in display order.
    fn definitions(&self, type_id: i64) -> Result<Vec<FieldDefinition>>;

    /// Replace the field definitions of a content type.
    fn set_definitions(&self, type_id: i64, definitions: Vec<FieldDefinition>) -> Result<()>;

    /// Remove the field definitions of a content type.
    ///
    /// Item values are keyed by item, not type; they go through
    /// [`delete_values`](Self::delete_values) when each item is deleted.
    fn delete_definitions(&self, type_id: i64) -> Result<()>;

    /// Raw stored values of one content item, keyed by field shortname.
    fn values(&self, content_id: i64) -> Result<BTreeMap<String, Value>>;

    fn save_values(&self, content_id: i64, values: BTreeMap<String, Value>) -> Result<()>;

    fn delete_values(&self, content_id: i64) -> Result<()>;
}

/// Serialisable state of [`MemoryFieldHandler`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldsState {
    #[serde(default)]
    pub definitions: BTreeMap<i64, Vec<FieldDefinition>>,
    #[serde(default)]
    pub values: BTreeMap<i64, BTreeMap<String, Value>>,
}

/// In-process custom-field store.
///
/// Counts value reads so tests can observe whether data was recomputed.
#[derive(Debug, Default)]
pub struct MemoryFieldHandler {
    definitions: DashMap<i64, Vec<FieldDefinition>>,
    values: DashMap<i64, BTreeMap<String, Value>>,
    value_reads: Arc<AtomicUsize>,
}

impl MemoryFieldHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: FieldsState) -> Self {
        let handler = Self::new();
        for (type_id, defs) in state.definitions {
            handler.definitions.insert(type_id, defs);
        }
        for (content_id, values) in state.values {
            handler.values.insert(content_id, values);
        }
        handler
    }

    pub fn state(&self) -> FieldsState {
        FieldsState {
            definitions: self.definitions.iter().map(|e| (*e.key(), e.value().clone())).collect(),
            values: self.values.iter().map(|e| (*e.key(), e.value().clone())).collect(),
        }
    }

    /// Number of [`CustomFieldHandler::values`] calls served so far.
    pub fn value_reads(&self) -> usize {
        self.value_reads.load(Ordering::Relaxed)
    }
}

impl CustomFieldHandler for MemoryFieldHandler {
    fn definitions(&self, type_id: i64) -> Result<Vec<FieldDefinition>> {
        Ok(self.definitions.get(&type_id).map(|d| d.clone()).unwrap_or_default())
    }

    fn set_definitions(&self, type_id: i64, definitions: Vec<FieldDefinition>) -> Result<()> {
        if definitions.is_empty() {
            self.definitions.remove(&type_id);
        } else {
            self.definitions.insert(type_id, definitions);
        }
        Ok(())
    }

    fn delete_definitions(&self, type_id: i64) -> Result<()> {
        self.definitions.remove(&type_id);
        Ok(())
    }

    fn values(&self, content_id: i64) -> Result<BTreeMap<String, Value>> {
        self.value_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.values.get(&content_id).map(|v| v.clone()).unwrap_or_default())
    }

    fn save_values(&self, content_id: i64, values: BTreeMap<String, Value>) -> Result<()> {
        self.values.entry(content_id).or_default().extend(values);
        Ok(())
    }

    fn delete_values(&self, content_id: i64) -> Result<()> {
        self.values.remove(&content_id);
        Ok(())
    }
}
