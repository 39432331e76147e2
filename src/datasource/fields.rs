//! Custom fields: per-type field definitions with per-item values.
//!
//! Data comes from the custom-field collaborator. Templates see
//! `fields.<shortname>` holding the exported value, or a deterministic sample
//! value when the item is a preview. Instance forms carry one
//! `customfield_<shortname>` input per field.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

use super::{
    CacheStrategy, DataSource, DataSourceContext, FormBuilder, FormData, FormField,
    FormFieldKind, FormFiles, FormSubmission, ValidationError,
};
use crate::backup::RestoreTask;
use crate::services::{FieldDefinition, FieldKind};

/// Config form key holding the type's field definitions as a JSON array.
pub const DEFINITIONS_FIELD: &str = "fields_definitions";

/// Instance form key of one custom field.
pub fn instance_field_name(shortname: &str) -> String {
    format!("customfield_{shortname}")
}

pub struct FieldsDataSource {
    ctx: DataSourceContext,
}

impl FieldsDataSource {
    pub fn new(ctx: DataSourceContext) -> Self {
        Self {
            ctx,
        }
    }

    fn definitions(&self) -> Result<Vec<FieldDefinition>> {
        self.ctx.services().fields.definitions(self.ctx.type_id())
    }

    /// Raw field values for search indexing, independent of `get_data()`.
    ///
    /// Returns `(shortname, text)` pairs for every field holding a value.
    pub fn search_content(&self) -> Result<Vec<(String, String)>> {
        if self.ctx.is_sample() {
            return Ok(Vec::new());
        }
        let values = self.ctx.services().fields.values(self.ctx.item_id())?;
        Ok(self
            .definitions()?
            .into_iter()
            .filter_map(|def| {
                let text = match values.get(&def.shortname)? {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((def.shortname, text))
            })
            .collect())
    }
}

fn parse_definitions(value: &Value) -> Result<Vec<FieldDefinition>> {
    let value = match value {
        Value::String(s) => serde_json::from_str(s).context("Field definitions are not valid JSON")?,
        other => other.clone(),
    };
    serde_json::from_value(value).context("Invalid field definitions")
}

impl DataSource for FieldsDataSource {
    fn short_name(&self) -> &str {
        "fields"
    }

    fn display_name(&self) -> String {
        "Custom fields".to_string()
    }

    fn context(&self) -> &DataSourceContext {
        &self.ctx
    }

    fn get_data(&self) -> Result<Value> {
        let definitions = self.definitions()?;
        let mut data = Map::new();
        if self.ctx.is_sample() {
            for def in &definitions {
                data.insert(def.shortname.clone(), def.sample_value());
            }
        } else {
            let values = self.ctx.services().fields.values(self.ctx.item_id())?;
            for def in &definitions {
                let raw = values.get(&def.shortname).cloned().unwrap_or(Value::Null);
                data.insert(def.shortname.clone(), def.export_value(&raw));
            }
        }
        Ok(Value::Object(data))
    }

    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Hash
    }

    fn config_form_definition(&self, form: &mut FormBuilder) -> Result<()> {
        form.header("fields_header", "Custom fields").add(
            FormField::new(DEFINITIONS_FIELD, "Field definitions", FormFieldKind::Textarea)
                .with_help("JSON list of {shortname, name, type, options}"),
        );
        Ok(())
    }

    fn config_form_default_data(&self, data: &mut FormData) -> Result<()> {
        data.set(DEFINITIONS_FIELD, serde_json::to_value(self.definitions()?)?);
        Ok(())
    }

    fn config_form_validation(&self, data: &FormData, _files: &FormFiles) -> Vec<ValidationError> {
        let Some(raw) = data.get(DEFINITIONS_FIELD) else {
            return Vec::new();
        };
        let definitions = match parse_definitions(raw) {
            Ok(defs) => defs,
            Err(e) => return vec![ValidationError::new(DEFINITIONS_FIELD, format!("{e:#}"))],
        };
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        for def in &definitions {
            if def.shortname.trim().is_empty() {
                errors.push(ValidationError::new(DEFINITIONS_FIELD, "Field shortname is required"));
            } else if !seen.insert(def.shortname.as_str()) {
                errors.push(ValidationError::new(
                    DEFINITIONS_FIELD,
                    format!("Duplicate field shortname '{}'", def.shortname),
                ));
            }
            if def.kind == FieldKind::Select && def.options.is_empty() {
                errors.push(ValidationError::new(
                    DEFINITIONS_FIELD,
                    format!("Select field '{}' needs at least one option", def.shortname),
                ));
            }
        }
        errors
    }

    fn instance_form_definition(&self, form: &mut FormBuilder) -> Result<()> {
        for def in self.definitions()? {
            let kind = match def.kind {
                FieldKind::Text => FormFieldKind::Text,
                FieldKind::Textarea => FormFieldKind::Textarea,
                FieldKind::Number => FormFieldKind::Number,
                FieldKind::Checkbox => FormFieldKind::Checkbox,
                FieldKind::Date => FormFieldKind::Date,
                FieldKind::Select => FormFieldKind::Select {
                    options: def
                        .options
                        .iter()
                        .enumerate()
                        .map(|(i, o)| (i.to_string(), o.clone()))
                        .collect(),
                },
            };
            form.add(FormField::new(instance_field_name(&def.shortname), def.name.clone(), kind));
        }
        Ok(())
    }

    fn instance_form_default_data(&self, data: &mut FormData) -> Result<()> {
        if self.ctx.is_sample() {
            return Ok(());
        }
        let values = self.ctx.services().fields.values(self.ctx.item_id())?;
        for (shortname, value) in values {
            data.set(instance_field_name(&shortname), value);
        }
        Ok(())
    }

    fn instance_form_validation(
        &self,
        data: &FormData,
        _files: &FormFiles,
    ) -> Vec<ValidationError> {
        let Ok(definitions) = self.definitions() else {
            return Vec::new();
        };
        definitions
            .iter()
            .filter(|def| def.kind == FieldKind::Number)
            .filter_map(|def| {
                let name = instance_field_name(&def.shortname);
                match data.get(&name)? {
                    Value::Number(_) | Value::Null => None,
                    Value::String(s) if s.is_empty() || s.parse::<f64>().is_ok() => None,
                    _ => Some(ValidationError::new(name, "Value must be a number")),
                }
            })
            .collect()
    }

    fn config_on_update(&self, submission: &FormSubmission) -> Result<()> {
        if let Some(raw) = submission.data.get(DEFINITIONS_FIELD) {
            let definitions = parse_definitions(raw)?;
            self.ctx.services().fields.set_definitions(self.ctx.type_id(), definitions)?;
        }
        self.update_config_cache_key()
    }

    fn config_on_delete(&self) -> Result<()> {
        self.ctx.services().fields.delete_definitions(self.ctx.type_id())
    }

    fn instance_on_update(&self, submission: &FormSubmission) -> Result<()> {
        let mut values = BTreeMap::new();
        for def in self.definitions()? {
            if let Some(value) = submission.data.get(&instance_field_name(&def.shortname)) {
                values.insert(def.shortname, value.clone());
            }
        }
        if !values.is_empty() && !self.ctx.is_sample() {
            self.ctx.services().fields.save_values(self.ctx.item_id(), values)?;
        }
        self.update_instance_cache_key()
    }

    fn instance_on_delete(&self) -> Result<()> {
        self.ctx.services().fields.delete_values(self.ctx.item_id())
    }

    fn config_export(&self) -> Result<Option<Value>> {
        let definitions = self.definitions()?;
        if definitions.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_value(definitions)?))
    }

    fn config_import(&self, document: &Value) -> Result<()> {
        let definitions = parse_definitions(document)?;
        self.ctx.services().fields.set_definitions(self.ctx.type_id(), definitions)?;
        self.update_config_cache_key()
    }

    fn instance_backup(&self) -> Result<Option<Value>> {
        let values = self.ctx.services().fields.values(self.ctx.item_id())?;
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_value(values)?))
    }

    fn instance_restore(&self, section: &Value, task: &mut RestoreTask) -> Result<()> {
        let values: BTreeMap<String, Value> =
            serde_json::from_value(section.clone()).context("Invalid custom field values")?;
        self.ctx.services().fields.save_values(self.ctx.item_id(), values)?;
        task.defer_instance_key_refresh(self.short_name(), self.ctx.item_id());
        Ok(())
    }
}
