//! User-authored list: a table whose columns are defined per type and whose
//! rows are entered per item.
//!
//! The column schema lives in `cms_userlist_columns` (one record per type) and
//! rows in `cms_userlist`. Templates iterate `userlist` as a list of records
//! keyed by column shortname.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashSet};

use super::{
    CacheStrategy, DataSource, DataSourceContext, FormBuilder, FormData, FormField,
    FormFieldKind, FormFiles, FormSubmission, ValidationError,
};
use crate::backup::RestoreTask;
use crate::models::{ContentItem, UserListColumn, UserListRow, UserListSchema};
use crate::store::Repository;

pub const COLUMNS_FIELD: &str = "userlist_columns";
pub const ROWS_FIELD: &str = "userlist_rows";

/// Export form of the column schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub columns: Vec<UserListColumn>,
}

pub struct UserListDataSource {
    ctx: DataSourceContext,
}

impl UserListDataSource {
    pub fn new(ctx: DataSourceContext) -> Self {
        Self {
            ctx,
        }
    }

    fn schema(&self) -> Result<Option<UserListSchema>> {
        let type_id = self.ctx.type_id();
        let schemas = self
            .ctx
            .services()
            .store
            .userlist_schemas
            .find(&|s: &UserListSchema| s.type_id == type_id)?;
        Ok(schemas.into_iter().next())
    }

    pub fn columns(&self) -> Result<Vec<UserListColumn>> {
        Ok(self.schema()?.map(|s| s.columns).unwrap_or_default())
    }

    fn save_columns(&self, columns: Vec<UserListColumn>) -> Result<()> {
        let repo = &self.ctx.services().store.userlist_schemas;
        match self.schema()? {
            Some(mut schema) => {
                schema.columns = columns;
                repo.update(&schema)
            }
            None => {
                repo.create(UserListSchema {
                    id: 0,
                    type_id: self.ctx.type_id(),
                    columns,
                })?;
                Ok(())
            }
        }
    }

    /// Stored rows of the bound item, in sort order.
    pub fn rows(&self) -> Result<Vec<UserListRow>> {
        let content_id = self.ctx.item_id();
        let mut rows = self
            .ctx
            .services()
            .store
            .userlist_rows
            .find(&|r: &UserListRow| r.content_id == content_id)?;
        rows.sort_by_key(|r| (r.sortorder, r.id));
        Ok(rows)
    }

    fn replace_rows(&self, rows: Vec<BTreeMap<String, Value>>) -> Result<()> {
        let content_id = self.ctx.item_id();
        let repo = &self.ctx.services().store.userlist_rows;
        repo.delete_where(&|r: &UserListRow| r.content_id == content_id)?;
        for (index, data) in rows.into_iter().enumerate() {
            repo.create(UserListRow {
                id: 0,
                content_id,
                sortorder: index as i64,
                data,
            })?;
        }
        Ok(())
    }
}

fn is_valid_column_name(name: &str) -> bool {
    Regex::new(r"^[a-z][a-z0-9_]*$").is_ok_and(|re| re.is_match(name))
}

fn parse_columns(value: &Value) -> Result<Vec<UserListColumn>> {
    serde_json::from_value(value.clone()).context("Invalid user list columns")
}

fn parse_rows(value: &Value) -> Result<Vec<BTreeMap<String, Value>>> {
    serde_json::from_value(value.clone()).context("Invalid user list rows")
}

impl DataSource for UserListDataSource {
    fn short_name(&self) -> &str {
        "userlist"
    }

    fn display_name(&self) -> String {
        "User list".to_string()
    }

    fn context(&self) -> &DataSourceContext {
        &self.ctx
    }

    fn get_data(&self) -> Result<Value> {
        let columns = self.columns()?;
        if self.ctx.is_sample() {
            let row: Map<String, Value> = columns
                .iter()
                .map(|c| (c.shortname.clone(), json!(c.display_label())))
                .collect();
            return Ok(json!([row]));
        }
        let rows = self
            .rows()?
            .into_iter()
            .map(|row| {
                let record: Map<String, Value> = columns
                    .iter()
                    .map(|c| {
                        let value = row.data.get(&c.shortname).cloned().unwrap_or(json!(""));
                        (c.shortname.clone(), value)
                    })
                    .collect();
                Value::Object(record)
            })
            .collect();
        Ok(Value::Array(rows))
    }

    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Hash
    }

    fn config_form_definition(&self, form: &mut FormBuilder) -> Result<()> {
        form.header("userlist_header", "User list").add(FormField::new(
            COLUMNS_FIELD,
            "Columns",
            FormFieldKind::Repeat {
                columns: vec!["shortname".to_string(), "label".to_string()],
            },
        ));
        Ok(())
    }

    fn config_form_default_data(&self, data: &mut FormData) -> Result<()> {
        data.set(COLUMNS_FIELD, serde_json::to_value(self.columns()?)?);
        Ok(())
    }

    fn config_form_validation(&self, data: &FormData, _files: &FormFiles) -> Vec<ValidationError> {
        let Some(raw) = data.get(COLUMNS_FIELD) else {
            return Vec::new();
        };
        let columns = match parse_columns(raw) {
            Ok(columns) => columns,
            Err(e) => return vec![ValidationError::new(COLUMNS_FIELD, format!("{e:#}"))],
        };
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        for column in &columns {
            if !is_valid_column_name(&column.shortname) {
                errors.push(ValidationError::new(
                    COLUMNS_FIELD,
                    format!("Invalid column shortname '{}'", column.shortname),
                ));
            } else if !seen.insert(column.shortname.as_str()) {
                errors.push(ValidationError::new(
                    COLUMNS_FIELD,
                    format!("Duplicate column shortname '{}'", column.shortname),
                ));
            }
        }
        errors
    }

    fn instance_form_definition(&self, form: &mut FormBuilder) -> Result<()> {
        let columns = self.columns()?;
        if columns.is_empty() {
            return Ok(());
        }
        form.add(FormField::new(ROWS_FIELD, "List", FormFieldKind::Repeat {
            columns: columns.into_iter().map(|c| c.shortname).collect(),
        }));
        Ok(())
    }

    fn instance_form_default_data(&self, data: &mut FormData) -> Result<()> {
        if self.ctx.is_sample() {
            return Ok(());
        }
        let rows: Vec<Value> = self.rows()?.into_iter().map(|r| json!(r.data)).collect();
        data.set(ROWS_FIELD, rows);
        Ok(())
    }

    fn instance_form_validation(
        &self,
        data: &FormData,
        _files: &FormFiles,
    ) -> Vec<ValidationError> {
        let Some(raw) = data.get(ROWS_FIELD) else {
            return Vec::new();
        };
        let rows = match parse_rows(raw) {
            Ok(rows) => rows,
            Err(e) => return vec![ValidationError::new(ROWS_FIELD, format!("{e:#}"))],
        };
        let columns: HashSet<String> = match self.columns() {
            Ok(columns) => columns.into_iter().map(|c| c.shortname).collect(),
            Err(e) => return vec![ValidationError::new(ROWS_FIELD, format!("{e:#}"))],
        };
        rows.iter()
            .enumerate()
            .flat_map(|(index, row)| {
                row.keys()
                    .filter(|key| !columns.contains(*key))
                    .map(move |key| {
                        ValidationError::new(
                            ROWS_FIELD,
                            format!("Row {}: unknown column '{key}'", index + 1),
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn config_on_update(&self, submission: &FormSubmission) -> Result<()> {
        if let Some(raw) = submission.data.get(COLUMNS_FIELD) {
            self.save_columns(parse_columns(raw)?)?;
        }
        self.update_config_cache_key()
    }

    fn config_on_delete(&self) -> Result<()> {
        let type_id = self.ctx.type_id();
        let store = &self.ctx.services().store;
        let content_ids: HashSet<i64> = store
            .contents
            .find(&|c: &ContentItem| c.type_id == type_id)?
            .into_iter()
            .map(|c| c.id)
            .collect();
        let rows = store.userlist_rows.delete_where(&|r: &UserListRow| content_ids.contains(&r.content_id))?;
        let schemas =
            store.userlist_schemas.delete_where(&|s: &UserListSchema| s.type_id == type_id)?;
        tracing::debug!("Removed {schemas} user list schema(s) and {rows} row(s) of type {type_id}");
        Ok(())
    }

    fn instance_on_update(&self, submission: &FormSubmission) -> Result<()> {
        if let Some(raw) = submission.data.get(ROWS_FIELD) {
            if !self.ctx.is_sample() {
                self.replace_rows(parse_rows(raw)?)?;
            }
        }
        self.update_instance_cache_key()
    }

    fn instance_on_delete(&self) -> Result<()> {
        let content_id = self.ctx.item_id();
        self.ctx
            .services()
            .store
            .userlist_rows
            .delete_where(&|r: &UserListRow| r.content_id == content_id)?;
        Ok(())
    }

    fn config_export(&self) -> Result<Option<Value>> {
        let Some(schema) = self.schema()? else {
            return Ok(None);
        };
        Ok(Some(serde_json::to_value(SchemaDocument {
            columns: schema.columns,
        })?))
    }

    fn config_import(&self, document: &Value) -> Result<()> {
        let schema: SchemaDocument =
            serde_json::from_value(document.clone()).context("Invalid user list schema")?;
        self.save_columns(schema.columns)?;
        self.update_config_cache_key()
    }

    fn instance_backup(&self) -> Result<Option<Value>> {
        let rows: Vec<Value> = self.rows()?.into_iter().map(|r| json!(r.data)).collect();
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(Value::Array(rows)))
    }

    fn instance_restore(&self, section: &Value, task: &mut RestoreTask) -> Result<()> {
        self.replace_rows(parse_rows(section)?)?;
        task.defer_instance_key_refresh(self.short_name(), self.ctx.item_id());
        Ok(())
    }
}
