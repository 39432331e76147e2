//! Records backing the user-authored list data source.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One column of a user list schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListColumn {
    pub shortname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl UserListColumn {
    pub fn new(shortname: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            shortname: shortname.into(),
            label: Some(label.into()),
        }
    }

    /// Label, falling back to the short name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.shortname)
    }
}

/// Column schema of one content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserListSchema {
    pub id: i64,
    pub type_id: i64,
    pub columns: Vec<UserListColumn>,
}

/// One row of list data on a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserListRow {
    pub id: i64,
    pub content_id: i64,
    pub sortorder: i64,
    /// Cell values keyed by column short name.
    pub data: BTreeMap<String, Value>,
}
