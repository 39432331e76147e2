//! Content items: one authored instance rendered through its type's templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentType, CustomData};

/// A content item record.
///
/// `name` is computed from the type's title template and never authored
/// directly. `is_sample` marks synthetic preview items built while a type is
/// being configured; those are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    /// Owning course.
    pub course_id: i64,
    pub type_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub custom_data: CustomData,
    #[serde(skip)]
    pub is_sample: bool,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
}

impl ContentItem {
    /// New, not yet persisted item (id 0).
    pub fn new(course_id: i64, type_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            course_id,
            type_id,
            name: String::new(),
            custom_data: CustomData::new(),
            is_sample: false,
            time_created: now,
            time_modified: now,
        }
    }

    /// Synthetic preview item for a content type.
    pub fn sample(content_type: &ContentType) -> Self {
        let mut item = Self::new(0, content_type.id);
        item.name = content_type.name.clone();
        item.is_sample = true;
        item
    }

    /// Whether the item exists in the store.
    pub fn is_persisted(&self) -> bool {
        !self.is_sample && self.id > 0
    }
}
