//! Persistence collaborator.
//!
//! The engine never talks to a database directly. Every entity it persists is a
//! [`Record`] stored in a [`Repository`]; the [`Store`] bundles one repository
//! per entity. [`MemoryTable`] is the in-process implementation used by the CLI
//! (backed by a JSON snapshot) and by tests.
//!
//! Failures reported by a repository are [`CmsError::Persistence`] or
//! [`CmsError::RecordNotFound`]; callers propagate them unchanged.

pub mod memory;

use anyhow::Result;
use std::sync::Arc;

use crate::core::CmsError;
use crate::models::{ContentItem, ContentType, UserListRow, UserListSchema};

pub use memory::MemoryTable;

/// A persisted entity with a numeric primary key.
pub trait Record: Clone + Send + Sync + 'static {
    /// Table name used in diagnostics and snapshots.
    const TABLE: &'static str;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);
}

/// CRUD access to one table.
pub trait Repository<T: Record>: Send + Sync {
    /// Insert a record, assigning a fresh id. Returns the stored record.
    fn create(&self, record: T) -> Result<T>;

    fn get(&self, id: i64) -> Result<Option<T>>;

    /// Replace an existing record. Fails with [`CmsError::RecordNotFound`] if absent.
    fn update(&self, record: &T) -> Result<()>;

    /// Delete by id; returns whether a record was removed.
    fn delete(&self, id: i64) -> Result<bool>;

    /// All records matching `filter`, ordered by id.
    fn find(&self, filter: &dyn Fn(&T) -> bool) -> Result<Vec<T>>;

    /// Fetch a record that must exist.
    fn require(&self, id: i64) -> Result<T> {
        self.get(id)?.ok_or_else(|| {
            CmsError::RecordNotFound {
                table: T::TABLE.to_string(),
                id,
            }
            .into()
        })
    }

    fn all(&self) -> Result<Vec<T>> {
        self.find(&|_| true)
    }

    fn count(&self, filter: &dyn Fn(&T) -> bool) -> Result<usize> {
        Ok(self.find(filter)?.len())
    }

    /// Delete every record matching `filter`; returns how many were removed.
    fn delete_where(&self, filter: &dyn Fn(&T) -> bool) -> Result<usize> {
        let mut removed = 0;
        for record in self.find(filter)? {
            if self.delete(record.id())? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl Record for ContentType {
    const TABLE: &'static str = "cms_types";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl Record for ContentItem {
    const TABLE: &'static str = "cms";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl Record for UserListSchema {
    const TABLE: &'static str = "cms_userlist_columns";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl Record for UserListRow {
    const TABLE: &'static str = "cms_userlist";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// One repository per persisted entity.
#[derive(Clone)]
pub struct Store {
    pub types: Arc<dyn Repository<ContentType>>,
    pub contents: Arc<dyn Repository<ContentItem>>,
    pub userlist_schemas: Arc<dyn Repository<UserListSchema>>,
    pub userlist_rows: Arc<dyn Repository<UserListRow>>,
}

impl Store {
    /// Store backed entirely by empty [`MemoryTable`]s.
    pub fn in_memory() -> Self {
        Self {
            types: Arc::new(MemoryTable::<ContentType>::new()),
            contents: Arc::new(MemoryTable::<ContentItem>::new()),
            userlist_schemas: Arc::new(MemoryTable::<UserListSchema>::new()),
            userlist_rows: Arc::new(MemoryTable::<UserListRow>::new()),
        }
    }

    pub fn get_type(&self, id: i64) -> Result<ContentType> {
        self.types.get(id)?.ok_or_else(|| {
            CmsError::ContentTypeNotFound {
                id,
            }
            .into()
        })
    }

    pub fn get_content(&self, id: i64) -> Result<ContentItem> {
        self.contents.get(id)?.ok_or_else(|| {
            CmsError::ContentNotFound {
                id,
            }
            .into()
        })
    }

    /// All content items of one type.
    pub fn contents_of_type(&self, type_id: i64) -> Result<Vec<ContentItem>> {
        self.contents.find(&|c: &ContentItem| c.type_id == type_id)
    }
}
