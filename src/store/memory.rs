//! In-memory repository backed by a concurrent map.

use anyhow::Result;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use super::{Record, Repository};
use crate::core::CmsError;

/// A table held in memory.
///
/// Ids are allocated from a monotonically increasing counter starting at 1 and
/// are never reused, even after deletes.
pub struct MemoryTable<T: Record> {
    rows: DashMap<i64, T>,
    next_id: AtomicI64,
}

impl<T: Record> Default for MemoryTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> MemoryTable<T> {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Rebuild a table from previously persisted records, keeping their ids.
    pub fn from_records(records: impl IntoIterator<Item = T>) -> Self {
        let table = Self::new();
        let mut max_id = 0;
        for record in records {
            max_id = max_id.max(record.id());
            table.rows.insert(record.id(), record);
        }
        table.next_id.store(max_id + 1, Ordering::SeqCst);
        table
    }
}

impl<T: Record> Repository<T> for MemoryTable<T> {
    fn create(&self, mut record: T) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.set_id(id);
        self.rows.insert(id, record.clone());
        tracing::trace!(table = T::TABLE, id, "record created");
        Ok(record)
    }

    fn get(&self, id: i64) -> Result<Option<T>> {
        Ok(self.rows.get(&id).map(|r| r.value().clone()))
    }

    fn update(&self, record: &T) -> Result<()> {
        match self.rows.get_mut(&record.id()) {
            Some(mut existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(CmsError::RecordNotFound {
                table: T::TABLE.to_string(),
                id: record.id(),
            }
            .into()),
        }
    }

    fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.rows.remove(&id).is_some())
    }

    fn find(&self, filter: &dyn Fn(&T) -> bool) -> Result<Vec<T>> {
        let mut found: Vec<T> = self
            .rows
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|r| r.id());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, ContentType};

    #[test]
    fn test_create_assigns_increasing_ids() -> Result<()> {
        let table = MemoryTable::<ContentType>::new();
        let a = table.create(ContentType::new("A"))?;
        let b = table.create(ContentType::new("B"))?;
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);

        table.delete(b.id)?;
        let c = table.create(ContentType::new("C"))?;
        assert_eq!(c.id, 3, "ids are never reused");
        Ok(())
    }

    #[test]
    fn test_update_missing_record_fails() {
        let table = MemoryTable::<ContentItem>::new();
        let mut item = ContentItem::new(1, 1);
        item.id = 99;
        let err = table.update(&item).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CmsError>(),
            Some(CmsError::RecordNotFound { id: 99, .. })
        ));
    }

    #[test]
    fn test_find_is_ordered_and_filtered() -> Result<()> {
        let table = MemoryTable::<ContentItem>::new();
        for course in [5, 6, 5] {
            table.create(ContentItem::new(course, 1))?;
        }
        let found = table.find(&|c: &ContentItem| c.course_id == 5)?;
        assert_eq!(found.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(table.delete_where(&|c: &ContentItem| c.course_id == 5)?, 2);
        assert_eq!(table.all()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_from_records_continues_ids() -> Result<()> {
        let mut t = ContentType::new("Kept");
        t.id = 10;
        let table = MemoryTable::from_records(vec![t]);
        let next = table.create(ContentType::new("New"))?;
        assert_eq!(next.id, 11);
        Ok(())
    }
}
