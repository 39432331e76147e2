//! File-storage collaborator.
//!
//! Files are scoped by `(context, component, area, item id)`, the same tuple the
//! host uses to build public `pluginfile.php` URLs.

use anyhow::Result;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Scope of a group of files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileArea {
    pub context_id: i64,
    pub component: String,
    pub area: String,
    pub item_id: i64,
}

impl FileArea {
    pub fn new(
        context_id: i64,
        component: impl Into<String>,
        area: impl Into<String>,
        item_id: i64,
    ) -> Self {
        Self {
            context_id,
            component: component.into(),
            area: area.into(),
            item_id,
        }
    }

    /// Public URL of a file in this area.
    pub fn url(&self, wwwroot: &str, filename: &str) -> String {
        format!(
            "{}/pluginfile.php/{}/{}/{}/{}/{}",
            wwwroot.trim_end_matches('/'),
            self.context_id,
            self.component,
            self.area,
            self.item_id,
            filename
        )
    }
}

/// A stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub filename: String,
    /// SHA-256 of the content, hex encoded.
    pub contenthash: String,
    #[serde(with = "hex_bytes")]
    pub content: Vec<u8>,
}

impl StoredFile {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        let contenthash = hex::encode(Sha256::digest(&content));
        Self {
            filename: filename.into(),
            contenthash,
            content,
        }
    }
}

/// Serde helper storing bytes as a hex string.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// Storage for uploaded files.
pub trait FileStorage: Send + Sync {
    /// Files of an area, ordered by filename.
    fn list(&self, area: &FileArea) -> Result<Vec<StoredFile>>;

    /// Store a file, replacing one with the same name.
    fn put(&self, area: &FileArea, file: StoredFile) -> Result<()>;

    fn delete(&self, area: &FileArea, filename: &str) -> Result<bool>;

    /// Delete every file of an area; returns how many were removed.
    fn delete_area(&self, area: &FileArea) -> Result<usize>;
}

/// In-process file storage.
#[derive(Debug, Default)]
pub struct MemoryFileStorage {
    areas: DashMap<FileArea, Vec<StoredFile>>,
}

/// A file together with its area, as kept in snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub area: FileArea,
    pub file: StoredFile,
}

impl MemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = FileEntry>) -> Result<Self> {
        let storage = Self::new();
        for entry in entries {
            storage.put(&entry.area, entry.file)?;
        }
        Ok(storage)
    }

    pub fn entries(&self) -> Vec<FileEntry> {
        let mut entries: Vec<FileEntry> = self
            .areas
            .iter()
            .flat_map(|e| {
                let area = e.key().clone();
                e.value()
                    .iter()
                    .map(|file| FileEntry {
                        area: area.clone(),
                        file: file.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        entries.sort_by(|a, b| (&a.area, &a.file.filename).cmp(&(&b.area, &b.file.filename)));
        entries
    }
}

impl FileStorage for MemoryFileStorage {
    fn list(&self, area: &FileArea) -> Result<Vec<StoredFile>> {
        Ok(self.areas.get(area).map(|f| f.clone()).unwrap_or_default())
    }

    fn put(&self, area: &FileArea, file: StoredFile) -> Result<()> {
        let mut files = self.areas.entry(area.clone()).or_default();
        files.retain(|f| f.filename != file.filename);
        files.push(file);
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(())
    }

    fn delete(&self, area: &FileArea, filename: &str) -> Result<bool> {
        let Some(mut files) = self.areas.get_mut(area) else {
            return Ok(false);
        };
        let before = files.len();
        files.retain(|f| f.filename != filename);
        Ok(files.len() != before)
    }

    fn delete_area(&self, area: &FileArea) -> Result<usize> {
        Ok(self.areas.remove(area).map_or(0, |(_, files)| files.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area() -> FileArea {
        FileArea::new(1, "mod_cms", "cms_type_images", 4)
    }

    #[test]
    fn test_put_replaces_and_sorts() -> Result<()> {
        let storage = MemoryFileStorage::new();
        storage.put(&area(), StoredFile::new("b.png", vec![1]))?;
        storage.put(&area(), StoredFile::new("a.png", vec![2]))?;
        storage.put(&area(), StoredFile::new("b.png", vec![3]))?;

        let files = storage.list(&area())?;
        let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
        assert_eq!(files[1].content, vec![3]);
        Ok(())
    }

    #[test]
    fn test_delete_area() -> Result<()> {
        let storage = MemoryFileStorage::new();
        storage.put(&area(), StoredFile::new("a.png", vec![2]))?;
        assert_eq!(storage.delete_area(&area())?, 1);
        assert!(storage.list(&area())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_url_layout() {
        assert_eq!(
            area().url("https://x.org/", "logo.png"),
            "https://x.org/pluginfile.php/1/mod_cms/cms_type_images/4/logo.png"
        );
    }

    #[test]
    fn test_content_serialises_as_hex() -> Result<()> {
        let file = StoredFile::new("a.txt", b"hi".to_vec());
        let json = serde_json::to_value(&file)?;
        assert_eq!(json["content"], "6869");
        let back: StoredFile = serde_json::from_value(json)?;
        assert_eq!(back, file);
        Ok(())
    }
}
