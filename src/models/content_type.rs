//! Content types: the shared template and data source configuration behind many
//! content items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::CustomData;

/// Ordered set of enabled data source short names.
///
/// Persisted as a comma-joined string (`"fields,roles"`). Order is kept for
/// display but carries no meaning; duplicates and blanks are dropped on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasourceSet(Vec<String>);

impl DatasourceSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-joined list, trimming whitespace.
    pub fn parse(joined: &str) -> Self {
        joined.split(',').collect()
    }

    pub fn contains(&self, short_name: &str) -> bool {
        self.0.iter().any(|s| s == short_name)
    }

    /// Insert a short name; returns `false` if it was already present or blank.
    pub fn insert(&mut self, short_name: impl Into<String>) -> bool {
        let short_name = short_name.into().trim().to_string();
        if short_name.is_empty() || self.contains(&short_name) {
            return false;
        }
        self.0.push(short_name);
        true
    }

    pub fn remove(&mut self, short_name: &str) {
        self.0.retain(|s| s != short_name);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined form used for persistence.
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl<S: AsRef<str>> FromIterator<S> for DatasourceSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

impl Serialize for DatasourceSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.joined())
    }
}

impl<'de> Deserialize<'de> for DatasourceSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let joined = String::deserialize(deserializer)?;
        Ok(Self::parse(&joined))
    }
}

/// A content type record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentType {
    pub id: i64,
    pub name: String,
    /// Stable identifier used to match types across sites (restore, import).
    #[serde(default)]
    pub idnumber: String,
    #[serde(default)]
    pub description: String,
    /// Template producing the computed display name of each content item.
    #[serde(default)]
    pub title_template: String,
    /// Template producing the rendered body.
    #[serde(default)]
    pub body_template: String,
    #[serde(default)]
    pub datasources: DatasourceSet,
    #[serde(default)]
    pub custom_data: CustomData,
    #[serde(default)]
    pub icon: Option<String>,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
}

impl ContentType {
    /// New, not yet persisted type (id 0).
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            idnumber: String::new(),
            description: String::new(),
            title_template: String::new(),
            body_template: String::new(),
            datasources: DatasourceSet::new(),
            custom_data: CustomData::new(),
            icon: None,
            time_created: now,
            time_modified: now,
        }
    }

    #[must_use]
    pub fn with_body(mut self, template: impl Into<String>) -> Self {
        self.body_template = template.into();
        self
    }

    #[must_use]
    pub fn with_title(mut self, template: impl Into<String>) -> Self {
        self.title_template = template.into();
        self
    }

    #[must_use]
    pub fn with_datasources<S: AsRef<str>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.datasources = names.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_idnumber(mut self, idnumber: impl Into<String>) -> Self {
        self.idnumber = idnumber.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasource_set_parse_dedups() {
        let set = DatasourceSet::parse(" fields, roles,,fields ");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["fields", "roles"]);
        assert_eq!(set.joined(), "fields,roles");
    }

    #[test]
    fn test_datasource_set_serializes_joined() {
        let set: DatasourceSet = ["images", "userlist"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#""images,userlist""#);
        let back: DatasourceSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_empty_set_round_trips() {
        let back: DatasourceSet = serde_json::from_str(r#""""#).unwrap();
        assert!(back.is_empty());
    }
}
