//! Portable YAML documents for content types.
//!
//! An export carries the type's own fields plus the config export of every
//! enabled data source. Importing creates a new type from such a document; the
//! round trip is lossless for every field the document declares:
//!
//! ```yaml
//! version: 1
//! name: Staff list
//! idnumber: staff
//! title_template: "{{ site.shortname }} staff"
//! body_template: "{% for u in roles.teacher %}{{ u.fullname }}{% endfor %}"
//! datasources:
//!   - roles
//! config:
//!   roles:
//!     roles_list: [teacher]
//!     roles_duplicates: all
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

use crate::core::CmsError;
use crate::datasource::DataSourceContext;
use crate::models::{ContentType, DatasourceSet};
use crate::services::Services;
use crate::store::Repository;

/// The exchanged form of one content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub idnumber: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub title_template: String,
    #[serde(default)]
    pub body_template: String,
    #[serde(default)]
    pub datasources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Config export per data source short name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Value>,
}

const fn default_version() -> u32 {
    TypeDocument::CURRENT_VERSION
}

impl TypeDocument {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self, CmsError> {
        let document: Self = serde_yaml::from_str(content).map_err(|e| CmsError::InvalidImport {
            reason: e.to_string(),
        })?;
        if document.version > Self::CURRENT_VERSION {
            return Err(CmsError::InvalidImport {
                reason: format!(
                    "document version {} is newer than supported version {}",
                    document.version,
                    Self::CURRENT_VERSION
                ),
            });
        }
        if document.name.trim().is_empty() {
            return Err(CmsError::InvalidImport {
                reason: "content type name is empty".to_string(),
            });
        }
        Ok(document)
    }
}

/// Build the exchange document of a stored type.
pub fn export_document(services: &Services, type_id: i64) -> Result<TypeDocument> {
    let content_type = services.store.get_type(type_id)?;
    let ctx = DataSourceContext::for_type(services.clone(), content_type.clone());
    let mut config = BTreeMap::new();
    for source in services.registry.list_enabled(&ctx, true) {
        if let Some(section) = source.config_export()? {
            config.insert(source.short_name().to_string(), section);
        }
    }
    Ok(TypeDocument {
        version: TypeDocument::CURRENT_VERSION,
        name: content_type.name,
        idnumber: content_type.idnumber,
        description: content_type.description,
        title_template: content_type.title_template,
        body_template: content_type.body_template,
        datasources: content_type.datasources.iter().map(str::to_string).collect(),
        icon: content_type.icon,
        config,
    })
}

/// Export a stored type as YAML.
pub fn export_type(services: &Services, type_id: i64) -> Result<String> {
    export_document(services, type_id)?.to_yaml()
}

/// Create a new type from an exchange document.
///
/// Fails with [`CmsError::InvalidImport`] when the document names unknown data
/// sources, carries config for a source it does not enable, or reuses the
/// idnumber of an existing type.
pub fn import_document(services: &Services, document: &TypeDocument) -> Result<ContentType> {
    for short_name in &document.datasources {
        if !services.registry.contains(short_name) {
            return Err(CmsError::InvalidImport {
                reason: format!("unknown data source '{short_name}'"),
            }
            .into());
        }
    }
    let datasources: DatasourceSet = document.datasources.iter().collect();
    if let Some(stray) = document.config.keys().find(|name| !datasources.contains(name)) {
        return Err(CmsError::InvalidImport {
            reason: format!("config given for data source '{stray}' which is not enabled"),
        }
        .into());
    }
    if !document.idnumber.is_empty()
        && services.store.types.count(&|t: &ContentType| t.idnumber == document.idnumber)? > 0
    {
        return Err(CmsError::InvalidImport {
            reason: format!("a content type with idnumber '{}' already exists", document.idnumber),
        }
        .into());
    }

    let mut record = ContentType::new(document.name.clone());
    record.idnumber = document.idnumber.clone();
    record.description = document.description.clone();
    record.title_template = document.title_template.clone();
    record.body_template = document.body_template.clone();
    record.datasources = datasources;
    record.icon = document.icon.clone();
    let created = services.store.types.create(record)?;

    let ctx = DataSourceContext::for_type(services.clone(), created);
    for source in services.registry.list_enabled(&ctx, true) {
        match document.config.get(source.short_name()) {
            Some(section) => source.config_import(section)?,
            None => source.update_config_cache_key()?,
        }
    }
    let imported = ctx.content_type().clone();
    info!("Imported content type {} '{}'", imported.id, imported.name);
    Ok(imported)
}

/// Create a new type from YAML.
pub fn import_type(services: &Services, yaml: &str) -> Result<ContentType> {
    import_document(services, &TypeDocument::from_yaml(yaml)?)
}
