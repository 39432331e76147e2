//! Image set: uploaded images owned by the content type.
//!
//! Files live in the `mod_cms/cms_type_images` area keyed by the type id, so the
//! data never depends on the item. Templates see `images.<name>` (file name
//! without extension) holding the public URL.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{
    CacheStrategy, DataSource, DataSourceContext, FormBuilder, FormField, FormFieldKind,
    FormFiles, FormSubmission, ValidationError,
};
use crate::backup::RestoreTask;
use crate::services::{FileArea, SYSTEM_CONTEXT_ID, StoredFile, files::hex_bytes};

pub const COMPONENT: &str = "mod_cms";
pub const FILE_AREA: &str = "cms_type_images";
/// Config form field receiving the uploads.
pub const IMAGES_FIELD: &str = "images";

const ACCEPTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "svg"];

/// One image in an export or backup document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ImageDocument {
    filename: String,
    #[serde(with = "hex_bytes")]
    content: Vec<u8>,
}

pub struct ImagesDataSource {
    ctx: DataSourceContext,
}

impl ImagesDataSource {
    pub fn new(ctx: DataSourceContext) -> Self {
        Self {
            ctx,
        }
    }

    pub fn file_area(type_id: i64) -> FileArea {
        FileArea::new(SYSTEM_CONTEXT_ID, COMPONENT, FILE_AREA, type_id)
    }

    fn area(&self) -> FileArea {
        Self::file_area(self.ctx.type_id())
    }

    fn files(&self) -> Result<Vec<StoredFile>> {
        self.ctx.services().files.list(&self.area())
    }

    fn replace_files(&self, documents: Vec<ImageDocument>) -> Result<()> {
        let area = self.area();
        let files = &self.ctx.services().files;
        files.delete_area(&area)?;
        for doc in documents {
            files.put(&area, StoredFile::new(doc.filename, doc.content))?;
        }
        Ok(())
    }
}

fn stem(filename: &str) -> &str {
    filename.rsplit_once('.').map_or(filename, |(stem, _)| stem)
}

fn extension(filename: &str) -> Option<String> {
    filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

impl DataSource for ImagesDataSource {
    fn short_name(&self) -> &str {
        "images"
    }

    fn display_name(&self) -> String {
        "Images".to_string()
    }

    fn context(&self) -> &DataSourceContext {
        &self.ctx
    }

    fn get_data(&self) -> Result<Value> {
        let area = self.area();
        let wwwroot = &self.ctx.services().site.wwwroot;
        let mut data = Map::new();
        for file in self.files()? {
            data.insert(stem(&file.filename).to_string(), json!(area.url(wwwroot, &file.filename)));
        }
        Ok(Value::Object(data))
    }

    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Hash
    }

    // The file set belongs to the type; items never change it.
    fn get_instance_cache_key(&self) -> Result<Option<String>> {
        Ok(Some(String::new()))
    }

    fn update_instance_cache_key(&self) -> Result<()> {
        Ok(())
    }

    fn config_hash_source(&self) -> Result<Value> {
        let files: Vec<Value> = self
            .files()?
            .iter()
            .map(|f| json!({"filename": f.filename, "contenthash": f.contenthash}))
            .collect();
        Ok(json!({"type_id": self.ctx.type_id(), "files": files}))
    }

    fn config_form_definition(&self, form: &mut FormBuilder) -> Result<()> {
        form.header("images_header", "Images").add(FormField::new(
            IMAGES_FIELD,
            "Images",
            FormFieldKind::Filemanager {
                accepted: ACCEPTED_EXTENSIONS.iter().map(|e| format!(".{e}")).collect(),
            },
        ));
        Ok(())
    }

    fn config_form_validation(
        &self,
        _data: &super::FormData,
        files: &FormFiles,
    ) -> Vec<ValidationError> {
        files
            .get(IMAGES_FIELD)
            .unwrap_or_default()
            .iter()
            .filter(|f| {
                extension(&f.filename).is_none_or(|ext| !ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
            })
            .map(|f| {
                ValidationError::new(IMAGES_FIELD, format!("'{}' is not an image", f.filename))
            })
            .collect()
    }

    fn config_on_update(&self, submission: &FormSubmission) -> Result<()> {
        if let Some(uploads) = submission.files.get(IMAGES_FIELD) {
            self.replace_files(
                uploads
                    .iter()
                    .map(|u| ImageDocument {
                        filename: u.filename.clone(),
                        content: u.content.clone(),
                    })
                    .collect(),
            )?;
        }
        self.update_config_cache_key()
    }

    fn config_on_delete(&self) -> Result<()> {
        let removed = self.ctx.services().files.delete_area(&self.area())?;
        tracing::debug!("Removed {removed} image(s) of type {}", self.ctx.type_id());
        Ok(())
    }

    fn config_export(&self) -> Result<Option<Value>> {
        let files = self.files()?;
        if files.is_empty() {
            return Ok(None);
        }
        let documents: Vec<ImageDocument> = files
            .into_iter()
            .map(|f| ImageDocument {
                filename: f.filename,
                content: f.content,
            })
            .collect();
        Ok(Some(serde_json::to_value(documents)?))
    }

    fn config_import(&self, document: &Value) -> Result<()> {
        let documents: Vec<ImageDocument> =
            serde_json::from_value(document.clone()).context("Invalid image list")?;
        self.replace_files(documents)?;
        self.update_config_cache_key()
    }

    fn config_restore(&self, section: &Value, task: &mut RestoreTask) -> Result<()> {
        let documents: Vec<ImageDocument> =
            serde_json::from_value(section.clone()).context("Invalid image list in backup")?;
        self.replace_files(documents)?;
        task.defer_config_key_refresh(self.short_name(), self.ctx.type_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{FormData, UploadedFile};
    use crate::models::ContentType;
    use crate::store::Repository;
    use crate::test_utils::test_services;

    fn upload(names: &[&str]) -> FormSubmission {
        let mut files = FormFiles::new();
        for name in names {
            files.add(IMAGES_FIELD, UploadedFile::new(*name, name.as_bytes().to_vec()));
        }
        FormSubmission::new(FormData::new()).with_files(files)
    }

    #[test]
    fn test_urls_keyed_by_stem() -> Result<()> {
        let services = test_services();
        let content_type = services
            .store
            .types
            .create(ContentType::new("Gallery").with_datasources(["images"]))?;
        let ds = ImagesDataSource::new(DataSourceContext::for_type(services, content_type.clone()));
        ds.config_on_update(&upload(&["logo.png", "banner.jpg"]))?;

        let data = ds.get_data()?;
        assert_eq!(
            data["logo"],
            format!(
                "https://learn.example.com/pluginfile.php/1/mod_cms/cms_type_images/{}/logo.png",
                content_type.id
            )
        );
        assert!(data.get("banner").is_some());
        assert_eq!(ds.get_instance_cache_key()?, Some(String::new()));
        Ok(())
    }

    #[test]
    fn test_config_key_follows_file_set() -> Result<()> {
        let services = test_services();
        let content_type = services.store.types.create(ContentType::new("Gallery"))?;
        let ds = ImagesDataSource::new(DataSourceContext::for_type(services, content_type));

        ds.config_on_update(&upload(&["a.png"]))?;
        let first = ds.get_config_cache_key()?;
        ds.config_on_update(&upload(&["a.png", "b.png"]))?;
        let second = ds.get_config_cache_key()?;
        assert!(first.is_some());
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn test_rejects_non_images() -> Result<()> {
        let services = test_services();
        let ds = ImagesDataSource::new(DataSourceContext::for_type(
            services,
            ContentType::new("Gallery"),
        ));
        let submission = upload(&["notes.txt", "ok.svg"]);
        let errors = ds.config_form_validation(&submission.data, &submission.files);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("notes.txt"));
        Ok(())
    }

    #[test]
    fn test_delete_removes_files() -> Result<()> {
        let services = test_services();
        let content_type = services.store.types.create(ContentType::new("Gallery"))?;
        let ds = ImagesDataSource::new(DataSourceContext::for_type(
            services.clone(),
            content_type.clone(),
        ));
        ds.config_on_update(&upload(&["a.png"]))?;
        ds.config_on_delete()?;
        assert!(services.files.list(&ImagesDataSource::file_area(content_type.id))?.is_empty());
        Ok(())
    }
}
