//! Common fixtures for the cms-engine integration tests.

// Not every test module uses every helper
#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use cms_engine::content::{ContentManager, ContentTypeManager};
use cms_engine::datasource::{FormData, FormSubmission};
use cms_engine::models::{ContentItem, ContentType};
use cms_engine::services::{MemoryRoleProvider, Services, UserProfile};
use cms_engine::test_utils::test_services;

/// Submission from `(field, value)` pairs.
pub fn submission<const N: usize>(fields: [(&str, Value); N]) -> FormSubmission {
    FormSubmission::new(fields.into_iter().collect::<FormData>())
}

pub fn empty() -> FormSubmission {
    FormSubmission::default()
}

/// In-memory services whose role provider can be driven by the test.
pub fn services_with_roles() -> (Services, Arc<MemoryRoleProvider>) {
    let mut services = test_services();
    let roles = Arc::new(MemoryRoleProvider::new());
    services.roles = roles.clone();
    (services, roles)
}

/// Mary holds teacher and student, Gary holds student, both in `course_id`.
pub fn seed_mary_and_gary(roles: &MemoryRoleProvider, course_id: i64) -> Result<()> {
    roles.add_user(UserProfile::new(1, "Mary", "Major"))?;
    roles.add_user(UserProfile::new(2, "Gary", "Minor"))?;
    roles.assign(course_id, 1, "teacher")?;
    roles.assign(course_id, 1, "student")?;
    roles.assign(course_id, 2, "student")?;
    Ok(())
}

pub fn create_type(
    services: &Services,
    content_type: ContentType,
    config: &FormSubmission,
) -> Result<ContentType> {
    ContentTypeManager::new(services.clone()).create(content_type, config)
}

pub fn create_item(
    services: &Services,
    type_id: i64,
    course_id: i64,
    instance: &FormSubmission,
) -> Result<ContentItem> {
    ContentManager::new(services.clone()).create(type_id, course_id, instance)
}

pub fn render(services: &Services, content_id: i64) -> Result<String> {
    ContentManager::new(services.clone()).render(content_id)
}

/// User list rows with a single `name` column.
pub fn name_rows(names: &[&str]) -> Value {
    Value::Array(names.iter().map(|n| json!({"name": n})).collect())
}

/// A temporary site for driving the `cms` binary.
pub struct TestSite {
    pub temp: TempDir,
    pub store: PathBuf,
    pub config: PathBuf,
}

impl TestSite {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let store = temp.path().join("store.json");
        let config = temp.path().join("config.toml");
        std::fs::write(
            &config,
            r#"[site]
fullname = "Acme"
shortname = "acme"
wwwroot = "https://learn.example.com"
"#,
        )?;
        Ok(Self {
            temp,
            store,
            config,
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// `cms` with this site's config and store.
    pub fn cms(&self) -> Command {
        let mut cmd = Command::cargo_bin("cms").expect("cms binary is built");
        cmd.arg("--config").arg(&self.config).arg("--store").arg(&self.store);
        cmd.env_remove("RUST_LOG").env("NO_COLOR", "1");
        cmd
    }

    pub fn store_json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&std::fs::read_to_string(&self.store)?)?)
    }
}
