//! Backup and two-phase restore of content items.

use anyhow::Result;
use serde_json::json;

use cms_engine::backup::{ContentBackup, backup_content, restore_content};
use cms_engine::content::Renderer;
use cms_engine::datasource::fields::{DEFINITIONS_FIELD, instance_field_name};
use cms_engine::datasource::images::ImagesDataSource;
use cms_engine::datasource::userlist::{COLUMNS_FIELD, ROWS_FIELD};
use cms_engine::models::{ContentItem, ContentType, UserListRow, UserListSchema};
use cms_engine::services::{CustomFieldHandler, FileStorage, Services, StoredFile};
use cms_engine::store::Repository;
use cms_engine::test_utils::test_services;

use crate::common::{create_item, create_type, name_rows, render, submission};

const BODY: &str = "<h1>{{ fields.motto }}</h1>\
{% for row in userlist %}<li>{{ row.name }}</li>{% endfor %}\
<img src=\"{{ images.logo | safe }}\">";

fn populated_site() -> Result<(Services, i64)> {
    let services = test_services();
    let content_type = create_type(
        &services,
        ContentType::new("Club")
            .with_idnumber("club")
            .with_title("{{ fields.motto }}")
            .with_body(BODY)
            .with_datasources(["fields", "userlist", "images"]),
        &submission([
            (COLUMNS_FIELD, json!([{"shortname": "name"}])),
            (DEFINITIONS_FIELD, json!([{"shortname": "motto", "name": "Motto", "type": "text"}])),
        ]),
    )?;
    services.files.put(
        &ImagesDataSource::file_area(content_type.id),
        StoredFile::new("logo.png", vec![1, 2, 3]),
    )?;
    let item = create_item(
        &services,
        content_type.id,
        7,
        &submission([
            (instance_field_name("motto").as_str(), json!("Carpe diem")),
            (ROWS_FIELD, name_rows(&["Ann", "Bo"])),
        ]),
    )?;
    Ok((services, item.id))
}

#[test]
fn test_restore_on_other_site_renders_identically() -> Result<()> {
    let (services, content_id) = populated_site()?;
    let original = render(&services, content_id)?;
    let backup = ContentBackup::from_json(&backup_content(&services, content_id)?.to_json()?)?;

    let target = test_services();
    // Occupy the first ids so every id must be remapped.
    create_type(&target, ContentType::new("Filler"), &Default::default())?;

    let restored = restore_content(&target, &backup, 3)?;
    assert!(restored.type_created);
    assert_ne!(restored.content_type.id, backup.content_type.id);
    assert_eq!(restored.item.course_id, 3);
    assert_eq!(restored.item.name, "Carpe diem");

    let html = render(&target, restored.item.id)?;
    let old_url = format!("cms_type_images/{}/logo.png", backup.content_type.id);
    let new_url = format!("cms_type_images/{}/logo.png", restored.content_type.id);
    assert_eq!(html, original.replace(&old_url, &new_url));
    assert!(html.contains("<li>Ann</li><li>Bo</li>"));
    Ok(())
}

#[test]
fn test_deferred_steps_recompute_hashes() -> Result<()> {
    let (services, content_id) = populated_site()?;
    let backup = backup_content(&services, content_id)?;
    let target = test_services();
    let restored = restore_content(&target, &backup, 1)?;

    let stored = target.store.get_content(restored.item.id)?;
    for source in ["fields", "userlist"] {
        assert!(stored.custom_data.get_str(&format!("{source}_instancehash")).is_some(), "{source}");
    }

    let renderer = Renderer::for_content(target.clone(), restored.item.id)?;
    let original = Renderer::for_content(services.clone(), content_id)?;
    assert_eq!(
        renderer.get_data()?["userlist"],
        original.get_data()?["userlist"]
    );
    Ok(())
}

#[test]
fn test_restore_reuses_type_by_idnumber() -> Result<()> {
    let (services, content_id) = populated_site()?;
    let backup = backup_content(&services, content_id)?;

    let restored = restore_content(&services, &backup, 8)?;
    assert!(!restored.type_created);
    assert_eq!(restored.content_type.id, backup.content_type.id);
    assert_eq!(services.store.types.count(&|_: &ContentType| true)?, 1);
    assert_eq!(services.store.contents_of_type(backup.content_type.id)?.len(), 2);
    assert_eq!(render(&services, restored.item.id)?, render(&services, content_id)?);
    Ok(())
}

#[test]
fn test_backup_sections_by_source() -> Result<()> {
    let (services, content_id) = populated_site()?;
    let backup = backup_content(&services, content_id)?;

    let type_sections: Vec<&str> = backup.content_type.sources.keys().map(String::as_str).collect();
    assert_eq!(type_sections, vec!["fields", "images", "userlist"]);
    let item_sections: Vec<&str> = backup.item.sources.keys().map(String::as_str).collect();
    assert_eq!(item_sections, vec!["fields", "userlist"]);
    assert_eq!(backup.item.sources["fields"]["motto"], "Carpe diem");
    Ok(())
}

#[test]
fn test_unknown_source_in_backup_rejected() -> Result<()> {
    let (services, content_id) = populated_site()?;
    let mut backup = backup_content(&services, content_id)?;
    backup.content_type.datasources.insert("weather");
    assert!(restore_content(&test_services(), &backup, 1).is_err());
    Ok(())
}

#[test]
fn test_failed_restore_discards_created_type_and_item() -> Result<()> {
    let (services, content_id) = populated_site()?;
    let mut backup = backup_content(&services, content_id)?;
    backup.item.sources.insert("userlist".to_string(), json!("not rows"));

    let target = test_services();
    assert!(restore_content(&target, &backup, 1).is_err());

    let store = &target.store;
    assert_eq!(store.types.count(&|_: &ContentType| true)?, 0);
    assert_eq!(store.contents.count(&|_: &ContentItem| true)?, 0);
    assert_eq!(store.userlist_schemas.count(&|_: &UserListSchema| true)?, 0);
    assert_eq!(store.userlist_rows.count(&|_: &UserListRow| true)?, 0);
    // The type would have been created with id 1.
    assert!(target.fields.definitions(1)?.is_empty());
    assert!(target.files.list(&ImagesDataSource::file_area(1))?.is_empty());
    Ok(())
}

#[test]
fn test_failed_restore_keeps_reused_type() -> Result<()> {
    let (services, content_id) = populated_site()?;
    let mut backup = backup_content(&services, content_id)?;
    backup.item.sources.insert("userlist".to_string(), json!("not rows"));

    assert!(restore_content(&services, &backup, 8).is_err());
    assert_eq!(services.store.types.count(&|_: &ContentType| true)?, 1);
    assert_eq!(services.store.contents_of_type(backup.content_type.id)?.len(), 1);
    assert!(render(&services, content_id)?.contains("<li>Ann</li><li>Bo</li>"));
    Ok(())
}
