//! Rendering through the aggregate cache key.

use anyhow::Result;
use std::sync::Arc;

use cms_engine::cache::{MemoryContentCache, content_area};
use cms_engine::content::{ContentTypeManager, Renderer};
use cms_engine::datasource::{CacheStrategy, DataSource};
use cms_engine::datasource::fields::{DEFINITIONS_FIELD, instance_field_name};
use cms_engine::datasource::userlist::{COLUMNS_FIELD, ROWS_FIELD};
use cms_engine::models::ContentType;
use cms_engine::services::Services;
use cms_engine::test_utils::{CountingFactory, services_with_factory, test_services};
use serde_json::json;

use crate::common::{create_item, create_type, empty, name_rows, render, submission};

fn with_memory_cache(mut services: Services) -> (Services, Arc<MemoryContentCache>) {
    let cache = Arc::new(MemoryContentCache::new());
    services.cache = cache.clone();
    (services, cache)
}

#[test]
fn test_second_render_served_from_cache() -> Result<()> {
    let factory = CountingFactory::new("probe", CacheStrategy::Hash);
    let (services, cache) = with_memory_cache(services_with_factory(factory.clone()));
    let content_type = create_type(
        &services,
        ContentType::new("Banner").with_body("<p>{{site.fullname}}</p>").with_datasources(["probe"]),
        &empty(),
    )?;
    let item = create_item(&services, content_type.id, 1, &empty())?;

    assert_eq!(render(&services, item.id)?, "<p>Acme</p>");
    let calls = factory.calls();
    let writes = cache.writes();

    assert_eq!(render(&services, item.id)?, "<p>Acme</p>");
    assert_eq!(factory.calls(), calls);
    assert_eq!(cache.writes(), writes);
    Ok(())
}

#[test]
fn test_null_source_never_touches_content_cache() -> Result<()> {
    let factory = CountingFactory::new("live", CacheStrategy::Null);
    let (services, cache) = with_memory_cache(services_with_factory(factory.clone()));
    let content_type = create_type(
        &services,
        ContentType::new("Ticker").with_body("{{ live.value }}").with_datasources(["live"]),
        &empty(),
    )?;
    let item = create_item(&services, content_type.id, 1, &empty())?;
    cache.clear();

    for _ in 0..3 {
        assert_eq!(render(&services, item.id)?, "counted");
    }
    assert_eq!(factory.calls(), 3);
    assert_eq!(cache.area_len(&content_area(content_type.id)), 0);
    assert_eq!(cache.stats(), (0, 0));
    Ok(())
}

#[test]
fn test_hash_keys_shared_by_identical_data() -> Result<()> {
    let services = test_services();
    let content_type = create_type(
        &services,
        ContentType::new("Team").with_datasources(["userlist"]),
        &submission([(COLUMNS_FIELD, json!([{"shortname": "name"}]))]),
    )?;
    let first = create_item(&services, content_type.id, 1, &submission([(ROWS_FIELD, name_rows(&["Ann"]))]))?;
    let twin = create_item(&services, content_type.id, 2, &submission([(ROWS_FIELD, name_rows(&["Ann"]))]))?;
    let other = create_item(&services, content_type.id, 1, &submission([(ROWS_FIELD, name_rows(&["Bo"]))]))?;

    let key = |id| -> Result<Option<String>> {
        let renderer = Renderer::for_content(services.clone(), id)?;
        let source = services.registry.create("userlist", renderer.context())?;
        source.get_instance_cache_key()
    };
    assert_eq!(key(first.id)?, key(twin.id)?);
    assert_ne!(key(first.id)?, key(other.id)?);
    Ok(())
}

#[test]
fn test_disabled_cache_still_renders() -> Result<()> {
    let mut config = cms_engine::test_utils::test_config();
    config.cache.enabled = false;
    let services = Services::in_memory(&config)?;
    let content_type =
        create_type(&services, ContentType::new("Plain").with_body("{{ site.shortname }}"), &empty())?;
    let item = create_item(&services, content_type.id, 1, &empty())?;
    assert_eq!(render(&services, item.id)?, "acme");
    assert_eq!(render(&services, item.id)?, "acme");
    Ok(())
}

#[test]
fn test_template_error_surfaces() -> Result<()> {
    let services = test_services();
    let content_type =
        create_type(&services, ContentType::new("Broken").with_body("{{ site.fullname "), &empty())?;
    let item = create_item(&services, content_type.id, 1, &empty())?;
    assert!(render(&services, item.id).is_err());
    Ok(())
}

#[test]
fn test_config_change_rekeys_existing_items() -> Result<()> {
    let (services, _) = with_memory_cache(test_services());
    let level = |options: [&str; 2]| {
        submission([(
            DEFINITIONS_FIELD,
            json!([{"shortname": "level", "name": "Level", "type": "select", "options": options}]),
        )])
    };
    let content_type = create_type(
        &services,
        ContentType::new("Badge").with_body("{{ fields.level }}").with_datasources(["fields"]),
        &level(["x", "x"]),
    )?;
    let field = instance_field_name("level");
    let first = create_item(&services, content_type.id, 1, &submission([(field.as_str(), json!(0))]))?;
    let second = create_item(&services, content_type.id, 1, &submission([(field.as_str(), json!(1))]))?;
    assert_eq!(render(&services, first.id)?, "x");
    assert_eq!(render(&services, second.id)?, "x");

    let stored = services.store.get_type(content_type.id)?;
    ContentTypeManager::new(services.clone()).update(stored, &level(["x", "y"]))?;
    assert_eq!(render(&services, first.id)?, "x");
    assert_eq!(render(&services, second.id)?, "y");
    Ok(())
}

#[test]
fn test_title_change_renames_existing_items() -> Result<()> {
    let services = test_services();
    let content_type = create_type(
        &services,
        ContentType::new("Notice").with_title("old").with_body("{{ name }}"),
        &empty(),
    )?;
    let item = create_item(&services, content_type.id, 1, &empty())?;
    assert_eq!(render(&services, item.id)?, "old");

    let mut stored = services.store.get_type(content_type.id)?;
    stored.title_template = "new".to_string();
    ContentTypeManager::new(services.clone()).update(stored, &empty())?;
    assert_eq!(services.store.get_content(item.id)?.name, "new");
    assert_eq!(render(&services, item.id)?, "new");
    Ok(())
}
