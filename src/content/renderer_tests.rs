//! Tests for the renderer and the content managers.

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use crate::cache::{MemoryContentCache, content_area};
use crate::content::{ContentManager, ContentTypeManager, Renderer};
use crate::core::CmsError;
use crate::datasource::{CacheStrategy, FormData, FormSubmission};
use crate::datasource::userlist::{COLUMNS_FIELD, ROWS_FIELD};
use crate::models::ContentType;
use crate::services::Services;
use crate::store::Repository;
use crate::test_utils::{CountingFactory, services_with_factory, test_services};

fn with_cache(mut services: Services) -> (Services, Arc<MemoryContentCache>) {
    let cache = Arc::new(MemoryContentCache::new());
    services.cache = cache.clone();
    (services, cache)
}

fn empty() -> FormSubmission {
    FormSubmission::default()
}

#[test]
fn test_site_template_renders_and_hits_cache() -> Result<()> {
    let factory = CountingFactory::new("counter", CacheStrategy::Revision);
    let (services, cache) = with_cache(services_with_factory(factory.clone()));

    let types = ContentTypeManager::new(services.clone());
    let content_type = types.create(
        ContentType::new("Banner")
            .with_body("<p>{{site.fullname}}</p>")
            .with_datasources(["counter"]),
        &empty(),
    )?;
    let item = ContentManager::new(services.clone()).create(content_type.id, 1, &empty())?;

    let renderer = Renderer::for_content(services.clone(), item.id)?;
    assert_eq!(renderer.get_html()?, "<p>Acme</p>");
    let calls_after_first = factory.calls();
    assert_eq!(renderer.get_html()?, "<p>Acme</p>");

    assert_eq!(factory.calls(), calls_after_first);
    let (hits, misses) = cache.stats();
    assert!(hits >= 1);
    assert!(misses >= 1);
    assert_eq!(cache.area_len(&content_area(content_type.id)), 1);
    Ok(())
}

#[test]
fn test_null_source_vetoes_content_cache() -> Result<()> {
    let factory = CountingFactory::new("volatile", CacheStrategy::Null);
    let (services, cache) = with_cache(services_with_factory(factory.clone()));

    let content_type = ContentTypeManager::new(services.clone()).create(
        ContentType::new("Live").with_body("{{ volatile.value }}").with_datasources(["volatile"]),
        &empty(),
    )?;
    let item = ContentManager::new(services.clone()).create(content_type.id, 1, &empty())?;
    cache.clear();

    let renderer = Renderer::for_content(services, item.id)?;
    assert_eq!(renderer.get_cache_key()?, None);
    assert_eq!(renderer.get_html()?, "counted");
    assert_eq!(renderer.get_html()?, "counted");
    assert_eq!(factory.calls(), 2);
    assert_eq!(cache.stats(), (0, 0));
    assert_eq!(cache.writes(), 0);
    Ok(())
}

#[test]
fn test_data_tree_shape() -> Result<()> {
    let services = test_services();
    let content_type = ContentTypeManager::new(services.clone()).create(
        ContentType::new("Page").with_title("{{ site.shortname }} page"),
        &empty(),
    )?;
    let item = ContentManager::new(services.clone()).create(content_type.id, 1, &empty())?;
    assert_eq!(item.name, "acme page");

    let data = Renderer::for_content(services, item.id)?.get_data()?;
    assert_eq!(data["name"], "acme page");
    assert_eq!(data["site"]["fullname"], "Acme");
    let debug = data["debug"].as_str().unwrap_or_default();
    assert!(debug.contains("\"fullname\": \"Acme\""));
    Ok(())
}

#[test]
fn test_sample_items_skip_cache() -> Result<()> {
    let (services, cache) = with_cache(test_services());
    let content_type = ContentType::new("Draft").with_body("<b>{{ name }}</b>");
    let html = ContentTypeManager::new(services).preview(&content_type)?;
    assert_eq!(html, "<b>Draft</b>");
    assert_eq!(cache.writes(), 0);
    assert_eq!(cache.stats(), (0, 0));
    Ok(())
}

#[test]
fn test_userlist_edit_changes_key_and_output() -> Result<()> {
    let (services, _) = with_cache(test_services());
    let types = ContentTypeManager::new(services.clone());
    let content_type = types.create(
        ContentType::new("Team")
            .with_body("{% for r in userlist %}{{ r.name }};{% endfor %}")
            .with_datasources(["userlist"]),
        &FormSubmission::new(
            [(COLUMNS_FIELD, json!([{"shortname": "name"}]))].into_iter().collect::<FormData>(),
        ),
    )?;
    let contents = ContentManager::new(services.clone());
    let rows = |names: &[&str]| {
        let rows: Vec<_> = names.iter().map(|n| json!({"name": n})).collect();
        FormSubmission::new([(ROWS_FIELD, json!(rows))].into_iter().collect())
    };
    let item = contents.create(content_type.id, 1, &rows(&["Ann"]))?;
    let first_key = Renderer::for_content(services.clone(), item.id)?.get_cache_key()?;
    assert_eq!(contents.render(item.id)?, "Ann;");

    contents.update(item.id, &rows(&["Ann", "Bo"]))?;
    let second_key = Renderer::for_content(services.clone(), item.id)?.get_cache_key()?;
    assert_ne!(first_key, second_key);
    assert_eq!(contents.render(item.id)?, "Ann;Bo;");
    Ok(())
}

#[test]
fn test_type_update_purges_rendered_content() -> Result<()> {
    let (services, cache) = with_cache(test_services());
    let types = ContentTypeManager::new(services.clone());
    let content_type = types.create(ContentType::new("Page").with_body("v1"), &empty())?;
    let item = ContentManager::new(services.clone()).create(content_type.id, 1, &empty())?;
    assert_eq!(ContentManager::new(services.clone()).render(item.id)?, "v1");

    let mut edited = services.store.get_type(content_type.id)?;
    edited.body_template = "v2".to_string();
    types.update(edited, &empty())?;
    assert_eq!(cache.area_len(&content_area(content_type.id)), 0);
    assert_eq!(ContentManager::new(services).render(item.id)?, "v2");
    Ok(())
}

#[test]
fn test_type_in_use_cannot_be_deleted() -> Result<()> {
    let services = test_services();
    let types = ContentTypeManager::new(services.clone());
    let contents = ContentManager::new(services.clone());
    let content_type = types.create(ContentType::new("Page"), &empty())?;
    let item = contents.create(content_type.id, 1, &empty())?;

    let err = types.delete(content_type.id).unwrap_err();
    assert!(matches!(err.downcast_ref::<CmsError>(), Some(CmsError::TypeInUse { count: 1, .. })));

    contents.delete(item.id)?;
    types.delete(content_type.id)?;
    assert!(services.store.types.get(content_type.id)?.is_none());
    Ok(())
}

#[test]
fn test_unknown_datasource_rejected() {
    let services = test_services();
    let types = ContentTypeManager::new(services);
    let result = types.create(ContentType::new("Odd").with_datasources(["nope"]), &empty());
    assert!(result.is_err());
}

#[test]
fn test_variable_list_and_table() -> Result<()> {
    let services = test_services();
    let renderer = Renderer::for_sample(services, ContentType::new("Intro"));
    let variables = renderer.get_variable_list()?;
    let paths: Vec<&str> = variables.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(paths, vec!["name", "site.fullname", "site.shortname", "site.wwwroot"]);

    let table = renderer.get_data_as_table()?;
    assert!(table.contains("<td>{{site.fullname}}</td><td>Acme</td>"));
    Ok(())
}
