//! Registry population with plugin contributions.

use anyhow::Result;
use std::sync::Arc;

use cms_engine::core::RegistryError;
use cms_engine::datasource::{CacheStrategy, DataSourceContext, DataSourceRegistry};
use cms_engine::models::ContentType;
use cms_engine::test_utils::{CountingFactory, StaticPlugin, test_services};

#[test]
fn test_plugin_sources_registered_after_builtins() {
    let plugin = StaticPlugin::new("local_weather")
        .with_factory("weather", Arc::new(CountingFactory::new("weather", CacheStrategy::Null)));
    let registry = DataSourceRegistry::with_builtins().with_plugin(Arc::new(plugin));
    assert!(registry.register().is_ok());
    assert_eq!(
        registry.short_names(),
        vec!["site", "fields", "images", "roles", "userlist", "weather"]
    );
}

#[test]
fn test_collision_with_builtin_keeps_first_registration() -> Result<()> {
    let plugin = StaticPlugin::new("local_clash")
        .with_factory("site", Arc::new(CountingFactory::new("site", CacheStrategy::Revision)));
    let registry = DataSourceRegistry::with_builtins().with_plugin(Arc::new(plugin));

    let err = registry.register().unwrap_err();
    assert_eq!(
        err,
        RegistryError::DuplicateShortName {
            short_name: "site".to_string()
        }
    );
    // The failure is sticky and reported again on every call.
    assert_eq!(registry.register().unwrap_err(), err);

    // Built-ins registered before the clash stay usable.
    assert!(!registry.is_empty());
    assert!(registry.contains("site"));
    let services = test_services();
    let ctx = DataSourceContext::for_type(services, ContentType::new("Any"));
    assert_eq!(registry.create("site", &ctx)?.cache_strategy(), CacheStrategy::Null);
    Ok(())
}

#[test]
fn test_add_duplicate_leaves_registry_unchanged() {
    let registry = DataSourceRegistry::with_builtins();
    registry.register().unwrap();
    let before = registry.short_names();

    let err = registry
        .add(Arc::new(CountingFactory::new("fields", CacheStrategy::Null)))
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateShortName { .. }));
    assert_eq!(registry.short_names(), before);
}

#[test]
fn test_declared_but_missing_implementation() {
    let plugin = StaticPlugin::new("local_ghost").declaring("ghost");
    let registry = DataSourceRegistry::with_builtins().with_plugin(Arc::new(plugin));
    assert_eq!(
        registry.register().unwrap_err(),
        RegistryError::MissingImplementation {
            component: "local_ghost".to_string(),
            short_name: "ghost".to_string()
        }
    );
}

#[test]
fn test_malformed_short_name_is_invalid() {
    let plugin = StaticPlugin::new("local_bad")
        .with_factory("Bad-Name", Arc::new(CountingFactory::new("Bad-Name", CacheStrategy::Null)));
    let registry = DataSourceRegistry::with_builtins().with_plugin(Arc::new(plugin));
    assert!(matches!(
        registry.register(),
        Err(RegistryError::InvalidImplementation { .. })
    ));
}
