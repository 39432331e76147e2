//! Test doubles for data sources and collaborators.

use anyhow::Result;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::datasource::{
    CacheStrategy, DataSource, DataSourceContext, DataSourceFactory, DataSourcePlugin,
    DataSourceRegistry,
};
use crate::services::Services;

use super::test_config;

/// A data source that counts `get_data()` calls.
pub struct CountingDataSource {
    ctx: DataSourceContext,
    short_name: String,
    strategy: CacheStrategy,
    calls: Arc<AtomicUsize>,
}

impl DataSource for CountingDataSource {
    fn short_name(&self) -> &str {
        &self.short_name
    }

    fn display_name(&self) -> String {
        format!("Counting source '{}'", self.short_name)
    }

    fn context(&self) -> &DataSourceContext {
        &self.ctx
    }

    fn get_data(&self) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"value": "counted"}))
    }

    fn cache_strategy(&self) -> CacheStrategy {
        self.strategy
    }
}

/// Factory for [`CountingDataSource`], sharing one call counter.
#[derive(Clone)]
pub struct CountingFactory {
    pub short_name: String,
    pub strategy: CacheStrategy,
    pub calls: Arc<AtomicUsize>,
}

impl CountingFactory {
    pub fn new(short_name: &str, strategy: CacheStrategy) -> Self {
        Self {
            short_name: short_name.to_string(),
            strategy,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataSourceFactory for CountingFactory {
    fn short_name(&self) -> &str {
        &self.short_name
    }

    fn create(&self, ctx: DataSourceContext) -> Box<dyn DataSource> {
        Box::new(CountingDataSource {
            ctx,
            short_name: self.short_name.clone(),
            strategy: self.strategy,
            calls: self.calls.clone(),
        })
    }
}

/// An external component contributing a fixed set of factories.
///
/// Names declared without a factory model a missing implementation.
pub struct StaticPlugin {
    pub component: String,
    pub entries: Vec<(String, Option<Arc<dyn DataSourceFactory>>)>,
}

impl StaticPlugin {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn with_factory(mut self, declared: &str, factory: Arc<dyn DataSourceFactory>) -> Self {
        self.entries.push((declared.to_string(), Some(factory)));
        self
    }

    pub fn declaring(mut self, declared: &str) -> Self {
        self.entries.push((declared.to_string(), None));
        self
    }
}

impl DataSourcePlugin for StaticPlugin {
    fn component(&self) -> &str {
        &self.component
    }

    fn declared_datasources(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    fn datasource_factory(&self, short_name: &str) -> Option<Arc<dyn DataSourceFactory>> {
        self.entries.iter().find(|(name, _)| name == short_name).and_then(|(_, f)| f.clone())
    }
}

/// In-memory services whose registry holds the built-ins plus `factory`.
pub fn services_with_factory(factory: CountingFactory) -> Services {
    let short_name = factory.short_name.clone();
    let plugin = StaticPlugin::new("local_counter").with_factory(&short_name, Arc::new(factory));
    let registry = DataSourceRegistry::with_builtins().with_plugin(Arc::new(plugin));
    if let Err(e) = registry.register() {
        panic!("test registry failed to register: {e}");
    }
    Services {
        registry: Arc::new(registry),
        ..super::test_services()
    }
}

/// Shorthand for [`test_config`]'s site data as the `site` source reports it.
pub fn site_data() -> Value {
    let site = test_config().site;
    json!({"fullname": site.fullname, "shortname": site.shortname, "wwwroot": site.wwwroot})
}
