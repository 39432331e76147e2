//! Data source registry.
//!
//! The registry maps short names to [`DataSourceFactory`]s. It is built once at
//! start-up, populated by [`DataSourceRegistry::register`] from the built-in set
//! plus whatever [`DataSourcePlugin`]s were supplied, and then shared through
//! [`Services`](crate::services::Services).
//!
//! Population happens at most once per registry. A failed population reports
//! the same [`RegistryError`] on every later call. Sources registered before
//! the failing one stay available.
//!
//! # Examples
//!
//! ```rust
//! use cms_engine::datasource::DataSourceRegistry;
//!
//! let registry = DataSourceRegistry::with_builtins();
//! registry.register().unwrap();
//! registry.register().unwrap(); // no-op
//! assert_eq!(registry.short_names(), vec!["site", "fields", "images", "roles", "userlist"]);
//! ```

use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{debug, info};

use super::{
    DataSource, DataSourceContext, FieldsDataSource, ImagesDataSource, RolesDataSource,
    SiteDataSource, UserListDataSource,
};
use crate::core::{CmsError, RegistryError};

/// Builds data source instances bound to a context.
pub trait DataSourceFactory: Send + Sync {
    fn short_name(&self) -> &str;

    fn create(&self, ctx: DataSourceContext) -> Box<dyn DataSource>;
}

/// A factory backed by a plain constructor function.
pub struct FnFactory {
    short_name: String,
    build: Constructor,
}

impl FnFactory {
    pub fn new(short_name: impl Into<String>, build: Constructor) -> Self {
        Self {
            short_name: short_name.into(),
            build,
        }
    }
}

impl DataSourceFactory for FnFactory {
    fn short_name(&self) -> &str {
        &self.short_name
    }

    fn create(&self, ctx: DataSourceContext) -> Box<dyn DataSource> {
        (self.build)(ctx)
    }
}

/// An external component contributing data sources.
pub trait DataSourcePlugin: Send + Sync {
    /// Component name, used in error messages.
    fn component(&self) -> &str;

    /// Short names this component claims to provide.
    fn declared_datasources(&self) -> Vec<String>;

    /// Factory for one declared short name.
    fn datasource_factory(&self, short_name: &str) -> Option<Arc<dyn DataSourceFactory>>;
}

/// Process-wide short name → factory map.
pub struct DataSourceRegistry {
    factories: RwLock<Vec<Arc<dyn DataSourceFactory>>>,
    builtins: Vec<Arc<dyn DataSourceFactory>>,
    plugins: Vec<Arc<dyn DataSourcePlugin>>,
    registered: OnceLock<Result<(), RegistryError>>,
}

impl Default for DataSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_short_name(short_name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(short_name))
}

/// Signature of a data source constructor.
pub type Constructor = fn(DataSourceContext) -> Box<dyn DataSource>;

fn builtin_factories() -> Vec<Arc<dyn DataSourceFactory>> {
    let builtins: [(&str, Constructor); 5] = [
        ("site", |ctx| Box::new(SiteDataSource::new(ctx))),
        ("fields", |ctx| Box::new(FieldsDataSource::new(ctx))),
        ("images", |ctx| Box::new(ImagesDataSource::new(ctx))),
        ("roles", |ctx| Box::new(RolesDataSource::new(ctx))),
        ("userlist", |ctx| Box::new(UserListDataSource::new(ctx))),
    ];
    builtins
        .into_iter()
        .map(|(short_name, build)| {
            Arc::new(FnFactory::new(short_name, build)) as Arc<dyn DataSourceFactory>
        })
        .collect()
}

impl DataSourceRegistry {
    /// An empty registry with no built-ins; `register()` only adds plugins.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(Vec::new()),
            builtins: Vec::new(),
            plugins: Vec::new(),
            registered: OnceLock::new(),
        }
    }

    /// A registry whose `register()` adds the five built-in sources first.
    pub fn with_builtins() -> Self {
        Self {
            builtins: builtin_factories(),
            ..Self::new()
        }
    }

    /// Supply an external component, discovered by `register()`.
    pub fn with_plugin(mut self, plugin: Arc<dyn DataSourcePlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Populate the registry. Runs once; later calls return the first outcome.
    pub fn register(&self) -> Result<(), RegistryError> {
        self.registered.get_or_init(|| self.populate()).clone()
    }

    pub fn is_registered(&self) -> bool {
        matches!(self.registered.get(), Some(Ok(())))
    }

    /// Register built-ins, then each plugin's declared sources, in order.
    ///
    /// Sources registered before the first failure stay registered.
    fn populate(&self) -> Result<(), RegistryError> {
        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        let before = factories.len();
        let outcome = self.stage(&mut factories);
        info!("Registered {} data source(s)", factories.len() - before);
        outcome
    }

    fn stage(&self, factories: &mut Vec<Arc<dyn DataSourceFactory>>) -> Result<(), RegistryError> {
        let mut seen: HashSet<String> =
            factories.iter().map(|f| f.short_name().to_string()).collect();
        let mut push = |factory: Arc<dyn DataSourceFactory>| {
            if !seen.insert(factory.short_name().to_string()) {
                return Err(RegistryError::DuplicateShortName {
                    short_name: factory.short_name().to_string(),
                });
            }
            factories.push(factory);
            Ok(())
        };
        for factory in &self.builtins {
            push(factory.clone())?;
        }
        for plugin in &self.plugins {
            for short_name in plugin.declared_datasources() {
                let factory = plugin.datasource_factory(&short_name).ok_or_else(|| {
                    RegistryError::MissingImplementation {
                        component: plugin.component().to_string(),
                        short_name: short_name.clone(),
                    }
                })?;
                validate(&short_name, factory.as_ref())?;
                push(factory)?;
            }
        }
        Ok(())
    }

    /// Register one factory. The registry is unchanged on failure.
    pub fn add(&self, factory: Arc<dyn DataSourceFactory>) -> Result<(), RegistryError> {
        let short_name = factory.short_name().to_string();
        validate(&short_name, factory.as_ref())?;

        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        if factories.iter().any(|f| f.short_name() == short_name) {
            return Err(RegistryError::DuplicateShortName {
                short_name,
            });
        }
        debug!("Registered data source '{short_name}'");
        factories.push(factory);
        Ok(())
    }

    pub fn get(&self, short_name: &str) -> Option<Arc<dyn DataSourceFactory>> {
        self.read().iter().find(|f| f.short_name() == short_name).cloned()
    }

    pub fn contains(&self, short_name: &str) -> bool {
        self.get(short_name).is_some()
    }

    /// Registered short names in registration order.
    pub fn short_names(&self) -> Vec<String> {
        self.read().iter().map(|f| f.short_name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Instantiate one source by short name.
    pub fn create(
        &self,
        short_name: &str,
        ctx: &DataSourceContext,
    ) -> Result<Box<dyn DataSource>, CmsError> {
        self.get(short_name).map(|f| f.create(ctx.clone())).ok_or_else(|| {
            CmsError::UnknownDataSource {
                short_name: short_name.to_string(),
            }
        })
    }

    /// Every registered source, enabled or not, in registration order.
    pub fn list_all(&self, ctx: &DataSourceContext) -> Vec<Box<dyn DataSource>> {
        self.snapshot().iter().map(|f| f.create(ctx.clone())).collect()
    }

    /// Sources that contribute to the bound type.
    ///
    /// With `include_optional` the result holds every non-optional source plus
    /// the optional ones enabled on the type; without it only non-optional
    /// sources. Each call builds fresh instances.
    pub fn list_enabled(
        &self,
        ctx: &DataSourceContext,
        include_optional: bool,
    ) -> Vec<Box<dyn DataSource>> {
        self.list_all(ctx)
            .into_iter()
            .filter(|ds| {
                if ds.is_optional() {
                    include_optional && ds.is_enabled()
                } else {
                    true
                }
            })
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<dyn DataSourceFactory>>> {
        self.factories.read().unwrap_or_else(PoisonError::into_inner)
    }

    // Factories are cloned out so instances are built without holding the lock.
    fn snapshot(&self) -> Vec<Arc<dyn DataSourceFactory>> {
        self.read().clone()
    }
}

fn validate(declared: &str, factory: &dyn DataSourceFactory) -> Result<(), RegistryError> {
    if !is_valid_short_name(declared) {
        return Err(RegistryError::InvalidImplementation {
            short_name: declared.to_string(),
            reason: "short names must match [a-z][a-z0-9_]*".to_string(),
        });
    }
    if factory.short_name() != declared {
        return Err(RegistryError::InvalidImplementation {
            short_name: declared.to_string(),
            reason: format!("factory reports short name '{}'", factory.short_name()),
        });
    }
    Ok(())
}
