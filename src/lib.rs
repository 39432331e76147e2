//! cms-engine - template-driven content types with pluggable data sources
//!
//! Administrators define reusable *content types*: a title template, a body
//! template and the set of *data sources* that feed them. Authors then create
//! *content items* of a type; rendering an item merges every active data
//! source's contribution into one data tree and runs the templates over it.
//!
//! # Architecture Overview
//!
//! - A [`DataSourceRegistry`](datasource::DataSourceRegistry) maps short names to
//!   data source factories: five built-ins plus any contributed by plugins.
//! - Each [`DataSource`](datasource::DataSource) decides whether its data is
//!   cacheable through one of three [`CacheStrategy`](datasource::CacheStrategy)
//!   variants: content hash, revision counter, or never.
//! - The [`Renderer`](content::Renderer) concatenates every source's cache-key
//!   fragment into one aggregate key and serves rendered HTML from the content
//!   cache under it. A single withheld fragment makes the render uncacheable.
//!
//! # Core Modules
//!
//! ## Engine
//! - [`datasource`] - data source contract, cache-key strategies, registry, built-ins
//! - [`content`] - renderer and type/item lifecycle managers
//! - [`templating`] - template engine collaborator (Tera)
//! - [`cache`] - content cache collaborator
//!
//! ## Persistence and collaborators
//! - [`models`] - content types, content items, user list records
//! - [`store`] - repository abstraction with in-memory tables
//! - [`services`] - custom fields, roles, file storage and the [`Services`](services::Services) bundle
//!
//! ## Portability
//! - [`backup`] - item backups with deferred restore steps
//! - [`exchange`] - YAML export/import of content types
//! - [`events`] - host event hooks (role assignment changes)
//!
//! ## Application
//! - [`cli`] - the `cms` command-line interface
//! - [`config`] - global TOML configuration
//! - [`core`] - error taxonomy and user-facing error display
//!
//! # Example
//!
//! ```rust,no_run
//! use cms_engine::config::GlobalConfig;
//! use cms_engine::content::{ContentManager, ContentTypeManager};
//! use cms_engine::datasource::FormSubmission;
//! use cms_engine::models::ContentType;
//! use cms_engine::services::Services;
//!
//! # fn example() -> anyhow::Result<()> {
//! let services = Services::in_memory(&GlobalConfig::default())?;
//! let content_type = ContentTypeManager::new(services.clone()).create(
//!     ContentType::new("Welcome").with_body("<p>{{ site.fullname }}</p>"),
//!     &FormSubmission::default(),
//! )?;
//! let contents = ContentManager::new(services);
//! let item = contents.create(content_type.id, 1, &FormSubmission::default())?;
//! println!("{}", contents.render(item.id)?);
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod cache;
pub mod cli;
pub mod config;
pub mod content;
pub mod core;
pub mod datasource;
pub mod events;
pub mod exchange;
pub mod models;
pub mod services;
pub mod store;
pub mod templating;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
