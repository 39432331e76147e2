//! Configuration management.
//!
//! A single global TOML file ([`GlobalConfig`]) carries the site facts exposed to
//! templates, the content cache switch and the default snapshot store location
//! used by the CLI.

mod global;

pub use global::{CONFIG_PATH_ENV, CacheConfig, GlobalConfig, SiteConfig, StoreConfig};
