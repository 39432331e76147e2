//! Integration test suite for cms-engine
//!
//! End-to-end tests driving the public API and the `cms` binary.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **backup**: backup documents and two-phase restore
//! - **cli**: the `cms` binary over a snapshot store
//! - **exchange**: YAML export/import round trips
//! - **registry**: registration failures and plugin contributions
//! - **render**: aggregate cache keys and the content cache
//! - **roles_events**: role rosters and role assignment events

#[path = "../common/mod.rs"]
mod common;

mod backup;
mod cli;
mod exchange;
mod registry;
mod render;
mod roles_events;
