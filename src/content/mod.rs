//! Content rendering and lifecycle.
//!
//! - [`Renderer`] assembles an item's data tree and renders it through the
//!   content cache.
//! - [`ContentTypeManager`] and [`ContentManager`] persist types and items and
//!   run the data source lifecycle hooks around every change.

pub mod manager;
pub mod renderer;

#[cfg(test)]
mod renderer_tests;

pub use manager::{ContentManager, ContentTypeManager};
pub use renderer::{DEBUG_KEY, NAME_KEY, Renderer, aggregate_key};
