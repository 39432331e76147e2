//! Core types for the content engine
//!
//! This module holds the error taxonomy shared by every other module:
//!
//! - [`CmsError`] - enumerated failure cases for content, types, documents and persistence
//! - [`RegistryError`] - fatal data source registration failures
//! - [`ErrorContext`] / [`user_friendly_error`] - colored CLI presentation with suggestions
//!
//! Operations across the crate return [`anyhow::Result`] and attach context with
//! `.context(..)`; typed errors are recovered with `downcast_ref` where a caller
//! needs to branch on them.

pub mod error;

pub use error::{CmsError, ErrorContext, RegistryError, user_friendly_error};
