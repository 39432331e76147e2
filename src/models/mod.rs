//! Shared data models for content engine operations
//!
//! These are the persisted records the engine works with. Each implements
//! [`Record`](crate::store::Record) so it can live in a
//! [`Repository`](crate::store::Repository).

pub mod content;
pub mod content_type;
pub mod custom_data;
pub mod userlist;

pub use content::ContentItem;
pub use content_type::{ContentType, DatasourceSet};
pub use custom_data::CustomData;
pub use userlist::{UserListColumn, UserListRow, UserListSchema};
