//! Host event hooks.
//!
//! Role rosters are cached by a per-item revision counter. The host calls
//! [`role_assignment_changed`] whenever a role is assigned or unassigned in a
//! course so that every roster in that course is re-read on the next render.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::datasource::DataSourceContext;
use crate::models::ContentItem;
use crate::services::Services;
use crate::store::Repository;

/// Short name of the data source invalidated by role events.
const ROLES_SOURCE: &str = "roles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleChange {
    Assigned,
    Unassigned,
}

/// A role assignment change reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignmentEvent {
    pub course_id: i64,
    pub user_id: i64,
    pub role: String,
    pub change: RoleChange,
}

impl RoleAssignmentEvent {
    /// Dispatch the event; returns the number of items invalidated.
    pub fn dispatch(&self, services: &Services) -> Result<usize> {
        debug!(
            "Role '{}' {:?} for user {} in course {}",
            self.role, self.change, self.user_id, self.course_id
        );
        role_assignment_changed(services, self.course_id)
    }
}

/// Bump the roles revision of every item in `course_id` whose type lists roles.
///
/// Returns the number of items touched.
pub fn role_assignment_changed(services: &Services, course_id: i64) -> Result<usize> {
    let items = services.store.contents.find(&|c: &ContentItem| c.course_id == course_id)?;
    let mut touched = 0;
    for item in items {
        let content_type = services.store.get_type(item.type_id)?;
        if !content_type.datasources.contains(ROLES_SOURCE) {
            continue;
        }
        let item_id = item.id;
        let ctx = DataSourceContext::for_item(services.clone(), content_type, item);
        services.registry.create(ROLES_SOURCE, &ctx)?.update_instance_cache_key()?;
        debug!("Invalidated role roster of item {item_id}");
        touched += 1;
    }
    if touched > 0 {
        info!("Role change in course {course_id} invalidated {touched} roster(s)");
    }
    Ok(touched)
}
