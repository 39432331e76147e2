//! Role collaborator: site roles, users and per-course role assignments.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::core::CmsError;

/// A site-level role definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub shortname: String,
    pub name: String,
}

/// The user fields exposed to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    #[serde(default)]
    pub email: String,
}

impl UserProfile {
    pub fn new(id: i64, firstname: impl Into<String>, lastname: impl Into<String>) -> Self {
        Self {
            id,
            firstname: firstname.into(),
            lastname: lastname.into(),
            email: String::new(),
        }
    }

    pub fn fullname(&self) -> String {
        format!("{} {}", self.firstname, self.lastname).trim().to_string()
    }
}

/// Read access to roles and course role assignments.
pub trait RoleProvider: Send + Sync {
    /// All roles defined on the site, in sort order.
    fn roles(&self) -> Result<Vec<Role>>;

    /// Users holding `role_shortname` in a course, in assignment order.
    fn users_with_role(&self, course_id: i64, role_shortname: &str) -> Result<Vec<UserProfile>>;
}

/// One role assignment in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub course_id: i64,
    pub user_id: i64,
    pub role: String,
}

/// Serialisable state of [`MemoryRoleProvider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesState {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub assignments: Vec<RoleAssignment>,
}

impl Default for RolesState {
    fn default() -> Self {
        let role = |id: i64, shortname: &str, name: &str| Role {
            id,
            shortname: shortname.to_string(),
            name: name.to_string(),
        };
        Self {
            roles: vec![
                role(1, "manager", "Manager"),
                role(3, "editingteacher", "Teacher"),
                role(4, "teacher", "Non-editing teacher"),
                role(5, "student", "Student"),
            ],
            users: Vec::new(),
            assignments: Vec::new(),
        }
    }
}

/// In-process role store.
#[derive(Debug, Default)]
pub struct MemoryRoleProvider {
    state: RwLock<RolesState>,
}

impl MemoryRoleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: RolesState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn state(&self) -> Result<RolesState> {
        Ok(self.read()?.clone())
    }

    pub fn add_user(&self, user: UserProfile) -> Result<()> {
        let mut state = self.write()?;
        state.users.retain(|u| u.id != user.id);
        state.users.push(user);
        Ok(())
    }

    /// Assign a role; re-assigning an existing role is a no-op.
    pub fn assign(&self, course_id: i64, user_id: i64, role: &str) -> Result<()> {
        let mut state = self.write()?;
        if !state.roles.iter().any(|r| r.shortname == role) {
            return Err(CmsError::Other {
                message: format!("Unknown role '{role}'"),
            }
            .into());
        }
        let assignment = RoleAssignment {
            course_id,
            user_id,
            role: role.to_string(),
        };
        if !state.assignments.contains(&assignment) {
            state.assignments.push(assignment);
        }
        Ok(())
    }

    pub fn unassign(&self, course_id: i64, user_id: i64, role: &str) -> Result<()> {
        self.write()?
            .assignments
            .retain(|a| !(a.course_id == course_id && a.user_id == user_id && a.role == role));
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, RolesState>> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, RolesState>> {
        self.state.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> anyhow::Error {
    CmsError::Other {
        message: "role store lock poisoned".to_string(),
    }
    .into()
}

impl RoleProvider for MemoryRoleProvider {
    fn roles(&self) -> Result<Vec<Role>> {
        Ok(self.read()?.roles.clone())
    }

    fn users_with_role(&self, course_id: i64, role_shortname: &str) -> Result<Vec<UserProfile>> {
        let state = self.read()?;
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.course_id == course_id && a.role == role_shortname)
            .filter_map(|a| state.users.iter().find(|u| u.id == a.user_id).cloned())
            .collect())
    }
}
