//! Role roster: who holds which configured role in the item's course.
//!
//! Type configuration picks an ordered list of roles (`roles_list`) and a
//! duplicate policy (`roles_duplicates`). Templates see `roles.<shortname>` as a
//! list of users. The roster changes whenever a role assignment changes in the
//! course, so it uses revision keys bumped by
//! [`role_assignment_changed`](crate::events::role_assignment_changed).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{
    CacheStrategy, DataSource, DataSourceContext, FormBuilder, FormData, FormField,
    FormFieldKind, FormFiles, FormSubmission, ValidationError,
};
use crate::core::CmsError;
use crate::services::UserProfile;

pub const ROLES_LIST_FIELD: &str = "roles_list";
pub const DUPLICATES_FIELD: &str = "roles_duplicates";

/// How users holding several configured roles are listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Under every configured role the user holds.
    #[default]
    All,
    /// Only under the first configured role the user holds.
    Firstonly,
    /// Under every role held, each entry carrying the user's held roles.
    Nest,
}

impl DuplicatePolicy {
    pub const ALL: [DuplicatePolicy; 3] = [Self::All, Self::Firstonly, Self::Nest];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Firstonly => "firstonly",
            Self::Nest => "nest",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|p| p.as_str() == s).ok_or_else(|| CmsError::Other {
            message: format!("Unknown duplicate policy '{s}'"),
        })
    }
}

/// Type-level configuration of the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolesConfig {
    #[serde(default)]
    pub roles_list: Vec<String>,
    #[serde(default)]
    pub roles_duplicates: DuplicatePolicy,
}

pub struct RolesDataSource {
    ctx: DataSourceContext,
}

impl RolesDataSource {
    pub fn new(ctx: DataSourceContext) -> Self {
        Self {
            ctx,
        }
    }

    pub fn config(&self) -> RolesConfig {
        let content_type = self.ctx.content_type();
        let data = &content_type.custom_data;
        RolesConfig {
            roles_list: data.get_as(ROLES_LIST_FIELD).unwrap_or_default(),
            roles_duplicates: data.get_as(DUPLICATES_FIELD).unwrap_or_default(),
        }
    }

    fn save_config(&self, config: &RolesConfig) -> Result<()> {
        let roles = serde_json::to_value(&config.roles_list)?;
        let policy = config.roles_duplicates.as_str();
        self.ctx.update_type(|content_type| {
            content_type.custom_data.set(ROLES_LIST_FIELD, roles);
            content_type.custom_data.set(DUPLICATES_FIELD, policy);
        })
    }

    fn users_by_role(&self, config: &RolesConfig) -> Result<Vec<(String, Vec<UserProfile>)>> {
        if self.ctx.is_sample() {
            // One distinct placeholder per role; negative ids never match a real user.
            return Ok(config
                .roles_list
                .iter()
                .zip(1i64..)
                .map(|(role, n)| {
                    (role.clone(), vec![UserProfile::new(-n, "Sample", role.as_str())])
                })
                .collect());
        }
        let course_id = self.ctx.item().course_id;
        config
            .roles_list
            .iter()
            .map(|role| Ok((role.clone(), self.ctx.services().roles.users_with_role(course_id, role)?)))
            .collect()
    }
}

fn user_value(user: &UserProfile) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("id".to_string(), json!(user.id));
    map.insert("fullname".to_string(), json!(user.fullname()));
    map.insert("firstname".to_string(), json!(user.firstname));
    map.insert("lastname".to_string(), json!(user.lastname));
    map.insert("email".to_string(), json!(user.email));
    map
}

/// Build the roster from users per configured role, in configured order.
pub fn build_roster(
    users_by_role: &[(String, Vec<UserProfile>)],
    policy: DuplicatePolicy,
) -> Value {
    let mut roster = Map::new();
    let mut placed = std::collections::HashSet::new();

    let mut held: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for (role, users) in users_by_role {
        for user in users {
            let roles = held.entry(user.id).or_default();
            if !roles.contains(role) {
                roles.push(role.clone());
            }
        }
    }

    for (role, users) in users_by_role {
        let mut entries = Vec::new();
        for user in users {
            if policy == DuplicatePolicy::Firstonly && !placed.insert(user.id) {
                continue;
            }
            let mut value = user_value(user);
            if policy == DuplicatePolicy::Nest {
                value.insert("roles".to_string(), json!(held.get(&user.id).cloned().unwrap_or_default()));
            }
            entries.push(Value::Object(value));
        }
        roster.insert(role.clone(), Value::Array(entries));
    }
    Value::Object(roster)
}

impl DataSource for RolesDataSource {
    fn short_name(&self) -> &str {
        "roles"
    }

    fn display_name(&self) -> String {
        "Course roles".to_string()
    }

    fn context(&self) -> &DataSourceContext {
        &self.ctx
    }

    fn get_data(&self) -> Result<Value> {
        let config = self.config();
        Ok(build_roster(&self.users_by_role(&config)?, config.roles_duplicates))
    }

    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Revision
    }

    fn config_form_definition(&self, form: &mut FormBuilder) -> Result<()> {
        let options = self
            .ctx
            .services()
            .roles
            .roles()?
            .into_iter()
            .map(|r| (r.shortname, r.name))
            .collect();
        form.header("roles_header", "Roles")
            .add(FormField::new(ROLES_LIST_FIELD, "Roles to list", FormFieldKind::Multiselect {
                options,
            }))
            .add(FormField::new(DUPLICATES_FIELD, "Users with several roles", FormFieldKind::Select {
                options: DuplicatePolicy::ALL
                    .iter()
                    .map(|p| (p.as_str().to_string(), p.as_str().to_string()))
                    .collect(),
            }));
        Ok(())
    }

    fn config_form_default_data(&self, data: &mut FormData) -> Result<()> {
        let config = self.config();
        data.set(ROLES_LIST_FIELD, json!(config.roles_list));
        data.set(DUPLICATES_FIELD, config.roles_duplicates.as_str());
        Ok(())
    }

    fn config_form_validation(&self, data: &FormData, _files: &FormFiles) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if let Some(requested) = data.get_strings(ROLES_LIST_FIELD) {
            match self.ctx.services().roles.roles() {
                Ok(roles) => {
                    for shortname in requested {
                        if !roles.iter().any(|r| r.shortname == shortname) {
                            errors.push(ValidationError::new(
                                ROLES_LIST_FIELD,
                                format!("Unknown role '{shortname}'"),
                            ));
                        }
                    }
                }
                Err(e) => errors.push(ValidationError::new(ROLES_LIST_FIELD, format!("{e:#}"))),
            }
        }
        if let Some(policy) = data.get_str(DUPLICATES_FIELD) {
            if let Err(e) = policy.parse::<DuplicatePolicy>() {
                errors.push(ValidationError::new(DUPLICATES_FIELD, e.to_string()));
            }
        }
        errors
    }

    fn config_on_update(&self, submission: &FormSubmission) -> Result<()> {
        let mut config = self.config();
        if let Some(roles) = submission.data.get_strings(ROLES_LIST_FIELD) {
            config.roles_list = roles;
        }
        if let Some(policy) = submission.data.get_str(DUPLICATES_FIELD) {
            config.roles_duplicates = policy.parse()?;
        }
        self.save_config(&config)?;
        self.update_config_cache_key()
    }

    fn config_on_delete(&self) -> Result<()> {
        self.ctx.update_type(|content_type| content_type.custom_data.remove_prefixed("roles"))
    }

    fn config_export(&self) -> Result<Option<Value>> {
        let config = self.config();
        if config.roles_list.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_value(config)?))
    }

    fn config_import(&self, document: &Value) -> Result<()> {
        let config: RolesConfig =
            serde_json::from_value(document.clone()).context("Invalid roles configuration")?;
        self.save_config(&config)?;
        self.update_config_cache_key()
    }
}
