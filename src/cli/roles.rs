//! `cms roles` - manage users and course role assignments of the snapshot.
//!
//! Assignment changes dispatch a [`RoleAssignmentEvent`] so cached rosters of
//! the course are invalidated.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::common::CommandContext;
use crate::events::{RoleAssignmentEvent, RoleChange};
use crate::services::{RoleProvider, UserProfile};

#[derive(Args)]
pub struct RolesCommand {
    #[command(subcommand)]
    action: RolesAction,
}

#[derive(Subcommand)]
enum RolesAction {
    /// List the site's roles.
    List,

    /// Add or replace a user.
    AddUser {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        firstname: String,

        #[arg(long)]
        lastname: String,

        #[arg(long, default_value = "")]
        email: String,
    },

    /// Assign a role to a user in a course.
    Assign {
        #[arg(long)]
        course: i64,

        #[arg(long)]
        user: i64,

        #[arg(long)]
        role: String,
    },

    /// Remove a role from a user in a course.
    Unassign {
        #[arg(long)]
        course: i64,

        #[arg(long)]
        user: i64,

        #[arg(long)]
        role: String,
    },
}

impl RolesCommand {
    pub async fn execute(self, ctx: &mut CommandContext) -> Result<()> {
        let provider = ctx.workspace.roles.clone();
        let (course_id, user_id, role, change) = match self.action {
            RolesAction::List => {
                for role in provider.roles()? {
                    println!("  {:>3}  {}  {}", role.id, role.shortname.green(), role.name);
                }
                return Ok(());
            }
            RolesAction::AddUser {
                id,
                firstname,
                lastname,
                email,
            } => {
                let mut user = UserProfile::new(id, firstname, lastname);
                user.email = email;
                println!("✅ Saved user {} '{}'", user.id, user.fullname());
                provider.add_user(user)?;
                ctx.save().await?;
                return Ok(());
            }
            RolesAction::Assign {
                course,
                user,
                role,
            } => {
                provider.assign(course, user, &role)?;
                (course, user, role, RoleChange::Assigned)
            }
            RolesAction::Unassign {
                course,
                user,
                role,
            } => {
                provider.unassign(course, user, &role)?;
                (course, user, role, RoleChange::Unassigned)
            }
        };

        let event = RoleAssignmentEvent {
            course_id,
            user_id,
            role,
            change,
        };
        let touched = event.dispatch(ctx.services())?;
        ctx.save().await?;
        println!("✅ Role '{}' {:?} for user {user_id}; {touched} roster(s) refreshed", event.role, change);
        Ok(())
    }
}
