//! `cms content` - create, update, list and delete content items.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::common::{CommandContext, ensure_valid, read_submission};
use crate::content::ContentManager;
use crate::models::ContentItem;
use crate::store::Repository;

#[derive(Args)]
pub struct ContentCommand {
    #[command(subcommand)]
    action: ContentAction,
}

#[derive(Subcommand)]
enum ContentAction {
    /// List content items, optionally of one course.
    List {
        #[arg(long)]
        course: Option<i64>,
    },

    /// Create a content item of a type.
    Create {
        #[arg(long = "type-id")]
        type_id: i64,

        #[arg(long, default_value_t = 1)]
        course: i64,

        /// Instance form data as a JSON object, or `@file.json`.
        #[arg(long)]
        data: Option<String>,
    },

    /// Update a content item from instance form data.
    Update {
        id: i64,

        /// Instance form data as a JSON object, or `@file.json`.
        #[arg(long)]
        data: Option<String>,
    },

    /// Delete a content item.
    Delete {
        id: i64,
    },
}

impl ContentCommand {
    pub async fn execute(self, ctx: &mut CommandContext) -> Result<()> {
        let manager = ContentManager::new(ctx.services().clone());
        match self.action {
            ContentAction::List {
                course,
            } => {
                let items = ctx
                    .services()
                    .store
                    .contents
                    .find(&|c: &ContentItem| course.is_none_or(|id| c.course_id == id))?;
                for item in items {
                    println!(
                        "  {:>4}  {}  type {}  course {}",
                        item.id,
                        item.name.green(),
                        item.type_id,
                        item.course_id
                    );
                }
                Ok(())
            }
            ContentAction::Create {
                type_id,
                course,
                data,
            } => {
                let submission = read_submission(data.as_deref()).await?;
                ensure_valid(&manager.validate(type_id, &submission)?)?;
                let item = manager.create(type_id, course, &submission)?;
                ctx.save().await?;
                println!("✅ Created content item {} '{}'", item.id, item.name);
                Ok(())
            }
            ContentAction::Update {
                id,
                data,
            } => {
                let submission = read_submission(data.as_deref()).await?;
                let type_id = ctx.services().store.get_content(id)?.type_id;
                ensure_valid(&manager.validate(type_id, &submission)?)?;
                let item = manager.update(id, &submission)?;
                ctx.save().await?;
                println!("✅ Updated content item {} '{}'", item.id, item.name);
                Ok(())
            }
            ContentAction::Delete {
                id,
            } => {
                manager.delete(id)?;
                ctx.save().await?;
                println!("✅ Deleted content item {id}");
                Ok(())
            }
        }
    }
}
