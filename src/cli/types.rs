//! `cms types` - list, preview and delete content types.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::common::CommandContext;
use crate::content::ContentTypeManager;
use crate::store::Repository;

#[derive(Args)]
pub struct TypesCommand {
    #[command(subcommand)]
    action: Option<TypesAction>,
}

#[derive(Subcommand)]
enum TypesAction {
    /// List every content type (default).
    List,

    /// Render a type's body template against a sample item.
    Preview {
        /// Content type id
        id: i64,
    },

    /// Delete a content type that no item uses.
    Delete {
        /// Content type id
        id: i64,
    },
}

impl TypesCommand {
    pub async fn execute(self, ctx: &mut CommandContext) -> Result<()> {
        match self.action.unwrap_or(TypesAction::List) {
            TypesAction::List => list(ctx),
            TypesAction::Preview {
                id,
            } => {
                let content_type = ctx.services().store.get_type(id)?;
                let html = ContentTypeManager::new(ctx.services().clone()).preview(&content_type)?;
                println!("{html}");
                Ok(())
            }
            TypesAction::Delete {
                id,
            } => {
                ContentTypeManager::new(ctx.services().clone()).delete(id)?;
                ctx.save().await?;
                println!("✅ Deleted content type {id}");
                Ok(())
            }
        }
    }
}

fn list(ctx: &CommandContext) -> Result<()> {
    let store = &ctx.services().store;
    let types = store.types.all()?;
    if types.is_empty() {
        println!("No content types. Import one with 'cms import <file>'.");
        return Ok(());
    }
    println!("{}", "Content types".bold());
    for content_type in types {
        let items = store.contents_of_type(content_type.id)?.len();
        let datasources = if content_type.datasources.is_empty() {
            "-".dimmed().to_string()
        } else {
            content_type.datasources.joined()
        };
        println!(
            "  {:>4}  {}  [{}]  {} item(s)",
            content_type.id,
            content_type.name.green(),
            datasources,
            items
        );
    }
    Ok(())
}
