//! `cms backup` and `cms restore`.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::common::{CommandContext, read_text, write_output};
use crate::backup::{ContentBackup, backup_content, restore_content};

#[derive(Args)]
pub struct BackupCommand {
    /// Content item id
    id: i64,

    /// Write to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl BackupCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let backup = backup_content(ctx.services(), self.id)?;
        write_output(self.output.as_deref(), &backup.to_json()?).await
    }
}

#[derive(Args)]
pub struct RestoreCommand {
    /// Backup document produced by `cms backup`
    file: PathBuf,

    /// Course receiving the restored item.
    #[arg(long, default_value_t = 1)]
    course: i64,
}

impl RestoreCommand {
    pub async fn execute(self, ctx: &mut CommandContext) -> Result<()> {
        let backup = ContentBackup::from_json(&read_text(&self.file).await?)?;
        let restored = restore_content(ctx.services(), &backup, self.course)?;
        ctx.save().await?;
        let origin = if restored.type_created {
            "new type"
        } else {
            "existing type"
        };
        println!(
            "✅ Restored content item {} '{}' ({origin} {})",
            restored.item.id, restored.item.name, restored.content_type.id
        );
        Ok(())
    }
}
