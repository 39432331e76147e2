//! `cms export` and `cms import`.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::common::{CommandContext, read_text, write_output};
use crate::exchange::{export_type, import_type};

#[derive(Args)]
pub struct ExportCommand {
    /// Content type id
    type_id: i64,

    /// Write to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ExportCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let yaml = export_type(ctx.services(), self.type_id)?;
        write_output(self.output.as_deref(), &yaml).await
    }
}

#[derive(Args)]
pub struct ImportCommand {
    /// YAML document produced by `cms export`
    file: PathBuf,
}

impl ImportCommand {
    pub async fn execute(self, ctx: &mut CommandContext) -> Result<()> {
        let yaml = read_text(&self.file).await?;
        let content_type = import_type(ctx.services(), &yaml)?;
        ctx.save().await?;
        println!("✅ Imported content type {} '{}'", content_type.id, content_type.name);
        Ok(())
    }
}
