//! `cms render` and `cms variables`.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::CommandContext;
use crate::content::Renderer;

#[derive(Args)]
pub struct RenderCommand {
    /// Content item id
    id: i64,

    /// Print the data tree as JSON instead of rendered HTML.
    #[arg(long)]
    data: bool,
}

impl RenderCommand {
    pub fn execute(self, ctx: &CommandContext) -> Result<()> {
        let renderer = Renderer::for_content(ctx.services().clone(), self.id)?;
        if self.data {
            println!("{}", serde_json::to_string_pretty(&renderer.get_data()?)?);
        } else {
            println!("{}", renderer.get_html()?);
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct VariablesCommand {
    /// Content type id
    type_id: i64,

    /// Print an HTML table instead of a plain listing.
    #[arg(long)]
    html: bool,
}

impl VariablesCommand {
    pub fn execute(self, ctx: &CommandContext) -> Result<()> {
        let content_type = ctx.services().store.get_type(self.type_id)?;
        let renderer = Renderer::for_sample(ctx.services().clone(), content_type);
        if self.html {
            println!("{}", renderer.get_data_as_table()?);
            return Ok(());
        }
        for (path, value) in renderer.get_variable_list()? {
            println!("{}  {}", format!("{{{{{path}}}}}").cyan(), value);
        }
        Ok(())
    }
}
