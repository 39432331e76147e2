//! Command-line interface for the content engine.
//!
//! The `cms` binary works on a JSON snapshot of the store and its collaborators
//! (see [`Snapshot`](crate::services::Snapshot)). Every command loads the
//! snapshot, runs through the same managers the library exposes, and writes the
//! snapshot back when it changed anything.
//!
//! # Commands
//!
//! - `types` - list, preview and delete content types
//! - `content` - create, update, list and delete content items
//! - `render` - render an item's HTML (or its data tree with `--data`)
//! - `variables` - template variables available to a content type
//! - `export` / `import` - YAML exchange of content types
//! - `backup` / `restore` - JSON backups of single content items
//! - `roles` - users and course role assignments
//!
//! # Examples
//!
//! ```bash
//! cms import staff.yaml
//! cms content create --type-id 1 --course 2
//! cms --verbose render 1
//! cms --store ./site.json variables 1 --html
//! ```

mod backup;
pub mod common;
mod content;
mod exchange;
mod render;
mod roles;
mod types;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use common::CommandContext;

/// Runtime configuration derived from the global flags.
///
/// Kept separate from [`Cli`] so tests can build one directly.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` leaves `RUST_LOG` in charge.
    pub log_level: Option<String>,

    /// Explicit global configuration file.
    pub config_path: Option<PathBuf>,

    /// Explicit snapshot store, overriding `[store] path`.
    pub store_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The log filter: `--verbose`/`--quiet` win over `RUST_LOG`, which wins over `warn`.
    pub fn env_filter(&self) -> EnvFilter {
        match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        }
    }

    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// Later calls are ignored.
    pub fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Content engine CLI.
#[derive(Parser)]
#[command(
    name = "cms",
    about = "Content engine - render, exchange and back up templated content",
    version,
    long_about = "Manage content types and items stored in a local snapshot, render them through \
                  their data sources and move them between sites."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (cache hits, key computation).
    ///
    /// Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the global configuration file (default `~/.cms/config.toml`).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the snapshot store, overriding the configured one.
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage content types.
    Types(types::TypesCommand),

    /// Manage content items.
    Content(content::ContentCommand),

    /// Render a content item.
    Render(render::RenderCommand),

    /// List the template variables of a content type.
    Variables(render::VariablesCommand),

    /// Export a content type as YAML.
    Export(exchange::ExportCommand),

    /// Import a content type from YAML.
    Import(exchange::ImportCommand),

    /// Back up a content item as JSON.
    Backup(backup::BackupCommand),

    /// Restore a content item from a JSON backup.
    Restore(backup::RestoreCommand),

    /// Manage users and course role assignments.
    Roles(roles::RolesCommand),
}

impl Cli {
    /// Execute with the configuration given on the command line.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
            store_path: self.store.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();
        let mut ctx = CommandContext::load(&config).await?;

        match self.command {
            Commands::Types(cmd) => cmd.execute(&mut ctx).await,
            Commands::Content(cmd) => cmd.execute(&mut ctx).await,
            Commands::Render(cmd) => cmd.execute(&ctx),
            Commands::Variables(cmd) => cmd.execute(&ctx),
            Commands::Export(cmd) => cmd.execute(&ctx).await,
            Commands::Import(cmd) => cmd.execute(&mut ctx).await,
            Commands::Backup(cmd) => cmd.execute(&ctx).await,
            Commands::Restore(cmd) => cmd.execute(&mut ctx).await,
            Commands::Roles(cmd) => cmd.execute(&mut ctx).await,
        }
    }
}
