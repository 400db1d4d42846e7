//! Stencil - a metadata-driven site builder.
//!
//! There are no config files; everything a build needs is embedded in
//! the content and template files themselves.

mod build;
mod clean;
mod cli;
mod draft;
mod frontmatter;
mod init;
mod logger;
mod pagination;
mod project;
mod publish;
mod template;
mod utils;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use project::Project;
use std::env;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let start = match &cli.root {
        Some(root) => root.clone(),
        None => env::current_dir()?,
    };

    match &cli.command {
        Commands::Init { name, title } => {
            let target = name
                .as_ref()
                .map_or_else(|| start.clone(), |name| start.join(name));
            init::new_project(&Project::at(target), title, name.is_some())
        }
        Commands::Draft { type_name, title } => {
            draft::new_draft(&Project::discover(&start)?, type_name, title.as_deref())
        }
        Commands::Publish { type_name, title } => {
            publish::publish_draft(&Project::discover(&start)?, type_name, title)
        }
        Commands::Build { output } => build::build_site(&Project::discover(&start)?, output),
        Commands::Clean { output } => clean::clean_output(&Project::discover(&start)?, output),
    }
}
