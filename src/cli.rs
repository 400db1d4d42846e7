//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stencil site builder CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Where to start looking for the project root (default: the
    /// current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a basic project structure with starter templates
    Init {
        /// the name(path) of the project directory, relative to `root`
        name: Option<PathBuf>,

        /// the default title for the site
        #[arg(short, long, default_value = "Example")]
        title: String,
    },

    /// Create a draft of the given type and print its path
    Draft {
        /// Template the draft is written against
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Draft title (default: the current date and time)
        title: Option<String>,
    },

    /// Move a draft into the content tree, stamping its metadata
    Publish {
        /// Template the draft was written against
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Title the draft was created with
        title: String,
    },

    /// Render content and templates into the output directory
    Build {
        /// Output directory name relative to the project root
        #[arg(short, long, default_value = "build")]
        output: String,
    },

    /// Remove the output directory
    Clean {
        /// Directory to remove relative to the project root
        #[arg(short, long, default_value = "build")]
        output: String,
    },
}
