//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Galley - Declarative container recipe generation for scientific software.
#[derive(Debug, Parser)]
#[command(name = "galley")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render a build spec as a Dockerfile
    Docker(RenderArgs),

    /// Render a build spec as a Singularity definition file
    Singularity(RenderArgs),

    /// List registered templates
    List(TemplateArgs),

    /// Print the JSON Schema for template documents
    Schema,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `docker` and `singularity` commands.
#[derive(Debug, Clone, clap::Args)]
pub struct RenderArgs {
    /// Build specification file ('-' reads from stdin)
    pub spec: PathBuf,

    #[command(flatten)]
    pub templates: TemplateArgs,

    /// Write rendered output to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Template registration arguments shared by rendering and listing.
#[derive(Debug, Clone, clap::Args)]
pub struct TemplateArgs {
    /// Directories with additional templates to register (':' separated)
    #[arg(long, env = "GALLEY_TEMPLATE_PATH", value_delimiter = ':')]
    pub template_path: Vec<PathBuf>,

    /// Skip the embedded built-in templates
    #[arg(long)]
    pub no_builtins: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
