//! Command implementations.
//!
//! The CLI is a thin collaborator around the core: it builds a registry,
//! parses a build spec, hands both to a renderer, and writes the rendered
//! text to a file or stdout. No rendering logic lives here, and nothing is
//! written when rendering fails.

use crate::cli::args::{Cli, Commands, CompletionsArgs, RenderArgs, TemplateArgs};
use crate::error::{GalleyError, Result};
use crate::registry::TemplateRegistry;
use crate::renderer::{OutputFormat, Renderer};
use crate::schema::SchemaGenerator;
use crate::spec::BuildSpec;
use clap::CommandFactory;
use std::io::Read;
use std::path::Path;

/// Dispatch a parsed command line.
pub fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Docker(args) => render(OutputFormat::Docker, args),
        Commands::Singularity(args) => render(OutputFormat::Singularity, args),
        Commands::List(args) => list(args),
        Commands::Schema => schema(),
        Commands::Completions(args) => completions(args),
    }
}

fn build_registry(args: &TemplateArgs) -> Result<TemplateRegistry> {
    let mut registry = if args.no_builtins {
        TemplateRegistry::new()
    } else {
        TemplateRegistry::with_builtins()?
    };
    for dir in &args.template_path {
        // User-supplied templates may shadow built-ins.
        registry.register_dir(dir, true)?;
        tracing::debug!(dir = %dir.display(), "registered templates");
    }
    Ok(registry)
}

fn read_spec(path: &Path) -> Result<BuildSpec> {
    let document = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };
    BuildSpec::from_yaml(&document)
}

fn render(format: OutputFormat, args: &RenderArgs) -> Result<()> {
    let registry = build_registry(&args.templates)?;
    let spec = read_spec(&args.spec)?;
    let renderer = Renderer::from_spec(&registry, format, &spec)?;
    let text = renderer.render()?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))?;
            tracing::info!(path = %path.display(), "wrote rendered {format} definition");
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn list(args: &TemplateArgs) -> Result<()> {
    let registry = build_registry(args)?;
    for name in registry.names() {
        println!("{name}");
    }
    Ok(())
}

fn schema() -> Result<()> {
    let schema = SchemaGenerator::new().generate();
    let text =
        serde_json::to_string_pretty(&schema).map_err(|e| GalleyError::Other(e.into()))?;
    println!("{text}");
    Ok(())
}

fn completions(args: &CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(args.shell, &mut cmd, "galley", &mut std::io::stdout());
    Ok(())
}
