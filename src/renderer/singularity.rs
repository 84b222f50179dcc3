//! Singularity definition-file serialization.
//!
//! Projects an instruction sequence onto the Singularity section layout:
//! header, `%files`, `%environment`, `%post`, `%runscript`, `%labels`.
//! Within each section, append order is preserved; sections are emitted only
//! when non-empty. The format has a single runscript, so the last recorded
//! entrypoint wins.

use crate::error::{GalleyError, Result};
use crate::renderer::instruction::Instruction;
use crate::renderer::package_install_command;
use crate::template::PkgManager;

/// Derive the bootstrap agent and image reference for a header.
///
/// Bare references bootstrap from Docker Hub; `docker://` and `library://`
/// prefixes select the agent explicitly.
pub(crate) fn bootstrap(base_image: &str) -> Result<(&'static str, &str)> {
    if let Some(image) = base_image.strip_prefix("docker://") {
        Ok(("docker", image))
    } else if let Some(image) = base_image.strip_prefix("library://") {
        Ok(("library", image))
    } else if !base_image.contains("://") {
        Ok(("docker", base_image))
    } else {
        Err(GalleyError::Renderer {
            message: format!("Unknown Singularity bootstrap agent in '{base_image}'."),
        })
    }
}

/// Render the instruction sequence as Singularity definition-file text.
pub(crate) fn render(instructions: &[Instruction], pkg_manager: PkgManager) -> Result<String> {
    let mut header: Option<(&'static str, &str)> = None;
    let mut files: Vec<String> = Vec::new();
    let mut environment: Vec<(String, String)> = Vec::new();
    let mut post: Vec<String> = Vec::new();
    let mut runscript = String::new();
    let mut labels: Vec<String> = Vec::new();

    for instruction in instructions {
        match instruction {
            Instruction::Add {
                sources,
                destination,
            }
            | Instruction::Copy {
                sources,
                destination,
                ..
            } => {
                files.extend(sources.iter().map(|src| format!("{src} {destination}")));
            }
            Instruction::Arg { key, value } => {
                post.push(match value {
                    Some(value) => format!("{key}={value}"),
                    None => format!("{key}="),
                });
            }
            Instruction::Entrypoint { args } => {
                runscript = args.join(" ");
            }
            Instruction::Env { pairs } => {
                environment.extend(pairs.iter().cloned());
            }
            Instruction::From { base_image, .. } => {
                header = Some(bootstrap(base_image)?);
            }
            Instruction::Install { packages, opts } => {
                post.push(package_install_command(
                    pkg_manager,
                    packages,
                    opts.as_deref(),
                ));
            }
            Instruction::Label { pairs } => {
                labels.extend(pairs.iter().map(|(key, value)| format!("{key} {value}")));
            }
            Instruction::Run { command } => {
                post.push(command.clone());
            }
            Instruction::User { name } => {
                post.push(format!("su - {name}"));
            }
            Instruction::Workdir { path } => {
                post.push(format!("mkdir -p {path}\ncd {path}"));
            }
        }
    }

    let mut s = String::new();
    if let Some((agent, image)) = header {
        s.push_str(&format!("Bootstrap: {agent}\nFrom: {image}"));
    }
    if !files.is_empty() {
        s.push_str("\n\n%files\n");
        s.push_str(&files.join("\n"));
    }
    if !environment.is_empty() {
        s.push_str("\n\n%environment");
        for (key, value) in &environment {
            s.push_str(&format!("\nexport {key}=\"{value}\""));
        }
    }
    if !post.is_empty() {
        s.push_str("\n\n%post\n");
        s.push_str(&post.join("\n\n"));
    }
    if !runscript.is_empty() {
        s.push_str("\n\n%runscript\n");
        s.push_str(&runscript);
    }
    if !labels.is_empty() {
        s.push_str("\n\n%labels\n");
        s.push_str(&labels.join("\n"));
    }

    Ok(s.trim_start().to_string())
}
