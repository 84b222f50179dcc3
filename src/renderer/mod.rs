//! Container-definition renderers.
//!
//! A [`Renderer`] is a stateful accumulator of build instructions for one
//! target output format. The two variants (Dockerfile and Singularity
//! definition file) are selected at construction, share the instruction
//! accumulation core, and differ only in serialization and a small set of
//! format constraints (multi-stage builds are Dockerfile-only).
//!
//! # Example
//!
//! ```
//! use galley::registry::TemplateRegistry;
//! use galley::renderer::Renderer;
//! use galley::template::PkgManager;
//!
//! let registry = TemplateRegistry::new();
//! let mut renderer = Renderer::docker(&registry, PkgManager::Apt);
//! renderer.from_("debian:bullseye", None).unwrap();
//! renderer.env([("DEBIAN_FRONTEND", "noninteractive")]).unwrap();
//! renderer.run("apt-get update").unwrap();
//! let text = renderer.render().unwrap();
//! assert!(text.starts_with("FROM debian:bullseye"));
//! ```
//!
//! Every operation validates eagerly and fails at the violating call; a
//! failed call leaves the instruction sequence unchanged. `render` is the
//! only repeatable operation and does not mutate state, so rendering is
//! byte-for-byte deterministic for a given call sequence.

pub mod docker;
pub mod instruction;
pub mod singularity;

use crate::error::{GalleyError, Result};
use crate::registry::TemplateRegistry;
use crate::spec::{BuildSpec, Directive};
use crate::template::placeholder::substitute;
use crate::template::{InstallMethod, Method, PkgManager, Template};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use instruction::Instruction;

/// Target output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Dockerfile instruction syntax
    Docker,
    /// Singularity definition-file syntax
    Singularity,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Docker => write!(f, "docker"),
            OutputFormat::Singularity => write!(f, "singularity"),
        }
    }
}

/// Options for the `copy` operation (Dockerfile-only extensions).
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Build stage to copy from; the stage must already be recorded
    pub from: Option<String>,
    /// Ownership to apply to the copied files
    pub chown: Option<String>,
}

/// Stateful instruction accumulator for one render.
///
/// Owns its state exclusively; concurrent builds need one renderer each.
/// The registry is borrowed for the renderer's lifetime so `install` can
/// resolve template names.
#[derive(Debug)]
pub struct Renderer<'a> {
    registry: &'a TemplateRegistry,
    format: OutputFormat,
    pkg_manager: PkgManager,
    instructions: Vec<Instruction>,
    // One entry per FROM record; holds the stage alias if one was given.
    stages: Vec<Option<String>>,
    // Users known to exist in the image; `user` creates any other user.
    users: BTreeSet<String>,
}

impl<'a> Renderer<'a> {
    /// Create a renderer for the given format and package manager.
    pub fn new(
        registry: &'a TemplateRegistry,
        format: OutputFormat,
        pkg_manager: PkgManager,
    ) -> Self {
        Self {
            registry,
            format,
            pkg_manager,
            instructions: Vec::new(),
            stages: Vec::new(),
            users: BTreeSet::from(["root".to_string()]),
        }
    }

    /// Create a Dockerfile renderer.
    pub fn docker(registry: &'a TemplateRegistry, pkg_manager: PkgManager) -> Self {
        Self::new(registry, OutputFormat::Docker, pkg_manager)
    }

    /// Create a Singularity renderer.
    pub fn singularity(registry: &'a TemplateRegistry, pkg_manager: PkgManager) -> Self {
        Self::new(registry, OutputFormat::Singularity, pkg_manager)
    }

    /// Construct a renderer by applying a build spec's directives in order.
    pub fn from_spec(
        registry: &'a TemplateRegistry,
        format: OutputFormat,
        spec: &BuildSpec,
    ) -> Result<Self> {
        let mut renderer = Self::new(registry, format, spec.pkg_manager);
        for directive in &spec.instructions {
            renderer.apply(directive)?;
        }
        Ok(renderer)
    }

    /// The output format selected at construction.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// The package manager selected at construction.
    pub fn pkg_manager(&self) -> PkgManager {
        self.pkg_manager
    }

    /// The accumulated instruction records, in append order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    fn ensure_base_image(&self, operation: &str) -> Result<()> {
        if self.stages.is_empty() {
            return Err(GalleyError::Renderer {
                message: format!("a base image must be declared before '{operation}'"),
            });
        }
        Ok(())
    }

    /// Declare the base image, opening a build stage.
    ///
    /// Dockerfiles may open further stages with later calls; the Singularity
    /// format rejects a second call or a stage alias with
    /// [`GalleyError::Requirements`].
    pub fn from_(&mut self, base_image: &str, alias: Option<&str>) -> Result<&mut Self> {
        if self.format == OutputFormat::Singularity {
            if alias.is_some() {
                return Err(GalleyError::Requirements {
                    message: "the Singularity format does not support build stage aliases".into(),
                });
            }
            if !self.stages.is_empty() {
                return Err(GalleyError::Requirements {
                    message: "the Singularity format does not support multi-stage builds".into(),
                });
            }
            // Fail on an unknown bootstrap agent now, not at render time.
            singularity::bootstrap(base_image)?;
        }
        self.stages.push(alias.map(String::from));
        self.instructions.push(Instruction::From {
            base_image: base_image.to_string(),
            alias: alias.map(String::from),
        });
        Ok(self)
    }

    /// Declare a build-time parameter.
    pub fn arg(&mut self, key: &str, value: Option<&str>) -> Result<&mut Self> {
        if key.is_empty() {
            return Err(GalleyError::Renderer {
                message: "'arg' requires a non-empty key".into(),
            });
        }
        self.instructions.push(Instruction::Arg {
            key: key.to_string(),
            value: value.map(String::from),
        });
        Ok(self)
    }

    /// Record environment variable assignments.
    ///
    /// One call produces one instruction record holding the pairs in the
    /// given order; consecutive calls are never merged.
    pub fn env<K, V, I>(&mut self, pairs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.ensure_base_image("env")?;
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if pairs.is_empty() {
            return Err(GalleyError::Renderer {
                message: "'env' requires at least one key-value pair".into(),
            });
        }
        self.instructions.push(Instruction::Env { pairs });
        Ok(self)
    }

    /// Record a file-copy instruction.
    pub fn copy<I, S>(&mut self, sources: I, destination: &str) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.copy_with(sources, destination, &CopyOptions::default())
    }

    /// Record a file-copy instruction with Dockerfile-only options.
    pub fn copy_with<I, S>(
        &mut self,
        sources: I,
        destination: &str,
        options: &CopyOptions,
    ) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_base_image("copy")?;
        let sources: Vec<String> = sources.into_iter().map(Into::into).collect();
        if sources.is_empty() {
            return Err(GalleyError::Renderer {
                message: "'copy' requires at least one source path".into(),
            });
        }
        if self.format == OutputFormat::Singularity
            && (options.from.is_some() || options.chown.is_some())
        {
            return Err(GalleyError::Requirements {
                message: "the Singularity format does not support copy stage or ownership options"
                    .into(),
            });
        }
        if let Some(stage) = &options.from {
            if !self.stage_exists(stage) {
                return Err(GalleyError::Renderer {
                    message: format!("unknown build stage '{stage}' referenced by 'copy'"),
                });
            }
        }
        self.instructions.push(Instruction::Copy {
            sources,
            destination: destination.to_string(),
            from: options.from.clone(),
            chown: options.chown.clone(),
        });
        Ok(self)
    }

    /// Record an add-files instruction.
    ///
    /// Singularity has no ADD primitive; the record maps onto `%files` like
    /// `copy`.
    pub fn add<I, S>(&mut self, sources: I, destination: &str) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_base_image("add")?;
        let sources: Vec<String> = sources.into_iter().map(Into::into).collect();
        if sources.is_empty() {
            return Err(GalleyError::Renderer {
                message: "'add' requires at least one source path".into(),
            });
        }
        self.instructions.push(Instruction::Add {
            sources,
            destination: destination.to_string(),
        });
        Ok(self)
    }

    /// Record a shell command instruction.
    pub fn run(&mut self, command: &str) -> Result<&mut Self> {
        self.ensure_base_image("run")?;
        if command.trim().is_empty() {
            return Err(GalleyError::Renderer {
                message: "'run' requires a non-empty command".into(),
            });
        }
        self.instructions.push(Instruction::Run {
            command: command.to_string(),
        });
        Ok(self)
    }

    /// Record a shell command wrapped in `bash -c`.
    pub fn run_bash(&mut self, command: &str) -> Result<&mut Self> {
        self.run(&format!("bash -c '{command}'"))
    }

    /// Record metadata labels.
    pub fn label<K, V, I>(&mut self, pairs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.ensure_base_image("label")?;
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if pairs.is_empty() {
            return Err(GalleyError::Renderer {
                message: "'label' requires at least one key-value pair".into(),
            });
        }
        self.instructions.push(Instruction::Label { pairs });
        Ok(self)
    }

    /// Record a working-directory change.
    pub fn workdir(&mut self, path: &str) -> Result<&mut Self> {
        self.ensure_base_image("workdir")?;
        self.instructions.push(Instruction::Workdir {
            path: path.to_string(),
        });
        Ok(self)
    }

    /// Record a user switch.
    ///
    /// Switching to a user not known to exist in the image first records the
    /// shell command that creates it.
    pub fn user(&mut self, name: &str) -> Result<&mut Self> {
        self.ensure_base_image("user")?;
        if !self.users.contains(name) {
            self.instructions.push(Instruction::Run {
                command: format!(
                    "test \"$(getent passwd {name})\"\n|| useradd --no-user-group --create-home --shell /bin/bash {name}"
                ),
            });
            self.users.insert(name.to_string());
        }
        self.instructions.push(Instruction::User {
            name: name.to_string(),
        });
        Ok(self)
    }

    /// Record the container entrypoint.
    pub fn entrypoint<I, S>(&mut self, args: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_base_image("entrypoint")?;
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(GalleyError::Renderer {
                message: "'entrypoint' requires at least one argument".into(),
            });
        }
        self.instructions.push(Instruction::Entrypoint { args });
        Ok(self)
    }

    /// Record a system-package installation with the selected package
    /// manager.
    pub fn install_packages<I, S>(&mut self, packages: I, opts: Option<&str>) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_base_image("install_packages")?;
        let mut packages: Vec<String> = packages.into_iter().map(Into::into).collect();
        if packages.is_empty() {
            return Err(GalleyError::Renderer {
                message: "'install_packages' requires at least one package".into(),
            });
        }
        packages.sort();
        self.instructions.push(Instruction::Install {
            packages,
            opts: opts.map(String::from),
        });
        Ok(self)
    }

    /// Install software described by registered templates.
    ///
    /// Each name is resolved via the registry; the installation method is
    /// chosen per template (`binaries` preferred, `source` as fallback)
    /// among the methods that support this renderer's package manager.
    /// Keyword arguments are validated per template, substituted into the
    /// method's instruction list, and the resulting concrete instructions are
    /// appended, preserving per-template internal ordering and the caller's
    /// across-template ordering.
    ///
    /// # Errors
    ///
    /// Fails with [`GalleyError::Requirements`] if no method of a template
    /// supports this renderer's package manager, and propagates
    /// `TemplateNotFound`/`TemplateKeywordArgument` from lookup and
    /// validation. On any failure no instructions are appended.
    pub fn install(
        &mut self,
        names: &[&str],
        kwds: &BTreeMap<String, String>,
    ) -> Result<&mut Self> {
        self.ensure_base_image("install")?;
        let mut pending = Vec::new();
        for name in names {
            self.resolve_install(name, None, kwds, &mut pending)?;
        }
        self.instructions.append(&mut pending);
        Ok(self)
    }

    /// Install one template with an explicit installation method.
    pub fn install_with_method(
        &mut self,
        name: &str,
        method: Method,
        kwds: &BTreeMap<String, String>,
    ) -> Result<&mut Self> {
        self.ensure_base_image("install")?;
        let mut pending = Vec::new();
        self.resolve_install(name, Some(method), kwds, &mut pending)?;
        self.instructions.append(&mut pending);
        Ok(self)
    }

    fn resolve_install(
        &self,
        name: &str,
        requested: Option<Method>,
        kwds: &BTreeMap<String, String>,
        out: &mut Vec<Instruction>,
    ) -> Result<()> {
        let template = self.registry.get(name)?;
        let (method, install) = self.select_method(template, requested)?;
        let merged = template.validate_kwds(method, kwds)?;

        if let Some(alert) = template.alert() {
            tracing::warn!(template = template.name(), "{alert}");
        }

        if !install.env.is_empty() {
            let pairs = install
                .env
                .iter()
                .map(|(key, value)| Ok((substitute(key, &merged)?, substitute(value, &merged)?)))
                .collect::<Result<Vec<_>>>()?;
            out.push(Instruction::Env { pairs });
        }
        for instruction in &install.instructions {
            let command = substitute(instruction, &merged)?;
            if command.trim().is_empty() {
                return Err(GalleyError::Renderer {
                    message: format!("empty rendered instructions in template '{}'", template.name()),
                });
            }
            out.push(Instruction::Run { command });
        }
        Ok(())
    }

    fn select_method<'t>(
        &self,
        template: &'t Template,
        requested: Option<Method>,
    ) -> Result<(Method, &'t InstallMethod)> {
        match requested {
            Some(method) => {
                let install = template.method(method).ok_or_else(|| {
                    GalleyError::TemplateKeywordArgument {
                        template: template.name().to_string(),
                        message: format!("no '{method}' installation method"),
                    }
                })?;
                if !install.supports(self.pkg_manager) {
                    return Err(GalleyError::Requirements {
                        message: format!(
                            "method '{}' of template '{}' does not support package manager '{}'",
                            method,
                            template.name(),
                            self.pkg_manager
                        ),
                    });
                }
                Ok((method, install))
            }
            None => [Method::Binaries, Method::Source]
                .into_iter()
                .filter_map(|method| template.method(method).map(|install| (method, install)))
                .find(|(_, install)| install.supports(self.pkg_manager))
                .ok_or_else(|| GalleyError::Requirements {
                    message: format!(
                        "template '{}' does not support package manager '{}'",
                        template.name(),
                        self.pkg_manager
                    ),
                }),
        }
    }

    fn stage_exists(&self, reference: &str) -> bool {
        if let Ok(index) = reference.parse::<usize>() {
            return index < self.stages.len();
        }
        self.stages
            .iter()
            .any(|alias| alias.as_deref() == Some(reference))
    }

    fn apply(&mut self, directive: &Directive) -> Result<()> {
        match directive {
            Directive::From { base_image, alias } => {
                self.from_(base_image, alias.as_deref())?;
            }
            Directive::Arg { key, value } => {
                self.arg(key, value.as_deref())?;
            }
            Directive::Env(vars) => {
                self.env(vars.iter().map(|(k, v)| (k.clone(), v.clone())))?;
            }
            Directive::Copy {
                source,
                destination,
                from,
                chown,
            } => {
                let options = CopyOptions {
                    from: from.clone(),
                    chown: chown.clone(),
                };
                self.copy_with(source.clone().into_vec(), destination, &options)?;
            }
            Directive::Add {
                source,
                destination,
            } => {
                self.add(source.clone().into_vec(), destination)?;
            }
            Directive::Run { command } => {
                self.run(command)?;
            }
            Directive::Label(pairs) => {
                self.label(pairs.iter().map(|(k, v)| (k.clone(), v.clone())))?;
            }
            Directive::Workdir { path } => {
                self.workdir(path)?;
            }
            Directive::User { name } => {
                self.user(name)?;
            }
            Directive::Entrypoint { args } => {
                self.entrypoint(args.iter().cloned())?;
            }
            Directive::Install {
                template,
                method,
                kwds,
            } => match method {
                Some(method) => {
                    self.install_with_method(template, *method, kwds)?;
                }
                None => {
                    self.install(&[template.as_str()], kwds)?;
                }
            },
            Directive::InstallPackages { packages, opts } => {
                self.install_packages(packages.iter().cloned(), opts.as_deref())?;
            }
        }
        Ok(())
    }

    /// Serialize the accumulated instructions to the target format's text.
    ///
    /// Idempotent; the only operation that may be called repeatedly.
    ///
    /// # Errors
    ///
    /// Returns [`GalleyError::Renderer`] if no base image was declared.
    pub fn render(&self) -> Result<String> {
        if self.stages.is_empty() {
            return Err(GalleyError::Renderer {
                message: "no base image declared; call 'from_' before rendering".into(),
            });
        }
        match self.format {
            OutputFormat::Docker => Ok(docker::render(&self.instructions, self.pkg_manager)),
            OutputFormat::Singularity => {
                singularity::render(&self.instructions, self.pkg_manager)
            }
        }
    }

    /// Serialize the accumulated instruction records to JSON.
    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Record<'r> {
            pkg_manager: PkgManager,
            instructions: &'r [Instruction],
        }
        serde_json::to_string_pretty(&Record {
            pkg_manager: self.pkg_manager,
            instructions: &self.instructions,
        })
        .map_err(|e| GalleyError::Other(e.into()))
    }
}

impl fmt::Display for Renderer<'_> {
    /// The rendered container definition, prefixed with a generator comment.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.render().map_err(|_| fmt::Error)?;
        write!(f, "# Generated by Galley.\n\n{rendered}")
    }
}

/// Build the shell command that installs system packages.
pub(crate) fn package_install_command(
    pkg_manager: PkgManager,
    packages: &[String],
    opts: Option<&str>,
) -> String {
    let joined = packages.join(" \\\n    ");
    match pkg_manager {
        PkgManager::Apt => {
            let opts = opts.unwrap_or("-q --no-install-recommends");
            format!(
                "apt-get update -qq\napt-get install -y {opts} \\\n    {joined}\nrm -rf /var/lib/apt/lists/*"
            )
        }
        PkgManager::Yum => {
            let opts = opts.unwrap_or("-q");
            format!(
                "yum install -y {opts} \\\n    {joined}\nyum clean all\nrm -rf /var/cache/yum/*"
            )
        }
    }
}
