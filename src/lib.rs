//! Galley - Declarative container recipe generation for scientific software.
//!
//! Galley turns a declarative description of "how to install a piece of
//! scientific software" into an ordered sequence of build instructions for
//! two container-definition formats: Dockerfile and Singularity definition
//! file.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`error`] - Error types and result aliases
//! - [`registry`] - Template registry and built-in template loading
//! - [`renderer`] - Instruction accumulation and the two output formats
//! - [`schema`] - JSON Schema generation for template documents
//! - [`spec`] - Build-spec document parsing
//! - [`template`] - Typed template representation and validation
//!
//! # Example
//!
//! ```
//! use galley::registry::TemplateRegistry;
//! use galley::renderer::Renderer;
//! use galley::template::PkgManager;
//!
//! let registry = TemplateRegistry::with_builtins().unwrap();
//! let mut renderer = Renderer::docker(&registry, PkgManager::Apt);
//! renderer.from_("debian:bullseye", None).unwrap();
//! let kwds = std::collections::BTreeMap::from([
//!     ("version".to_string(), "1.7.1".to_string()),
//! ]);
//! renderer.install(&["jq"], &kwds).unwrap();
//! println!("{}", renderer.render().unwrap());
//! ```

pub mod cli;
pub mod error;
pub mod registry;
pub mod renderer;
pub mod schema;
pub mod spec;
pub mod template;

pub use error::{GalleyError, Result};
