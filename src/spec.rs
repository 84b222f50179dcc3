//! Build-spec documents.
//!
//! A build spec is the parsed form of what a caller wants rendered: the
//! package manager for the render plus an ordered list of directives, each
//! mapping onto one renderer operation. Renderers consume the directive list
//! in order via [`Renderer::from_spec`](crate::renderer::Renderer::from_spec).
//!
//! # Example
//!
//! ```yaml
//! pkg_manager: apt
//! instructions:
//!   - name: from_
//!     kwds:
//!       base_image: debian:bullseye
//!   - name: env
//!     kwds:
//!       DEBIAN_FRONTEND: noninteractive
//!   - name: install
//!     kwds:
//!       template: jq
//!       version: "1.7.1"
//! ```
//!
//! Directive names are closed: an unknown name fails parsing with the
//! renderer error kind, before any instruction is appended.

use crate::error::{GalleyError, Result};
use crate::template::{Method, PkgManager};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One or more path strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Normalize to a list of paths.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(path) => vec![path],
            OneOrMany::Many(paths) => paths,
        }
    }
}

/// A parsed build specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSpec {
    /// Package manager for this render
    pub pkg_manager: PkgManager,

    /// Ordered directive list
    #[serde(default)]
    pub instructions: Vec<Directive>,
}

impl BuildSpec {
    /// Parse a build spec from a YAML (or JSON) document.
    pub fn from_yaml(document: &str) -> Result<Self> {
        serde_yaml::from_str(document).map_err(|e| GalleyError::Renderer {
            message: format!("invalid build spec: {e}"),
        })
    }
}

/// One build directive: `{name, kwds}` mapping onto a renderer operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "kwds", rename_all = "snake_case")]
pub enum Directive {
    /// Declare the base image
    #[serde(rename = "from_")]
    From {
        base_image: String,
        #[serde(default, rename = "as")]
        alias: Option<String>,
    },

    /// Declare a build-time parameter
    Arg {
        key: String,
        #[serde(default)]
        value: Option<String>,
    },

    /// Set environment variables
    Env(BTreeMap<String, String>),

    /// Copy files into the image
    Copy {
        source: OneOrMany,
        destination: String,
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        chown: Option<String>,
    },

    /// Add files into the image
    Add {
        source: OneOrMany,
        destination: String,
    },

    /// Execute a shell command
    Run { command: String },

    /// Attach metadata labels
    Label(BTreeMap<String, String>),

    /// Set the working directory
    Workdir { path: String },

    /// Switch the active user
    User { name: String },

    /// Set the container entrypoint
    Entrypoint { args: Vec<String> },

    /// Install software from a registered template
    Install {
        template: String,
        #[serde(default)]
        method: Option<Method>,
        #[serde(flatten)]
        kwds: BTreeMap<String, String>,
    },

    /// Install system packages
    InstallPackages {
        packages: Vec<String>,
        #[serde(default)]
        opts: Option<String>,
    },
}
