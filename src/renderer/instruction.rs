//! Typed build-instruction records.
//!
//! A renderer accumulates these records in call order; serialization to
//! Dockerfile or Singularity text is a pure projection of the sequence.

use serde::{Deserialize, Serialize};

/// One atomic unit of a container definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "instruction", rename_all = "snake_case")]
pub enum Instruction {
    /// Add files into the image (Dockerfile `ADD`)
    Add {
        sources: Vec<String>,
        destination: String,
    },

    /// Declare a build-time parameter
    Arg {
        key: String,
        value: Option<String>,
    },

    /// Copy files into the image
    Copy {
        sources: Vec<String>,
        destination: String,
        /// Build stage to copy from (multi-stage builds only)
        from: Option<String>,
        chown: Option<String>,
    },

    /// Set the container entrypoint
    Entrypoint { args: Vec<String> },

    /// Set environment variables; one record per `env` call
    Env { pairs: Vec<(String, String)> },

    /// Declare the base image, opening a build stage
    From {
        base_image: String,
        alias: Option<String>,
    },

    /// Install system packages with the selected package manager
    Install {
        packages: Vec<String>,
        opts: Option<String>,
    },

    /// Attach metadata labels
    Label { pairs: Vec<(String, String)> },

    /// Execute a shell command
    Run { command: String },

    /// Switch the active user
    User { name: String },

    /// Set the working directory
    Workdir { path: String },
}

impl Instruction {
    /// The instruction kind tag, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Add { .. } => "ADD",
            Instruction::Arg { .. } => "ARG",
            Instruction::Copy { .. } => "COPY",
            Instruction::Entrypoint { .. } => "ENTRYPOINT",
            Instruction::Env { .. } => "ENV",
            Instruction::From { .. } => "FROM",
            Instruction::Install { .. } => "INSTALL",
            Instruction::Label { .. } => "LABEL",
            Instruction::Run { .. } => "RUN",
            Instruction::User { .. } => "USER",
            Instruction::Workdir { .. } => "WORKDIR",
        }
    }
}
