//! Error types for Galley operations.
//!
//! This module defines [`GalleyError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `GalleyError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `GalleyError::Other`) for unexpected errors
//! - All errors should provide actionable messages naming the offending
//!   template, keyword, or package manager
//!
//! Errors are never used for control flow: every variant reports a hard
//! failure at the call that introduced it.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Galley operations.
#[derive(Debug, Error)]
pub enum GalleyError {
    /// A template definition failed schema or structural validation.
    #[error("Invalid template: {message}")]
    Template { message: String },

    /// A template lookup by name missed the registry.
    #[error("Unknown template '{name}'. Registered templates are '{known}'.")]
    TemplateNotFound { name: String, known: String },

    /// A required keyword is missing, an unknown keyword was supplied, or a
    /// keyword value failed method-specific validation.
    #[error("Invalid keyword arguments for template '{template}': {message}")]
    TemplateKeywordArgument { template: String, message: String },

    /// A renderer was asked to do something its declared package manager or
    /// output format cannot satisfy.
    #[error("{message}")]
    Requirements { message: String },

    /// Renderer-side misuse, e.g. rendering before a base image is set.
    #[error("{message}")]
    Renderer { message: String },

    /// Failed to parse a template or build-spec document.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Galley operations.
pub type Result<T> = std::result::Result<T, GalleyError>;
