//! Typed template representation.
//!
//! This module turns raw template documents into validated, typed values:
//!
//! - [`definition`] - document shapes, structural validation, and
//!   keyword-argument validation
//! - [`placeholder`] - `{{ keyword }}` parsing and substitution
//!
//! Validation happens once, at the boundary: a [`Template`] can only be
//! constructed from a conforming definition, and unknown placeholders are
//! rejected here rather than at substitution time.

pub mod definition;
pub mod placeholder;

// Re-exports
pub use definition::{InstallMethod, Method, PkgManager, Template, TemplateDefinition};
pub use placeholder::{extract_placeholders, parse_placeholders, substitute, Segment};
