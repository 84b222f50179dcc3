//! Command-line interface.
//!
//! - [`args`] - argument definitions (clap derive)
//! - [`commands`] - command implementations
//!
//! The CLI supplies a package-manager choice and an ordered directive list
//! (read from a build-spec document) to the core, and writes the core's
//! rendered text to a file or stdout.

pub mod args;
pub mod commands;

// Re-exports
pub use args::{Cli, Commands, CompletionsArgs, RenderArgs, TemplateArgs};
pub use commands::dispatch;
