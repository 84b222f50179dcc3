//! Keyword placeholder parsing and substitution for template instructions.
//!
//! Instruction templates embed keyword values using `{{ keyword }}` syntax.
//!
//! # Syntax
//!
//! - `{{ keyword }}` - replaced with the keyword's value (inner spaces
//!   optional)
//! - any other text, including single braces, passes through unchanged
//!
//! # Example
//!
//! ```yaml
//! instructions:
//!   - "curl -fsSL -o /tmp/pkg.tar.gz {{ url }}"
//! ```
//!
//! Unknown placeholders are rejected when the template is validated, never at
//! substitution time, so an `install` call can only fail on its own keyword
//! arguments.

use crate::error::{GalleyError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// A segment of an instruction template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Literal(String),
    /// Keyword reference: {{ keyword }}
    Placeholder(String),
}

fn is_keyword_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parse a string containing `{{ keyword }}` placeholders.
///
/// # Errors
///
/// Returns `GalleyError::Template` if a placeholder is unterminated, empty,
/// or contains characters other than ASCII alphanumerics and underscores.
pub fn parse_placeholders(input: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut current_literal = String::new();
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        current_literal.push_str(&rest[..start]);
        rest = &rest[start + 2..];

        let end = rest.find("}}").ok_or_else(|| GalleyError::Template {
            message: format!("unterminated placeholder in '{input}'"),
        })?;
        let name = rest[..end].trim();
        if name.is_empty() {
            return Err(GalleyError::Template {
                message: format!("empty placeholder in '{input}'"),
            });
        }
        if !name.chars().all(is_keyword_char) {
            return Err(GalleyError::Template {
                message: format!("invalid placeholder name '{name}' in '{input}'"),
            });
        }

        if !current_literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut current_literal)));
        }
        segments.push(Segment::Placeholder(name.to_string()));
        rest = &rest[end + 2..];
    }

    current_literal.push_str(rest);
    if !current_literal.is_empty() {
        segments.push(Segment::Literal(current_literal));
    }

    Ok(segments)
}

/// Extract all placeholder names from an instruction template.
///
/// Returns unique names in sorted order.
pub fn extract_placeholders(input: &str) -> Result<BTreeSet<String>> {
    Ok(parse_placeholders(input)?
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Placeholder(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// Substitute keyword values into an instruction template.
///
/// Validation guarantees every placeholder is a declared keyword, and
/// keyword-argument validation guarantees every declared keyword has a value,
/// so a miss here indicates a defect in the caller.
pub fn substitute(input: &str, kwds: &BTreeMap<String, String>) -> Result<String> {
    let segments = parse_placeholders(input)?;
    let mut result = String::new();

    for segment in segments {
        match segment {
            Segment::Literal(text) => result.push_str(&text),
            Segment::Placeholder(name) => {
                let value = kwds.get(&name).ok_or_else(|| GalleyError::Template {
                    message: format!("no value for placeholder '{name}' in '{input}'"),
                })?;
                result.push_str(value);
            }
        }
    }

    Ok(result)
}
