//! JSON Schema generation for template documents.
//!
//! This module generates a JSON Schema (Draft-07) for the template file
//! format, enabling IDE autocomplete and validation of template YAML files.

use serde_json::{json, Value};

/// Generates JSON Schema for Galley template documents.
pub struct SchemaGenerator;

impl SchemaGenerator {
    /// Create a new schema generator.
    pub fn new() -> Self {
        Self
    }

    /// Generate the complete JSON Schema for a template document.
    pub fn generate(&self) -> Value {
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "$id": "https://galley-sci.github.io/schemas/template.json",
            "title": "Galley Template",
            "description": "A named recipe describing how to install one piece of software",
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Unique template name (case-insensitive)"
                },
                "binaries": self.method_schema("Install from pre-compiled binaries"),
                "source": self.method_schema("Compile and install from source"),
                "alert": {
                    "type": "string",
                    "description": "Caveat surfaced to the caller; never alters behavior"
                }
            },
            "required": ["name"],
            "anyOf": [
                {"required": ["binaries"]},
                {"required": ["source"]}
            ],
            "additionalProperties": false
        })
    }

    /// Generate schema for one installation method.
    fn method_schema(&self, description: &str) -> Value {
        json!({
            "type": "object",
            "description": description,
            "properties": {
                "pkg_managers": {
                    "type": "array",
                    "items": {"type": "string", "enum": ["apt", "yum"]},
                    "minItems": 1,
                    "description": "Package managers this method supports"
                },
                "env": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                    "description": "Environment variables set before the instructions run"
                },
                "instructions": {
                    "type": "array",
                    "items": {"type": "string"},
                    "minItems": 1,
                    "description": "Ordered instruction templates with {{ keyword }} placeholders"
                },
                "required_keywords": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Keywords the caller must supply"
                },
                "optional_keywords": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                    "description": "Keywords the caller may supply, with defaults"
                },
                "urls": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                    "description": "Version to download-URL table; '*' accepts any version"
                }
            },
            "required": ["pkg_managers", "instructions"],
            "additionalProperties": false
        })
    }
}

impl Default for SchemaGenerator {
    fn default() -> Self {
        Self::new()
    }
}
