//! Template registry.
//!
//! A [`TemplateRegistry`] maps normalized template names to validated
//! [`Template`]s. It is an explicit instance with its lifecycle owned by the
//! caller (the CLI builds one per invocation; tests build disposable ones) —
//! there is no hidden global state.
//!
//! # Example
//!
//! ```
//! use galley::registry::TemplateRegistry;
//!
//! // Registry pre-loaded with the embedded built-in templates
//! let registry = TemplateRegistry::with_builtins().unwrap();
//! assert!(registry.get("jq").is_ok());
//! ```
//!
//! Registration is atomic: a definition is validated before the mapping is
//! touched, and a duplicate name without `overwrite` leaves the registry
//! unchanged. Enumeration is in insertion order, stable within a process run.

pub mod builtin;

use crate::error::{GalleyError, Result};
use crate::template::Template;
use std::collections::HashMap;
use std::path::Path;

/// In-memory mapping from template name to validated template definitions.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    // Insertion-ordered storage; `index` maps normalized names to positions.
    templates: Vec<Template>,
    index: HashMap<String, usize>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-loaded with the embedded built-in templates.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for template in builtin::builtin_templates()? {
            registry.register(template, false)?;
        }
        Ok(registry)
    }

    /// Register a validated template.
    ///
    /// # Errors
    ///
    /// Returns `GalleyError::Template` if a template with the same normalized
    /// name is already registered and `overwrite` is false. The registry is
    /// not mutated on failure.
    pub fn register(&mut self, template: Template, overwrite: bool) -> Result<()> {
        let name = template.name().to_string();
        match self.index.get(&name) {
            Some(&position) => {
                if !overwrite {
                    return Err(GalleyError::Template {
                        message: format!(
                            "template '{name}' is already registered; pass overwrite to replace it"
                        ),
                    });
                }
                // Replace in place; the original insertion position is kept.
                self.templates[position] = template;
            }
            None => {
                self.index.insert(name, self.templates.len());
                self.templates.push(template);
            }
        }
        Ok(())
    }

    /// Parse, validate, and register a template from a YAML file.
    pub fn register_file(&mut self, path: &Path, overwrite: bool) -> Result<()> {
        let document = std::fs::read_to_string(path)?;
        let template = Template::from_yaml(&document).map_err(|e| GalleyError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.register(template, overwrite)
    }

    /// Register every `*.yaml`/`*.yml` file in a directory.
    ///
    /// Files are registered in file name order so repeated runs produce the
    /// same registry contents in the same order.
    pub fn register_dir(&mut self, dir: &Path, overwrite: bool) -> Result<()> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();
        for path in paths {
            self.register_file(&path, overwrite)?;
        }
        Ok(())
    }

    /// Look up a template by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `GalleyError::TemplateNotFound` naming the registered
    /// templates if the name is absent.
    pub fn get(&self, name: &str) -> Result<&Template> {
        let normalized = name.to_lowercase();
        self.index
            .get(&normalized)
            .map(|&position| &self.templates[position])
            .ok_or_else(|| GalleyError::TemplateNotFound {
                name: normalized,
                known: self.names().collect::<Vec<_>>().join("', '"),
            })
    }

    /// Check whether a template is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    /// Names of registered templates, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(Template::name)
    }

    /// Registered `(name, template)` pairs, in insertion order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &Template)> {
        self.templates.iter().map(|t| (t.name(), t))
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample(name: &str) -> Template {
        Template::from_yaml(&format!(
            r#"
name: {name}
binaries:
  pkg_managers: [apt]
  instructions:
    - "echo install {name}"
"#
        ))
        .unwrap()
    }

    #[test]
    fn register_then_get_roundtrips() {
        let mut registry = TemplateRegistry::new();
        registry.register(sample("jq"), false).unwrap();
        let template = registry.get("jq").unwrap();
        assert_eq!(template.name(), "jq");
    }

    #[test]
    fn get_is_case_insensitive() {
        let mut registry = TemplateRegistry::new();
        registry.register(sample("jq"), false).unwrap();
        assert!(registry.get("JQ").is_ok());
        assert!(registry.contains("Jq"));
    }

    #[test]
    fn get_unknown_fails_and_names_known() {
        let mut registry = TemplateRegistry::new();
        registry.register(sample("jq"), false).unwrap();
        let err = registry.get("fsl").unwrap_err();
        assert!(matches!(err, GalleyError::TemplateNotFound { .. }));
        assert!(err.to_string().contains("jq"));
    }

    #[test]
    fn duplicate_without_overwrite_fails_without_mutating() {
        let mut registry = TemplateRegistry::new();
        registry.register(sample("jq"), false).unwrap();
        let replacement = Template::from_yaml(
            r#"
name: jq
source:
  pkg_managers: [yum]
  instructions:
    - "echo replacement"
"#,
        )
        .unwrap();

        let result = registry.register(replacement, false);
        assert!(matches!(result, Err(GalleyError::Template { .. })));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("jq").unwrap().binaries().is_some());
    }

    #[test]
    fn duplicate_with_overwrite_replaces() {
        let mut registry = TemplateRegistry::new();
        registry.register(sample("jq"), false).unwrap();
        let replacement = Template::from_yaml(
            r#"
name: jq
source:
  pkg_managers: [yum]
  instructions:
    - "echo replacement"
"#,
        )
        .unwrap();

        registry.register(replacement, true).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("jq").unwrap().binaries().is_none());
        assert!(registry.get("jq").unwrap().source().is_some());
    }

    #[test]
    fn overwrite_keeps_insertion_position() {
        let mut registry = TemplateRegistry::new();
        registry.register(sample("a"), false).unwrap();
        registry.register(sample("b"), false).unwrap();
        registry.register(sample("a"), true).unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn names_and_items_are_insertion_ordered() {
        let mut registry = TemplateRegistry::new();
        for name in ["zsh", "ants", "miniconda"] {
            registry.register(sample(name), false).unwrap();
        }
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["zsh", "ants", "miniconda"]);
        let item_names: Vec<_> = registry.items().map(|(n, _)| n).collect();
        assert_eq!(item_names, names);
    }

    #[test]
    fn register_file_loads_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("jq.yaml");
        fs::write(
            &path,
            r#"
name: jq
binaries:
  pkg_managers: [apt]
  instructions:
    - "echo install jq"
"#,
        )
        .unwrap();

        let mut registry = TemplateRegistry::new();
        registry.register_file(&path, false).unwrap();
        assert!(registry.contains("jq"));
    }

    #[test]
    fn register_file_invalid_yaml_fails_with_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.yaml");
        fs::write(&path, "name: [oops\n").unwrap();

        let mut registry = TemplateRegistry::new();
        let err = registry.register_file(&path, false).unwrap_err();
        assert!(matches!(err, GalleyError::Parse { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn register_dir_loads_in_file_name_order() {
        let temp = TempDir::new().unwrap();
        for name in ["b_tool", "a_tool"] {
            fs::write(
                temp.path().join(format!("{name}.yaml")),
                format!(
                    r#"
name: {name}
binaries:
  pkg_managers: [apt]
  instructions:
    - "echo {name}"
"#
                ),
            )
            .unwrap();
        }
        // Non-template files are ignored.
        fs::write(temp.path().join("README.md"), "not a template").unwrap();

        let mut registry = TemplateRegistry::new();
        registry.register_dir(temp.path(), false).unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["a_tool", "b_tool"]);
    }

    #[test]
    fn empty_registry_reports_empty() {
        let registry = TemplateRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.names().count(), 0);
    }
}
