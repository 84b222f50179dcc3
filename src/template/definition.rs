//! Template schema definitions and validation.
//!
//! A template describes how to install one piece of software, via
//! pre-compiled binaries, from source, or both. Templates are parsed from
//! YAML (or JSON) documents into closed, typed structures at the boundary;
//! anything non-conforming is rejected immediately with
//! [`GalleyError::Template`], and internal code never touches raw mappings.

use crate::error::{GalleyError, Result};
use crate::template::placeholder::{extract_placeholders, substitute};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// System package managers a render can target.
///
/// Selected once per render and fixed for the renderer's lifetime. Templates
/// declare which managers each installation method supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PkgManager {
    /// Debian-based distributions (`apt-get`)
    Apt,
    /// RPM-based distributions (`yum`)
    Yum,
}

impl fmt::Display for PkgManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PkgManager::Apt => write!(f, "apt"),
            PkgManager::Yum => write!(f, "yum"),
        }
    }
}

impl std::str::FromStr for PkgManager {
    type Err = GalleyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "apt" => Ok(PkgManager::Apt),
            "yum" => Ok(PkgManager::Yum),
            other => Err(GalleyError::Requirements {
                message: format!("Unknown package manager '{other}'. Allowed package managers are 'apt', 'yum'."),
            }),
        }
    }
}

/// Installation methods a template may define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Install pre-compiled binaries
    Binaries,
    /// Compile from source
    Source,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Binaries => write!(f, "binaries"),
            Method::Source => write!(f, "source"),
        }
    }
}

/// Raw template document shape.
///
/// Use [`Template::new`] to validate a definition; only validated templates
/// can enter a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateDefinition {
    /// Unique template name (folded to lowercase at validation time)
    pub name: String,

    /// How to install from pre-compiled binaries
    pub binaries: Option<InstallMethod>,

    /// How to compile and install from source
    pub source: Option<InstallMethod>,

    /// Human-readable caveat surfaced to the caller; never alters behavior
    pub alert: Option<String>,
}

/// One installation method of a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallMethod {
    /// Package managers this method supports
    pub pkg_managers: Vec<PkgManager>,

    /// Environment variables to set before the instructions run
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Ordered instruction templates with `{{ keyword }}` placeholders
    pub instructions: Vec<String>,

    /// Keywords the caller must supply
    #[serde(default)]
    pub required_keywords: Vec<String>,

    /// Keywords the caller may supply, with their default values
    #[serde(default)]
    pub optional_keywords: BTreeMap<String, String>,

    /// Version to download-URL table. When present, the `version` keyword is
    /// checked against the table's keys (a `"*"` key accepts any version)
    /// and the resolved URL is exposed to instructions as `{{ url }}`.
    #[serde(default)]
    pub urls: BTreeMap<String, String>,
}

impl InstallMethod {
    /// Check whether this method supports the given package manager.
    pub fn supports(&self, pkg_manager: PkgManager) -> bool {
        self.pkg_managers.contains(&pkg_manager)
    }

    /// All keywords declared by this method, required and optional.
    pub fn declared_keywords(&self) -> BTreeSet<&str> {
        self.required_keywords
            .iter()
            .map(String::as_str)
            .chain(self.optional_keywords.keys().map(String::as_str))
            .collect()
    }

    /// Keywords usable as placeholders: declared keywords plus the implicit
    /// `url` keyword when a `urls` table is present.
    fn allowed_placeholders(&self) -> BTreeSet<&str> {
        let mut allowed = self.declared_keywords();
        if !self.urls.is_empty() {
            allowed.insert("url");
        }
        allowed
    }

    fn validate(&self, context: &str) -> Result<()> {
        let fail = |message: String| -> Result<()> {
            Err(GalleyError::Template {
                message: format!("{context}: {message}"),
            })
        };

        if self.pkg_managers.is_empty() {
            return fail("'pkg_managers' must not be empty".into());
        }
        if self.instructions.is_empty() {
            return fail("'instructions' must not be empty".into());
        }

        for keyword in self.declared_keywords() {
            if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return fail(format!("invalid keyword name '{keyword}'"));
            }
        }
        for keyword in &self.required_keywords {
            if self.optional_keywords.contains_key(keyword) {
                return fail(format!("keyword '{keyword}' is both required and optional"));
            }
        }

        if !self.urls.is_empty() {
            if self.declared_keywords().contains("url") {
                return fail("keyword 'url' conflicts with the implicit url keyword".into());
            }
            if !self.declared_keywords().contains("version") {
                return fail("method declares 'urls' but 'version' is not a declared keyword".into());
            }
            // URL templates may reference declared keywords, but not `url`.
            let declared = self.declared_keywords();
            for url in self.urls.values() {
                for name in extract_placeholders(url)? {
                    if !declared.contains(name.as_str()) {
                        return fail(format!("url references undeclared keyword '{name}'"));
                    }
                }
            }
        }

        let allowed = self.allowed_placeholders();
        for instruction in &self.instructions {
            for name in extract_placeholders(instruction)? {
                if !allowed.contains(name.as_str()) {
                    return fail(format!(
                        "instruction references undeclared keyword '{name}'"
                    ));
                }
            }
        }
        for (key, value) in &self.env {
            for name in extract_placeholders(key)?
                .into_iter()
                .chain(extract_placeholders(value)?)
            {
                if !allowed.contains(name.as_str()) {
                    return fail(format!("env references undeclared keyword '{name}'"));
                }
            }
        }

        Ok(())
    }

    /// Validate caller-supplied keyword arguments and return the merged
    /// mapping: declared defaults overlaid by caller values, plus the
    /// resolved `url` when this method declares a `urls` table.
    ///
    /// Callers must use the merged result, never the raw input, for
    /// instruction substitution.
    fn validate_kwds(
        &self,
        template_name: &str,
        kwds: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let fail = |message: String| GalleyError::TemplateKeywordArgument {
            template: template_name.to_string(),
            message,
        };

        let missing: Vec<&str> = self
            .required_keywords
            .iter()
            .map(String::as_str)
            .filter(|k| !kwds.contains_key(*k))
            .collect();
        if !missing.is_empty() {
            return Err(fail(format!(
                "missing required keywords: '{}'",
                missing.join("', '")
            )));
        }

        let declared = self.declared_keywords();
        let unknown: Vec<&str> = kwds
            .keys()
            .map(String::as_str)
            .filter(|k| !declared.contains(*k))
            .collect();
        if !unknown.is_empty() {
            return Err(fail(format!(
                "unknown keywords: '{}'",
                unknown.join("', '")
            )));
        }

        let mut merged: BTreeMap<String, String> = self.optional_keywords.clone();
        for (key, value) in kwds {
            merged.insert(key.clone(), value.clone());
        }

        if !self.urls.is_empty() {
            // Validation guarantees `version` is declared when urls exist.
            let version = merged.get("version").cloned().unwrap_or_default();
            let url_template = self
                .urls
                .get(&version)
                .or_else(|| self.urls.get("*"))
                .ok_or_else(|| {
                    fail(format!(
                        "unknown version '{}'. Allowed versions are '{}'.",
                        version,
                        self.urls.keys().cloned().collect::<Vec<_>>().join("', '")
                    ))
                })?;
            let url = substitute(url_template, &merged)?;
            merged.insert("url".to_string(), url);
        }

        Ok(merged)
    }
}

/// A validated template.
///
/// Wraps a schema-validated [`TemplateDefinition`] and exposes typed,
/// read-only access plus keyword-argument validation against the method that
/// will be used. Construction is the only validation gate: a `Template` value
/// is always well-formed.
#[derive(Debug, Clone)]
pub struct Template {
    definition: TemplateDefinition,
}

impl Template {
    /// Validate a raw definition.
    ///
    /// The template name is folded to lowercase, so registry lookups are
    /// case-insensitive by construction.
    ///
    /// # Errors
    ///
    /// Returns `GalleyError::Template` if the definition does not conform:
    /// empty name, neither `binaries` nor `source` present, malformed
    /// instruction templates, or placeholders referencing undeclared
    /// keywords.
    pub fn new(mut definition: TemplateDefinition) -> Result<Self> {
        let name = definition.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(GalleyError::Template {
                message: "template name must not be empty".into(),
            });
        }
        if name.chars().any(char::is_whitespace) {
            return Err(GalleyError::Template {
                message: format!("template name '{name}' must not contain whitespace"),
            });
        }
        definition.name = name;

        if definition.binaries.is_none() && definition.source.is_none() {
            return Err(GalleyError::Template {
                message: format!(
                    "template '{}' must define at least one of 'binaries' or 'source'",
                    definition.name
                ),
            });
        }

        if let Some(binaries) = &definition.binaries {
            binaries.validate(&format!("template '{}', method 'binaries'", definition.name))?;
        }
        if let Some(source) = &definition.source {
            source.validate(&format!("template '{}', method 'source'", definition.name))?;
        }

        Ok(Self { definition })
    }

    /// Parse and validate a template from a YAML (or JSON) document.
    pub fn from_yaml(document: &str) -> Result<Self> {
        let definition: TemplateDefinition =
            serde_yaml::from_str(document).map_err(|e| GalleyError::Template {
                message: e.to_string(),
            })?;
        Self::new(definition)
    }

    /// The normalized (lowercase) template name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// The binaries installation method, if defined.
    pub fn binaries(&self) -> Option<&InstallMethod> {
        self.definition.binaries.as_ref()
    }

    /// The source installation method, if defined.
    pub fn source(&self) -> Option<&InstallMethod> {
        self.definition.source.as_ref()
    }

    /// The template's alert string, if any.
    pub fn alert(&self) -> Option<&str> {
        self.definition.alert.as_deref()
    }

    /// The underlying validated definition.
    pub fn definition(&self) -> &TemplateDefinition {
        &self.definition
    }

    /// Look up an installation method by kind.
    pub fn method(&self, method: Method) -> Option<&InstallMethod> {
        match method {
            Method::Binaries => self.binaries(),
            Method::Source => self.source(),
        }
    }

    /// Validate caller-supplied keyword arguments against one of this
    /// template's methods and return the merged keyword mapping.
    ///
    /// # Errors
    ///
    /// Returns `GalleyError::TemplateKeywordArgument` if the method does not
    /// exist for this template, a required keyword is absent, an undeclared
    /// keyword is supplied, or the requested version is not in the method's
    /// `urls` table.
    pub fn validate_kwds(
        &self,
        method: Method,
        kwds: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let install = self
            .method(method)
            .ok_or_else(|| GalleyError::TemplateKeywordArgument {
                template: self.name().to_string(),
                message: format!("no '{method}' installation method"),
            })?;
        install.validate_kwds(self.name(), kwds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kwds(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const MINIMAL: &str = r#"
name: jq
binaries:
  pkg_managers: [apt, yum]
  instructions:
    - "echo install jq"
"#;

    #[test]
    fn parse_minimal_template() {
        let template = Template::from_yaml(MINIMAL).unwrap();
        assert_eq!(template.name(), "jq");
        assert!(template.binaries().is_some());
        assert!(template.source().is_none());
        assert!(template.alert().is_none());
    }

    #[test]
    fn parse_full_template() {
        let yaml = r#"
name: Miniconda
alert: "Miniconda is distributed under a separate license."
binaries:
  pkg_managers: [apt, yum]
  env:
    CONDA_DIR: "{{ install_path }}"
  urls:
    "*": "https://example.com/miniconda-{{ version }}.sh"
  required_keywords: [version]
  optional_keywords:
    install_path: /opt/miniconda
  instructions:
    - "curl -fsSL -o /tmp/miniconda.sh {{ url }}"
    - "bash /tmp/miniconda.sh -b -p {{ install_path }}"
source:
  pkg_managers: [apt]
  required_keywords: [version]
  instructions:
    - "echo build {{ version }}"
"#;
        let template = Template::from_yaml(yaml).unwrap();
        assert_eq!(template.name(), "miniconda"); // lowercased
        assert!(template.binaries().is_some());
        assert!(template.source().is_some());
        assert!(template.alert().unwrap().contains("license"));
    }

    #[test]
    fn missing_name_fails() {
        let yaml = r#"
binaries:
  pkg_managers: [apt]
  instructions: ["echo hi"]
"#;
        assert!(matches!(
            Template::from_yaml(yaml),
            Err(GalleyError::Template { .. })
        ));
    }

    #[test]
    fn empty_name_fails() {
        let yaml = r#"
name: "  "
binaries:
  pkg_managers: [apt]
  instructions: ["echo hi"]
"#;
        assert!(matches!(
            Template::from_yaml(yaml),
            Err(GalleyError::Template { .. })
        ));
    }

    #[test]
    fn no_method_fails() {
        let yaml = "name: lonely\n";
        let err = Template::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("binaries"));
        assert!(err.to_string().contains("source"));
    }

    #[test]
    fn unknown_field_fails() {
        let yaml = r#"
name: jq
binarys:
  pkg_managers: [apt]
  instructions: ["echo hi"]
"#;
        assert!(matches!(
            Template::from_yaml(yaml),
            Err(GalleyError::Template { .. })
        ));
    }

    #[test]
    fn unknown_pkg_manager_fails() {
        let yaml = r#"
name: jq
binaries:
  pkg_managers: [brew]
  instructions: ["echo hi"]
"#;
        assert!(matches!(
            Template::from_yaml(yaml),
            Err(GalleyError::Template { .. })
        ));
    }

    #[test]
    fn empty_pkg_managers_fails() {
        let yaml = r#"
name: jq
binaries:
  pkg_managers: []
  instructions: ["echo hi"]
"#;
        assert!(matches!(
            Template::from_yaml(yaml),
            Err(GalleyError::Template { .. })
        ));
    }

    #[test]
    fn empty_instructions_fails() {
        let yaml = r#"
name: jq
binaries:
  pkg_managers: [apt]
  instructions: []
"#;
        assert!(matches!(
            Template::from_yaml(yaml),
            Err(GalleyError::Template { .. })
        ));
    }

    #[test]
    fn undeclared_placeholder_fails() {
        let yaml = r#"
name: jq
binaries:
  pkg_managers: [apt]
  instructions:
    - "echo {{ version }}"
"#;
        let err = Template::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn undeclared_placeholder_in_env_fails() {
        let yaml = r#"
name: jq
binaries:
  pkg_managers: [apt]
  env:
    PREFIX: "{{ prefix }}"
  instructions:
    - "echo hi"
"#;
        let err = Template::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("prefix"));
    }

    #[test]
    fn keyword_both_required_and_optional_fails() {
        let yaml = r#"
name: jq
binaries:
  pkg_managers: [apt]
  required_keywords: [version]
  optional_keywords:
    version: "1.6"
  instructions:
    - "echo {{ version }}"
"#;
        assert!(matches!(
            Template::from_yaml(yaml),
            Err(GalleyError::Template { .. })
        ));
    }

    #[test]
    fn urls_without_version_keyword_fails() {
        let yaml = r#"
name: jq
binaries:
  pkg_managers: [apt]
  urls:
    "1.6": "https://example.com/jq-1.6"
  instructions:
    - "curl {{ url }}"
"#;
        let err = Template::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn url_placeholder_without_urls_fails() {
        let yaml = r#"
name: jq
binaries:
  pkg_managers: [apt]
  instructions:
    - "curl {{ url }}"
"#;
        assert!(matches!(
            Template::from_yaml(yaml),
            Err(GalleyError::Template { .. })
        ));
    }

    #[test]
    fn validate_kwds_merges_defaults() {
        let yaml = r#"
name: tool
binaries:
  pkg_managers: [apt]
  required_keywords: [version]
  optional_keywords:
    prefix: /opt/tool
  instructions:
    - "install {{ version }} at {{ prefix }}"
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let merged = template
            .validate_kwds(Method::Binaries, &kwds(&[("version", "2.0")]))
            .unwrap();
        assert_eq!(merged.get("version").map(String::as_str), Some("2.0"));
        assert_eq!(merged.get("prefix").map(String::as_str), Some("/opt/tool"));
    }

    #[test]
    fn validate_kwds_caller_overrides_default() {
        let yaml = r#"
name: tool
binaries:
  pkg_managers: [apt]
  optional_keywords:
    prefix: /opt/tool
  instructions:
    - "install at {{ prefix }}"
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let merged = template
            .validate_kwds(Method::Binaries, &kwds(&[("prefix", "/usr/local")]))
            .unwrap();
        assert_eq!(merged.get("prefix").map(String::as_str), Some("/usr/local"));
    }

    #[test]
    fn validate_kwds_missing_required_fails() {
        let yaml = r#"
name: tool
binaries:
  pkg_managers: [apt]
  required_keywords: [version]
  instructions:
    - "install {{ version }}"
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let err = template
            .validate_kwds(Method::Binaries, &kwds(&[]))
            .unwrap_err();
        assert!(matches!(
            err,
            GalleyError::TemplateKeywordArgument { .. }
        ));
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn validate_kwds_unknown_keyword_fails() {
        let template = Template::from_yaml(MINIMAL).unwrap();
        let err = template
            .validate_kwds(Method::Binaries, &kwds(&[("bogus", "1")]))
            .unwrap_err();
        assert!(matches!(
            err,
            GalleyError::TemplateKeywordArgument { .. }
        ));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn validate_kwds_missing_method_fails() {
        let template = Template::from_yaml(MINIMAL).unwrap();
        let err = template
            .validate_kwds(Method::Source, &kwds(&[]))
            .unwrap_err();
        assert!(matches!(
            err,
            GalleyError::TemplateKeywordArgument { .. }
        ));
    }

    #[test]
    fn validate_kwds_resolves_url_for_version() {
        let yaml = r#"
name: tool
binaries:
  pkg_managers: [apt]
  urls:
    "1.6": "https://example.com/tool-1.6"
    "1.7": "https://example.com/tool-1.7"
  required_keywords: [version]
  instructions:
    - "curl {{ url }}"
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let merged = template
            .validate_kwds(Method::Binaries, &kwds(&[("version", "1.7")]))
            .unwrap();
        assert_eq!(
            merged.get("url").map(String::as_str),
            Some("https://example.com/tool-1.7")
        );
    }

    #[test]
    fn validate_kwds_unknown_version_fails() {
        let yaml = r#"
name: tool
binaries:
  pkg_managers: [apt]
  urls:
    "1.6": "https://example.com/tool-1.6"
  required_keywords: [version]
  instructions:
    - "curl {{ url }}"
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let err = template
            .validate_kwds(Method::Binaries, &kwds(&[("version", "9.9")]))
            .unwrap_err();
        assert!(matches!(
            err,
            GalleyError::TemplateKeywordArgument { .. }
        ));
        assert!(err.to_string().contains("9.9"));
    }

    #[test]
    fn validate_kwds_wildcard_url_accepts_any_version() {
        let yaml = r#"
name: tool
binaries:
  pkg_managers: [apt]
  urls:
    "*": "https://example.com/tool-{{ version }}.tar.gz"
  required_keywords: [version]
  instructions:
    - "curl {{ url }}"
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let merged = template
            .validate_kwds(Method::Binaries, &kwds(&[("version", "3.1.4")]))
            .unwrap();
        assert_eq!(
            merged.get("url").map(String::as_str),
            Some("https://example.com/tool-3.1.4.tar.gz")
        );
    }

    #[test]
    fn pkg_manager_display_and_parse() {
        assert_eq!(PkgManager::Apt.to_string(), "apt");
        assert_eq!(PkgManager::Yum.to_string(), "yum");
        assert_eq!("APT".parse::<PkgManager>().unwrap(), PkgManager::Apt);
        assert!("brew".parse::<PkgManager>().is_err());
    }

    #[test]
    fn method_display() {
        assert_eq!(Method::Binaries.to_string(), "binaries");
        assert_eq!(Method::Source.to_string(), "source");
    }

    #[test]
    fn supports_reports_declared_managers() {
        let template = Template::from_yaml(MINIMAL).unwrap();
        let binaries = template.binaries().unwrap();
        assert!(binaries.supports(PkgManager::Apt));
        assert!(binaries.supports(PkgManager::Yum));
    }
}
