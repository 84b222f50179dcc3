//! Built-in templates embedded at compile time.
//!
//! The `templates/` directory at the repository root ships curated install
//! recipes for common scientific software. They are embedded in the binary
//! and validated like any user-supplied template; a built-in that fails
//! validation is a defect, not a user error.

use crate::error::{GalleyError, Result};
use crate::template::Template;
use include_dir::{include_dir, Dir};

/// Embedded templates directory.
static TEMPLATES_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Parse and validate all built-in templates, in file name order.
pub fn builtin_templates() -> Result<Vec<Template>> {
    let mut files: Vec<_> = TEMPLATES_DIR
        .files()
        .filter(|file| {
            matches!(
                file.path().extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    files.sort_by_key(|file| file.path());

    let mut templates = Vec::with_capacity(files.len());
    for file in files {
        let content = file.contents_utf8().ok_or_else(|| GalleyError::Parse {
            path: file.path().to_path_buf(),
            message: "Invalid UTF-8".to_string(),
        })?;
        let template = Template::from_yaml(content).map_err(|e| GalleyError::Parse {
            path: file.path().to_path_buf(),
            message: e.to_string(),
        })?;
        templates.push(template);
    }
    Ok(templates)
}

/// Check if a template name is shipped as a built-in.
pub fn has_template(name: &str) -> bool {
    builtin_templates()
        .map(|templates| templates.iter().any(|t| t.name() == name.to_lowercase()))
        .unwrap_or(false)
}
