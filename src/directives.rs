//! Export/import directive scanning
//!
//! Directives live inside `//` comments, which the syntax tree never sees,
//! so this pass runs over raw source text before parsing. Results are joined
//! with the parsed tree later by file identity.
//!
//! Syntax:
//! - `// @export name1, name2`
//! - `// @import { name1, name2 } from "./relative/path.pine"`

use crate::errors::{BuildResult, BundleError};
use regex::Regex;
use std::path::Path;

/// A `// @export` directive with its 1-indexed source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDirective {
    pub names: Vec<String>,
    pub line: usize,
}

/// A `// @import` directive with its 1-indexed source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    /// Requested identifiers, in written order
    pub names: Vec<String>,
    /// The path exactly as written in the directive
    pub from_path: String,
    pub line: usize,
}

/// Scan raw source for directives.
///
/// Tolerates directives anywhere in the file (including after code on the
/// same line), comma-separated name lists, and whitespace variance. Fails
/// on malformed directives: a missing `from` clause, a path that does not
/// start with `./` or `../`, or a path without a file extension.
pub fn scan(
    source: &str,
    path: &Path,
) -> BuildResult<(Vec<ExportDirective>, Vec<ImportDirective>)> {
    let export_re = Regex::new(r"//\s*@export\s+(.+)$").expect("export pattern");
    let import_re = Regex::new(r#"//\s*@import\s*\{\s*([^}]*)\s*\}\s*from\s*["']([^"']+)["']"#)
        .expect("import pattern");
    let marker_re = Regex::new(r"//\s*@(import|export)\b").expect("marker pattern");

    let mut exports = Vec::new();
    let mut imports = Vec::new();

    for (idx, text) in source.lines().enumerate() {
        let line = idx + 1;

        if let Some(caps) = import_re.captures(text) {
            let names = split_names(&caps[1], path, line)?;
            let from_path = caps[2].to_string();
            validate_import_path(&from_path, path, line)?;
            imports.push(ImportDirective {
                names,
                from_path,
                line,
            });
            continue;
        }

        if let Some(caps) = export_re.captures(text) {
            // An @import line also matches the looser export pattern when the
            // import itself is malformed; diagnose it as an import problem.
            if !caps[1].contains("@import") {
                let names = split_names(&caps[1], path, line)?;
                exports.push(ExportDirective { names, line });
                continue;
            }
        }

        if let Some(caps) = marker_re.captures(text) {
            let message = match &caps[1] {
                "import" => diagnose_import(text),
                _ => "missing identifier list after @export",
            };
            return Err(BundleError::DirectiveSyntax {
                message: message.to_string(),
                path: path.to_path_buf(),
                line,
            });
        }
    }

    Ok((exports, imports))
}

/// Split a comma-separated identifier list, rejecting empty or invalid names
fn split_names(raw: &str, path: &Path, line: usize) -> BuildResult<Vec<String>> {
    let ident_re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("ident pattern");

    let names: Vec<String> = raw
        .split(',')
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();

    if names.is_empty() {
        return Err(BundleError::DirectiveSyntax {
            message: "expected a comma-separated identifier list".to_string(),
            path: path.to_path_buf(),
            line,
        });
    }

    for name in &names {
        if !ident_re.is_match(name) {
            return Err(BundleError::DirectiveSyntax {
                message: format!("\"{}\" is not a valid identifier", name),
                path: path.to_path_buf(),
                line,
            });
        }
    }

    Ok(names)
}

fn validate_import_path(from_path: &str, path: &Path, line: usize) -> BuildResult<()> {
    if !(from_path.starts_with("./") || from_path.starts_with("../")) {
        return Err(BundleError::DirectiveSyntax {
            message: format!(
                "import path \"{}\" must start with \"./\" or \"../\"",
                from_path
            ),
            path: path.to_path_buf(),
            line,
        });
    }
    if Path::new(from_path).extension().is_none() {
        return Err(BundleError::DirectiveSyntax {
            message: format!(
                "import path \"{}\" must include a file extension",
                from_path
            ),
            path: path.to_path_buf(),
            line,
        });
    }
    Ok(())
}

/// Explain why an `@import` line failed to match the full directive shape
fn diagnose_import(text: &str) -> &'static str {
    if !text.contains('{') || !text.contains('}') {
        "imported names must be wrapped in { }"
    } else if !text.contains("from") {
        "missing `from \"./path\"` clause"
    } else {
        "malformed @import directive; expected // @import { name } from \"./path.pine\""
    }
}
