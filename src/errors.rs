//! Build error taxonomy
//!
//! Every fatal error carries the file it originated in and, where derivable,
//! a line number. The pipeline aborts on the first fatal error; warnings are
//! collected on the dependency graph and surfaced by the CLI without
//! aborting.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for bundling operations
pub type BuildResult<T> = Result<T, BundleError>;

/// Fatal errors raised while bundling a project
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("config error in {}: {message}", .path.display())]
    Config { message: String, path: PathBuf },

    #[error("parse error in {}: {message}", location(.path, .line))]
    Parse {
        message: String,
        path: PathBuf,
        line: Option<usize>,
    },

    #[error("invalid directive in {}:{line}: {message}", .path.display())]
    DirectiveSyntax {
        message: String,
        path: PathBuf,
        line: usize,
    },

    #[error(
        "cannot find module \"{import_path}\" (imported from {}:{from_line}){}",
        .from_file.display(),
        suggestions("files in that directory", .available)
    )]
    ModuleNotFound {
        import_path: String,
        from_file: PathBuf,
        from_line: usize,
        available: Vec<String>,
    },

    #[error(
        "\"{name}\" is not exported from \"{}\" (imported from {}:{from_line}){}",
        file_name(.module_path),
        .from_file.display(),
        export_hint(.available_exports)
    )]
    ExportNotFound {
        name: String,
        module_path: PathBuf,
        from_file: PathBuf,
        from_line: usize,
        available_exports: Vec<String>,
    },

    #[error(
        "exported identifier \"{name}\" is not defined in {} (directive at line {export_line}){}",
        .module_path.display(),
        suggestions("top-level definitions", .available)
    )]
    ExportedIdentifierNotFound {
        name: String,
        module_path: PathBuf,
        export_line: usize,
        available: Vec<String>,
    },

    #[error("circular dependency detected: {}", format_cycle(.cycle))]
    CircularDependency { cycle: Vec<PathBuf> },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BundleError {
    /// Wrap an I/O failure with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Non-fatal diagnostics collected during resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The same name is exported by two unrelated modules. Prefixing keeps
    /// them distinct in the output, so this only aids user clarity.
    DuplicateExport {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DuplicateExport { name, first, second } => write!(
                f,
                "\"{}\" is exported by both {} and {}; the bundled copies stay distinct, but consider renaming one",
                name,
                file_name(first),
                file_name(second)
            ),
        }
    }
}

fn location(path: &Path, line: &Option<usize>) -> String {
    match line {
        Some(l) => format!("{}:{}", path.display(), l),
        None => path.display().to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Render up to five suggestions inline, or nothing when there are none
fn suggestions(label: &str, items: &[String]) -> String {
    if items.is_empty() {
        String::new()
    } else {
        let shown: Vec<&str> = items.iter().take(5).map(String::as_str).collect();
        format!("; {}: {}", label, shown.join(", "))
    }
}

fn export_hint(items: &[String]) -> String {
    if items.is_empty() {
        "; this module has no exports, add // @export to export identifiers".to_string()
    } else {
        format!("; available exports: {}", items.join(", "))
    }
}

fn format_cycle(cycle: &[PathBuf]) -> String {
    cycle
        .iter()
        .map(|p| file_name(p))
        .collect::<Vec<_>>()
        .join(" → ")
}
