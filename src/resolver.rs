//! Dependency resolution and graph building
//!
//! Discovers modules depth-first from the entry point, memoizing each parsed
//! file by absolute path so a module imported from several places is parsed
//! exactly once. The DFS post-order is the topological order: every module
//! appears after all of its dependencies, the entry last, ties broken by
//! first-discovery order.

use crate::config::normalize_path;
use crate::directives::{self, ImportDirective};
use crate::errors::{BuildResult, BundleError, Warning};
use crate::syntax::{StatementKind, SyntaxProvider, Tree};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// What kind of top-level definition an export refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Function,
    Variable,
}

/// One exported identifier, validated against the module's definitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub name: String,
    pub kind: ExportKind,
    /// Line of the `@export` directive
    pub line: usize,
}

/// An import directive with its target resolved to an absolute path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    /// Requested identifiers, in written order
    pub names: Vec<String>,
    /// The path exactly as written
    pub written_path: String,
    pub resolved: PathBuf,
    pub line: usize,
}

/// One source file with its parsed tree and directives
#[derive(Debug)]
pub struct Module {
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
    pub exports: Vec<ExportRecord>,
    pub imports: Vec<ResolvedImport>,
}

impl Module {
    pub fn exported_names(&self) -> Vec<String> {
        self.exports.iter().map(|e| e.name.clone()).collect()
    }

    /// Names this module imports, regardless of source
    pub fn imported_names(&self) -> Vec<String> {
        self.imports
            .iter()
            .flat_map(|i| i.names.iter().cloned())
            .collect()
    }
}

/// The resolved project: modules keyed by absolute path plus their
/// topological order
#[derive(Debug)]
pub struct DependencyGraph {
    pub entry: PathBuf,
    pub modules: HashMap<PathBuf, Module>,
    /// Dependency-first order; the entry is always last
    pub order: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

impl DependencyGraph {
    pub fn entry_module(&self) -> &Module {
        &self.modules[&self.entry]
    }

    /// Paths of non-entry modules in topological order
    pub fn dependency_order(&self) -> impl Iterator<Item = &PathBuf> {
        self.order.iter().filter(move |p| **p != self.entry)
    }
}

/// Build the complete dependency graph starting from the entry point.
pub fn resolve(
    entry_path: &Path,
    provider: &dyn SyntaxProvider,
) -> BuildResult<DependencyGraph> {
    let entry = normalize_path(entry_path);

    let mut resolver = Resolver {
        provider,
        visited: HashSet::new(),
        visiting: HashSet::new(),
        stack: Vec::new(),
        modules: HashMap::new(),
        order: Vec::new(),
    };
    resolver.visit(&entry, None)?;

    let warnings = duplicate_export_warnings(&resolver.modules, &resolver.order);

    Ok(DependencyGraph {
        entry,
        modules: resolver.modules,
        order: resolver.order,
        warnings,
    })
}

struct Resolver<'a> {
    provider: &'a dyn SyntaxProvider,
    visited: HashSet<PathBuf>,
    visiting: HashSet<PathBuf>,
    stack: Vec<PathBuf>,
    modules: HashMap<PathBuf, Module>,
    order: Vec<PathBuf>,
}

impl Resolver<'_> {
    fn visit(
        &mut self,
        path: &PathBuf,
        from: Option<(&Path, &str, usize)>,
    ) -> BuildResult<()> {
        if self.visiting.contains(path) {
            let start = self
                .stack
                .iter()
                .position(|p| p == path)
                .unwrap_or(0);
            let mut cycle: Vec<PathBuf> = self.stack[start..].to_vec();
            cycle.push(path.clone());
            return Err(BundleError::CircularDependency { cycle });
        }

        if self.visited.contains(path) {
            return Ok(());
        }

        if !path.exists() {
            let (from_file, written, from_line) = match from {
                Some((f, w, l)) => (f.to_path_buf(), w.to_string(), l),
                None => (path.clone(), path.display().to_string(), 0),
            };
            return Err(BundleError::ModuleNotFound {
                import_path: written,
                from_file,
                from_line,
                available: sibling_pine_files(path),
            });
        }

        self.visiting.insert(path.clone());
        self.stack.push(path.clone());

        let module = parse_module(path, self.provider)?;
        let imports = module.imports.clone();
        self.modules.insert(path.clone(), module);

        for import in &imports {
            self.visit(
                &import.resolved,
                Some((path, &import.written_path, import.line)),
            )?;

            // The target is fully resolved now; check the requested names
            let target = &self.modules[&import.resolved];
            let exported = target.exported_names();
            for name in &import.names {
                if !exported.contains(name) {
                    return Err(BundleError::ExportNotFound {
                        name: name.clone(),
                        module_path: import.resolved.clone(),
                        from_file: path.clone(),
                        from_line: import.line,
                        available_exports: exported,
                    });
                }
            }
        }

        self.visiting.remove(path);
        self.stack.pop();
        self.visited.insert(path.clone());
        self.order.push(path.clone());
        Ok(())
    }
}

/// Read, scan, and parse one file into a [`Module`], validating that every
/// exported name has a top-level definition and that none of them is merely
/// re-exported from an import.
fn parse_module(path: &Path, provider: &dyn SyntaxProvider) -> BuildResult<Module> {
    let source = std::fs::read_to_string(path).map_err(|e| BundleError::io(path, e))?;

    // Raw-text pass first: directives live in comments the tree never sees
    let (export_directives, import_directives) = directives::scan(&source, path)?;
    let tree = provider.parse(path, &source)?;

    let dir = path.parent().unwrap_or(Path::new("."));
    let imports: Vec<ResolvedImport> = import_directives
        .iter()
        .map(|d| resolve_import(d, dir))
        .collect();

    let imported: HashSet<&String> = imports.iter().flat_map(|i| i.names.iter()).collect();

    let definitions: HashMap<&str, ExportKind> = tree
        .body
        .iter()
        .filter_map(|s| match &s.kind {
            StatementKind::FunctionDef { name } => Some((name.as_str(), ExportKind::Function)),
            StatementKind::VariableDef { name } => Some((name.as_str(), ExportKind::Variable)),
            _ => None,
        })
        .collect();

    let mut exports = Vec::new();
    for directive in &export_directives {
        for name in &directive.names {
            if imported.contains(name) {
                return Err(BundleError::DirectiveSyntax {
                    message: format!(
                        "\"{}\" is imported by this module; re-exporting is not supported, import it directly from its defining module",
                        name
                    ),
                    path: path.to_path_buf(),
                    line: directive.line,
                });
            }
            match definitions.get(name.as_str()) {
                Some(kind) => exports.push(ExportRecord {
                    name: name.clone(),
                    kind: *kind,
                    line: directive.line,
                }),
                None => {
                    return Err(BundleError::ExportedIdentifierNotFound {
                        name: name.clone(),
                        module_path: path.to_path_buf(),
                        export_line: directive.line,
                        available: tree.definition_names(),
                    })
                }
            }
        }
    }

    Ok(Module {
        path: path.to_path_buf(),
        source,
        tree,
        exports,
        imports,
    })
}

fn resolve_import(directive: &ImportDirective, importer_dir: &Path) -> ResolvedImport {
    ResolvedImport {
        names: directive.names.clone(),
        written_path: directive.from_path.clone(),
        resolved: normalize_path(&importer_dir.join(&directive.from_path)),
        line: directive.line,
    }
}

/// Up to five `.pine` files that do exist next to a missing import target
fn sibling_pine_files(missing: &Path) -> Vec<String> {
    let Some(dir) = missing.parent() else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".pine"))
        .collect();
    names.sort();
    names.truncate(5);
    names
}

/// Flag the same name exported by two unrelated modules; the first-discovery
/// order makes the pairing deterministic
fn duplicate_export_warnings(
    modules: &HashMap<PathBuf, Module>,
    order: &[PathBuf],
) -> Vec<Warning> {
    let mut first_owner: HashMap<String, &PathBuf> = HashMap::new();
    let mut warnings = Vec::new();

    for path in order {
        for export in &modules[path].exports {
            match first_owner.get(&export.name) {
                Some(first) => warnings.push(Warning::DuplicateExport {
                    name: export.name.clone(),
                    first: (*first).clone(),
                    second: path.clone(),
                }),
                None => {
                    first_owner.insert(export.name.clone(), path);
                }
            }
        }
    }

    warnings
}
