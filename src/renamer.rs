//! Identifier resolution and renaming
//!
//! Each non-entry module gets a prefix derived from its project-relative
//! path; every exported name is rewritten to its prefixed form in the
//! defining module (definition and internal references), and every importer
//! has its read-context references to imported names rewritten to the same
//! prefixed form. Entry statements are emitted unrenamed.

use crate::errors::{BuildResult, BundleError};
use crate::resolver::DependencyGraph;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Per-module mapping from original exported name to its globally unique
/// prefixed form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    map: HashMap<String, String>,
}

impl RenameMap {
    pub fn get(&self, name: &str) -> Option<&String> {
        self.map.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.map
    }
}

/// Derive the namespace prefix for a module.
///
/// The project-relative path is taken, a leading `src` component dropped,
/// the extension stripped, components joined with `_`, non-identifier
/// characters sanitized to `_`, and the result wrapped in double
/// underscores: `src/utils/math.pine` → `__utils_math__`.
pub fn path_to_prefix(path: &Path, root_dir: &Path) -> String {
    let rel = path.strip_prefix(root_dir).unwrap_or(match path.file_name() {
        Some(name) => Path::new(name),
        None => path,
    });

    let mut parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if parts.first().map(String::as_str) == Some("src") {
        parts.remove(0);
    }

    if let Some(last) = parts.last_mut() {
        if let Some(stem) = Path::new(last.as_str())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
        {
            *last = stem;
        }
    }

    let joined: String = parts
        .join("_")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    format!("__{}__", joined)
}

/// Build one [`RenameMap`] per non-entry module, failing when two modules'
/// prefixes collide (the output would merge their namespaces).
pub fn build_module_renames(
    graph: &DependencyGraph,
    root_dir: &Path,
) -> BuildResult<HashMap<PathBuf, RenameMap>> {
    let mut prefixes: HashMap<String, &PathBuf> = HashMap::new();
    let mut renames = HashMap::new();

    for path in graph.dependency_order() {
        let prefix = path_to_prefix(path, root_dir);

        if let Some(existing) = prefixes.get(&prefix) {
            return Err(BundleError::Config {
                message: format!(
                    "modules {} and {} both map to namespace prefix \"{}\"; rename one file",
                    existing.display(),
                    path.display(),
                    prefix
                ),
                path: path.clone(),
            });
        }
        prefixes.insert(prefix.clone(), path);

        let module = &graph.modules[path];
        let map: HashMap<String, String> = module
            .exports
            .iter()
            .map(|e| (e.name.clone(), format!("{}{}", prefix, e.name)))
            .collect();
        renames.insert(path.clone(), RenameMap { map });
    }

    Ok(renames)
}

/// Rewrite every module's tree in place.
///
/// Two passes per the stated shadowing rule: a module's own exports are
/// renamed at their definitions and internal read references; each
/// importer's read references to imported names become the target's
/// prefixed form, while same-named local declarations keep their bare name.
pub fn apply_renames(graph: &mut DependencyGraph, module_renames: &HashMap<PathBuf, RenameMap>) {
    for (path, renames) in module_renames {
        if renames.is_empty() {
            continue;
        }
        if let Some(module) = graph.modules.get_mut(path) {
            module.tree.rename_definitions(renames.as_map());
            module.tree.rename_references(renames.as_map());
        }
    }

    let order = graph.order.clone();
    for path in &order {
        let import_map = import_renames_for(graph, path, module_renames);
        if import_map.is_empty() {
            continue;
        }
        if let Some(module) = graph.modules.get_mut(path) {
            module.tree.rename_references(&import_map);
        }
    }
}

/// The reference rewrites one importer needs: imported name → the target
/// module's prefixed form
fn import_renames_for(
    graph: &DependencyGraph,
    importer: &PathBuf,
    module_renames: &HashMap<PathBuf, RenameMap>,
) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Some(module) = graph.modules.get(importer) else {
        return map;
    };

    for import in &module.imports {
        let Some(target_map) = module_renames.get(&import.resolved) else {
            continue;
        };
        for name in &import.names {
            if let Some(renamed) = target_map.get(name) {
                map.insert(name.clone(), renamed.clone());
            }
        }
    }

    map
}
