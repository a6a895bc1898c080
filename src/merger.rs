//! Statement merging
//!
//! Concatenates the rewritten trees in dependency order into one tree:
//! entry annotations first, then the entry's declaration statement, then
//! external library imports deduplicated by exact target identity, then
//! each dependency module's statements behind a source-boundary marker,
//! then the entry's remaining statements.

use crate::resolver::DependencyGraph;
use crate::syntax::{Statement, StatementKind, Tree};
use std::collections::HashSet;
use std::path::Path;

const DEFAULT_VERSION: &str = "//@version=5";

/// Merge the graph's rewritten trees into a single output tree.
///
/// Only call after renaming; the statement order is the graph's topological
/// order with the entry last.
pub fn merge(graph: &DependencyGraph) -> Tree {
    assert!(!graph.order.is_empty(), "merge called with no modules");

    let entry = graph.entry_module();
    let mut body: Vec<Statement> = Vec::new();

    // (a) version/mode annotations come from the entry alone
    let annotations = if entry.tree.annotations.is_empty() {
        vec![DEFAULT_VERSION.to_string()]
    } else {
        entry.tree.annotations.clone()
    };

    // (b) indicator/strategy/library registration stays at the top
    if let Some(declaration) = entry
        .tree
        .body
        .iter()
        .find(|s| s.kind == StatementKind::Declaration)
    {
        body.push(declaration.clone());
    }

    // (c) external library imports, hoisted from every module, first-seen
    // order, one statement per target regardless of request count
    let mut seen_libraries: HashSet<(String, String, u32)> = HashSet::new();
    for path in &graph.order {
        for stmt in &graph.modules[path].tree.body {
            if let StatementKind::LibraryImport(lib) = &stmt.kind {
                let key = (lib.namespace.clone(), lib.name.clone(), lib.version);
                if seen_libraries.insert(key) {
                    body.push(stmt.clone());
                }
            }
        }
    }

    // (d) dependency modules in topological order behind boundary markers
    let dependencies: Vec<_> = graph.dependency_order().collect();
    if !dependencies.is_empty() {
        body.push(Statement::comment("// --- Bundled modules ---"));
        for path in dependencies {
            body.push(Statement::comment(format!(
                "// --- From: {} ---",
                file_name(path)
            )));
            for stmt in &graph.modules[path].tree.body {
                if emitted_in_place(stmt) {
                    body.push(stmt.clone());
                }
            }
        }
    }

    // (e) entry statements, declaration and imports already hoisted
    body.push(Statement::comment("// --- Main ---"));
    for stmt in &entry.tree.body {
        if emitted_in_place(stmt) && stmt.kind != StatementKind::Declaration {
            body.push(stmt.clone());
        }
    }

    Tree { annotations, body }
}

/// Library imports are hoisted, so every module skips them in place
fn emitted_in_place(stmt: &Statement) -> bool {
    !matches!(stmt.kind, StatementKind::LibraryImport(_))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve;
    use crate::syntax::{PineProvider, SyntaxProvider};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn merged_output(entry: &Path) -> String {
        let provider = PineProvider::new();
        let graph = resolve(&entry.canonicalize().unwrap(), &provider).unwrap();
        provider.unparse(&merge(&graph))
    }

    #[test]
    fn test_version_annotation_first() {
        let temp = TempDir::new().unwrap();
        let entry = write(
            temp.path(),
            "main.pine",
            "//@version=6\nindicator(\"T\")\nplot(close)\n",
        );
        let output = merged_output(&entry);
        assert!(output.starts_with("//@version=6\n"));
    }

    #[test]
    fn test_default_version_when_entry_has_none() {
        let temp = TempDir::new().unwrap();
        let entry = write(temp.path(), "main.pine", "indicator(\"T\")\nplot(close)\n");
        let output = merged_output(&entry);
        assert!(output.starts_with("//@version=5\n"));
    }

    #[test]
    fn test_declaration_right_after_annotations() {
        let temp = TempDir::new().unwrap();
        let entry = write(
            temp.path(),
            "main.pine",
            "//@version=5\nx = close\nindicator(\"T\")\nplot(x)\n",
        );
        let output = merged_output(&entry);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "//@version=5");
        assert_eq!(lines[1], "indicator(\"T\")");
    }

    #[test]
    fn test_boundary_markers_and_order() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "utils.pine",
            "// @export double\ndouble(x) =>\n    x * 2\n",
        );
        let entry = write(
            temp.path(),
            "main.pine",
            "// @import { double } from \"./utils.pine\"\nindicator(\"T\")\nplot(double(close))\n",
        );
        let output = merged_output(&entry);

        let bundled = output.find("// --- Bundled modules ---").unwrap();
        let from = output.find("// --- From: utils.pine ---").unwrap();
        let main = output.find("// --- Main ---").unwrap();
        assert!(bundled < from && from < main);
    }

    #[test]
    fn test_external_imports_deduplicated_and_hoisted() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "a.pine",
            "import TradingView/ta/9 as ta\n// @export fa\nfa(x) =>\n    ta.sma(x, 3)\n",
        );
        write(
            temp.path(),
            "b.pine",
            "import TradingView/ta/9\n// @export fb\nfb(x) =>\n    ta.sma(x, 5)\n",
        );
        let entry = write(
            temp.path(),
            "main.pine",
            "import TradingView/ta/9 as ta\n// @import { fa } from \"./a.pine\"\n// @import { fb } from \"./b.pine\"\nindicator(\"T\")\nplot(fa(close) + fb(close))\n",
        );
        let output = merged_output(&entry);

        let count = output.matches("import TradingView/ta/9").count();
        assert_eq!(count, 1);

        // hoisted before any dependency module statements; first-seen
        // carries the alias
        let import_pos = output.find("import TradingView/ta/9 as ta").unwrap();
        let bundled_pos = output.find("// --- Bundled modules ---").unwrap();
        assert!(import_pos < bundled_pos);
    }

    #[test]
    fn test_different_versions_kept_separate() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "a.pine",
            "import TradingView/ta/8\n// @export fa\nfa(x) =>\n    x\n",
        );
        let entry = write(
            temp.path(),
            "main.pine",
            "import TradingView/ta/9\n// @import { fa } from \"./a.pine\"\nindicator(\"T\")\nplot(fa(close))\n",
        );
        let output = merged_output(&entry);
        assert!(output.contains("import TradingView/ta/9"));
        assert!(output.contains("import TradingView/ta/8"));
    }

    #[test]
    fn test_single_module_has_no_bundled_section() {
        let temp = TempDir::new().unwrap();
        let entry = write(
            temp.path(),
            "main.pine",
            "//@version=5\nindicator(\"T\")\nx = close\nplot(x)\n",
        );
        let output = merged_output(&entry);
        assert!(!output.contains("// --- Bundled modules ---"));
        assert!(output.contains("// --- Main ---"));
        assert!(output.contains("x = close"));
        assert!(output.contains("plot(x)"));
    }
}
