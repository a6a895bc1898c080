//! Built-in statement-level Pine provider
//!
//! Pine is line-oriented: top-level statements start at column 0 and
//! indented lines continue the statement above them. The provider groups
//! lines into statements, classifies each one, and records identifier
//! occurrences with their usage context so the core can rename without
//! understanding expression syntax.
//!
//! Comment-only lines (including bundler directives) are dropped; trailing
//! comments stay inside their statement's raw text.

use crate::errors::BundleError;
use crate::syntax::{
    IdentContext, IdentSpan, LibraryRef, Statement, StatementKind, SyntaxProvider, Tree,
};
use regex::Regex;
use std::path::Path;

/// Words that never participate in renaming
const KEYWORDS: &[&str] = &[
    "and", "or", "not", "if", "else", "for", "to", "by", "while", "switch", "var", "varip",
    "const", "import", "export", "as", "method", "type", "enum", "true", "false", "na", "int",
    "float", "bool", "string", "color", "series", "simple",
];

pub struct PineProvider {
    func_re: Regex,
    decl_re: Regex,
    var_re: Regex,
    import_re: Regex,
}

impl PineProvider {
    pub fn new() -> Self {
        Self {
            // name(params) => — single-line header
            func_re: Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*=>")
                .expect("function pattern"),
            decl_re: Regex::new(r"^(indicator|strategy|library)\s*\(").expect("decl pattern"),
            // optional var/varip/const qualifier, optional type, then `name =`
            var_re: Regex::new(
                r"^(?:(?:var|varip|const)\s+)?(?:[A-Za-z_][A-Za-z0-9_.]*(?:<[^>]+>)?\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*=(?:[^=>]|$)",
            )
            .expect("variable pattern"),
            import_re: Regex::new(
                r"^import\s+([A-Za-z0-9_]+)/([A-Za-z0-9_]+)/(\d+)(?:\s+as\s+([A-Za-z_][A-Za-z0-9_]*))?\s*(?://.*)?$",
            )
            .expect("import pattern"),
        }
    }

    fn classify(&self, raw: &str, path: &Path, line: usize) -> Result<Statement, BundleError> {
        let first_line = raw.lines().next().unwrap_or(raw);

        if first_line.starts_with("import ") || first_line == "import" {
            let caps = self.import_re.captures(first_line).ok_or_else(|| {
                BundleError::Parse {
                    message: format!("malformed library import: {}", first_line),
                    path: path.to_path_buf(),
                    line: Some(line),
                }
            })?;
            let version: u32 = caps[3].parse().map_err(|_| BundleError::Parse {
                message: format!("invalid library version in: {}", first_line),
                path: path.to_path_buf(),
                line: Some(line),
            })?;
            return Ok(Statement {
                raw: raw.to_string(),
                kind: StatementKind::LibraryImport(LibraryRef {
                    namespace: caps[1].to_string(),
                    name: caps[2].to_string(),
                    version,
                    alias: caps.get(4).map(|m| m.as_str().to_string()),
                }),
                // library imports are hoisted verbatim, never renamed
                idents: Vec::new(),
                line,
            });
        }

        let mut def_span: Option<(usize, usize)> = None;
        let mut param_region: Option<(usize, usize)> = None;

        let kind = if self.decl_re.is_match(first_line) {
            StatementKind::Declaration
        } else if let Some(caps) = self.func_re.captures(first_line) {
            let name = caps.get(1).expect("name group");
            let params = caps.get(2).expect("params group");
            def_span = Some((name.start(), name.end()));
            param_region = Some((params.start(), params.end()));
            StatementKind::FunctionDef {
                name: name.as_str().to_string(),
            }
        } else if let Some(caps) = self.var_re.captures(first_line) {
            let name = caps.get(1).expect("name group");
            def_span = Some((name.start(), name.end()));
            StatementKind::VariableDef {
                name: name.as_str().to_string(),
            }
        } else {
            StatementKind::Other
        };

        let idents = tokenize(raw, def_span, param_region, path, line)?;

        Ok(Statement {
            raw: raw.to_string(),
            kind,
            idents,
            line,
        })
    }
}

impl Default for PineProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxProvider for PineProvider {
    fn parse(&self, path: &Path, source: &str) -> Result<Tree, BundleError> {
        let mut annotations: Vec<String> = Vec::new();
        let mut body: Vec<Statement> = Vec::new();
        let mut pending: Option<(Vec<String>, usize)> = None;
        let mut seen_statement = false;

        for (idx, text) in source.lines().enumerate() {
            let line_no = idx + 1;

            if text.trim().is_empty() {
                continue;
            }

            if text.starts_with(' ') || text.starts_with('\t') {
                match pending.as_mut() {
                    Some((lines, _)) => lines.push(text.to_string()),
                    None => {
                        return Err(BundleError::Parse {
                            message: "indented line without a preceding statement".to_string(),
                            path: path.to_path_buf(),
                            line: Some(line_no),
                        })
                    }
                }
                continue;
            }

            // Column 0: either a comment line or a new statement
            if text.starts_with("//") {
                if text.starts_with("//@") && !seen_statement {
                    annotations.push(text.to_string());
                }
                // directives and plain comments are not statements
                continue;
            }

            if let Some((lines, line)) = pending.take() {
                body.push(self.classify(&lines.join("\n"), path, line)?);
            }
            pending = Some((vec![text.to_string()], line_no));
            seen_statement = true;
        }

        if let Some((lines, line)) = pending.take() {
            body.push(self.classify(&lines.join("\n"), path, line)?);
        }

        Ok(Tree { annotations, body })
    }

    fn unparse(&self, tree: &Tree) -> String {
        let mut out = String::new();
        for annotation in &tree.annotations {
            out.push_str(annotation);
            out.push('\n');
        }
        for stmt in &tree.body {
            out.push_str(&stmt.raw);
            out.push('\n');
        }
        out
    }
}

/// Record identifier occurrences with usage contexts.
///
/// Skips string literals, comments, keywords, and member accesses
/// (identifiers preceded by `.`).
fn tokenize(
    raw: &str,
    def_span: Option<(usize, usize)>,
    param_region: Option<(usize, usize)>,
    path: &Path,
    line: usize,
) -> Result<Vec<IdentSpan>, BundleError> {
    let bytes = raw.as_bytes();
    let mut idents = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];

        // string literals
        if b == b'"' || b == b'\'' {
            let quote = b;
            let mut j = i + 1;
            loop {
                if j >= bytes.len() {
                    return Err(BundleError::Parse {
                        message: "unterminated string literal".to_string(),
                        path: path.to_path_buf(),
                        line: Some(line),
                    });
                }
                if bytes[j] == b'\\' {
                    j += 2;
                    continue;
                }
                if bytes[j] == quote {
                    break;
                }
                j += 1;
            }
            i = j + 1;
            continue;
        }

        // trailing comments run to end of line
        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        if b.is_ascii_alphabetic() || b == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let name = &raw[start..i];

            // member access (`ta.sma`) and keywords never rename
            let after_dot = start > 0 && bytes[start - 1] == b'.';
            if after_dot || KEYWORDS.contains(&name) {
                continue;
            }

            let context = if def_span == Some((start, start + name.len())) {
                IdentContext::Definition
            } else if in_region(param_region, start) {
                IdentContext::Write
            } else if is_assignment_target(bytes, i) {
                IdentContext::Write
            } else {
                IdentContext::Read
            };

            idents.push(IdentSpan {
                name: name.to_string(),
                start,
                context,
            });
            continue;
        }

        i += 1;
    }

    Ok(idents)
}

fn in_region(region: Option<(usize, usize)>, pos: usize) -> bool {
    matches!(region, Some((start, end)) if pos >= start && pos < end)
}

/// True when the identifier ending at `pos` is followed by `=` (but not
/// `==` / `=>`) or by `:=`
fn is_assignment_target(bytes: &[u8], mut pos: usize) -> bool {
    while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
        pos += 1;
    }
    match bytes.get(pos) {
        Some(b'=') => !matches!(bytes.get(pos + 1), Some(b'=') | Some(b'>')),
        Some(b':') => bytes.get(pos + 1) == Some(&b'='),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> Tree {
        PineProvider::new()
            .parse(&PathBuf::from("test.pine"), source)
            .unwrap()
    }

    #[test]
    fn test_groups_indented_continuations() {
        let tree = parse("double(x) =>\n    y = x * 2\n    y\nplot(close)\n");
        assert_eq!(tree.body.len(), 2);
        assert_eq!(tree.body[0].raw, "double(x) =>\n    y = x * 2\n    y");
        assert_eq!(tree.body[1].raw, "plot(close)");
        assert_eq!(tree.body[1].line, 4);
    }

    #[test]
    fn test_leading_annotations_collected() {
        let tree = parse("//@version=5\nindicator(\"Test\")\n");
        assert_eq!(tree.annotations, vec!["//@version=5"]);
        assert_eq!(tree.body[0].kind, StatementKind::Declaration);
    }

    #[test]
    fn test_comment_and_directive_lines_dropped() {
        let tree = parse("// @export double\n// plain comment\ndouble(x) =>\n    x * 2\n");
        assert_eq!(tree.body.len(), 1);
        assert!(tree.annotations.is_empty());
    }

    #[test]
    fn test_function_def_classification() {
        let tree = parse("double(x) =>\n    x * 2\n");
        assert_eq!(
            tree.body[0].kind,
            StatementKind::FunctionDef {
                name: "double".to_string()
            }
        );
        let def = &tree.body[0].idents[0];
        assert_eq!(def.name, "double");
        assert_eq!(def.context, IdentContext::Definition);
    }

    #[test]
    fn test_function_params_are_write_context() {
        let tree = parse("add(a, b) =>\n    a + b\n");
        let a_spans: Vec<_> = tree.body[0]
            .idents
            .iter()
            .filter(|s| s.name == "a")
            .collect();
        assert_eq!(a_spans[0].context, IdentContext::Write);
        assert_eq!(a_spans[1].context, IdentContext::Read);
    }

    #[test]
    fn test_variable_def_classification() {
        for source in ["calc = close", "var calc = close", "float calc = close"] {
            let tree = parse(source);
            assert_eq!(
                tree.body[0].kind,
                StatementKind::VariableDef {
                    name: "calc".to_string()
                },
                "source: {}",
                source
            );
        }
    }

    #[test]
    fn test_typed_generic_variable_def() {
        let tree = parse("var array<float> prices = array.new<float>(0)\n");
        assert_eq!(
            tree.body[0].kind,
            StatementKind::VariableDef {
                name: "prices".to_string()
            }
        );
    }

    #[test]
    fn test_reassignment_is_not_a_definition() {
        let tree = parse("x := x + 1\n");
        assert_eq!(tree.body[0].kind, StatementKind::Other);
        assert_eq!(tree.body[0].idents[0].context, IdentContext::Write);
        assert_eq!(tree.body[0].idents[1].context, IdentContext::Read);
    }

    #[test]
    fn test_named_arguments_are_write_context() {
        let tree = parse("plot(close, title = \"x\")\n");
        let title = tree.body[0]
            .idents
            .iter()
            .find(|s| s.name == "title")
            .unwrap();
        assert_eq!(title.context, IdentContext::Write);
    }

    #[test]
    fn test_comparison_is_read_context() {
        let tree = parse("y = a == b\n");
        let a = tree.body[0].idents.iter().find(|s| s.name == "a").unwrap();
        assert_eq!(a.context, IdentContext::Read);
    }

    #[test]
    fn test_member_access_not_recorded() {
        let tree = parse("y = ta.sma(close, 14)\n");
        assert!(tree.body[0].idents.iter().all(|s| s.name != "sma"));
        assert!(tree.body[0].idents.iter().any(|s| s.name == "ta"));
    }

    #[test]
    fn test_string_contents_not_scanned() {
        let tree = parse("msg = \"double trouble\"\n");
        assert!(tree.body[0].idents.iter().all(|s| s.name != "double"));
    }

    #[test]
    fn test_trailing_comment_not_scanned() {
        let tree = parse("x = close // uses double\n");
        assert!(tree.body[0].idents.iter().all(|s| s.name != "double"));
    }

    #[test]
    fn test_library_import_parsed() {
        let tree = parse("import TradingView/ta/9 as t\n");
        assert_eq!(
            tree.body[0].kind,
            StatementKind::LibraryImport(LibraryRef {
                namespace: "TradingView".to_string(),
                name: "ta".to_string(),
                version: 9,
                alias: Some("t".to_string()),
            })
        );
        assert!(tree.body[0].idents.is_empty());
    }

    #[test]
    fn test_library_import_without_alias() {
        let tree = parse("import TradingView/ta/9\n");
        match &tree.body[0].kind {
            StatementKind::LibraryImport(lib) => assert_eq!(lib.alias, None),
            other => panic!("expected LibraryImport, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_library_import_fails() {
        let err = PineProvider::new()
            .parse(&PathBuf::from("test.pine"), "import TradingView/ta\n")
            .unwrap_err();
        assert!(matches!(err, BundleError::Parse { .. }));
    }

    #[test]
    fn test_indented_first_line_fails() {
        let err = PineProvider::new()
            .parse(&PathBuf::from("test.pine"), "    x = 1\n")
            .unwrap_err();
        match err {
            BundleError::Parse { line, .. } => assert_eq!(line, Some(1)),
            other => panic!("expected Parse, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_string_fails() {
        let err = PineProvider::new()
            .parse(&PathBuf::from("test.pine"), "msg = \"oops\n")
            .unwrap_err();
        assert!(matches!(err, BundleError::Parse { .. }));
    }

    #[test]
    fn test_unparse_round_trips_statements() {
        let source = "//@version=5\nindicator(\"Test\")\nx = close\nplot(x)\n";
        let provider = PineProvider::new();
        let tree = provider.parse(&PathBuf::from("test.pine"), source).unwrap();
        assert_eq!(provider.unparse(&tree), source);
    }
}
