//! Syntax provider boundary
//!
//! The bundler core never inspects Pine syntax beyond a flat statement list
//! with two mutation capabilities: rename a definition's name, and rename a
//! read-context reference. Everything else about a statement is opaque raw
//! text owned by the provider that produced it.

pub mod pine;

pub use pine::PineProvider;

use crate::errors::BundleError;
use std::collections::HashMap;
use std::path::Path;

/// Parses source text into a [`Tree`] and serializes one back.
pub trait SyntaxProvider {
    /// Parse a whole file. Failures surface as [`BundleError::Parse`] with
    /// the file and, where derivable, a line number.
    fn parse(&self, path: &Path, source: &str) -> Result<Tree, BundleError>;

    /// Serialize a tree back to source text.
    fn unparse(&self, tree: &Tree) -> String;
}

/// How an identifier occurrence is used within its statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentContext {
    /// The name a top-level definition introduces
    Definition,
    /// Assignment target, reassignment target, loop variable, named-argument
    /// key, or function parameter — never renamed
    Write,
    /// Everything else; the only context import renaming applies to
    Read,
}

/// One identifier occurrence, located by byte offset into its statement's
/// raw text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentSpan {
    pub name: String,
    pub start: usize,
    pub context: IdentContext,
}

/// A pre-published library reference (`import NS/name/version [as alias]`).
///
/// Identity for deduplication is (namespace, name, version); the alias is
/// cosmetic and the first-seen one wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryRef {
    pub namespace: String,
    pub name: String,
    pub version: u32,
    pub alias: Option<String>,
}

impl LibraryRef {
    /// Dedup key: exact target identity, alias excluded
    pub fn target(&self) -> (&str, &str, u32) {
        (&self.namespace, &self.name, self.version)
    }
}

/// What kind of top-level statement this is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `name(params) =>` function definition
    FunctionDef { name: String },
    /// `x = …`, optionally `var`/`varip`/`const`-qualified and typed
    VariableDef { name: String },
    /// `indicator(…)` / `strategy(…)` / `library(…)` registration call
    Declaration,
    /// External library import
    LibraryImport(LibraryRef),
    /// A comment-only statement (source-boundary markers from the merger)
    Comment,
    Other,
}

/// One top-level statement, possibly spanning continuation lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Raw source text, continuation lines joined with `\n`
    pub raw: String,
    pub kind: StatementKind,
    /// Identifier occurrences in offset order
    pub idents: Vec<IdentSpan>,
    /// 1-indexed line of the statement's first line in its source file
    pub line: usize,
}

impl Statement {
    /// A cosmetic comment statement; carries no identifiers and never
    /// alters semantics
    pub fn comment(text: impl Into<String>) -> Self {
        Statement {
            raw: text.into(),
            kind: StatementKind::Comment,
            idents: Vec::new(),
            line: 0,
        }
    }

    /// The name this statement defines, if it is a definition
    pub fn defined_name(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::FunctionDef { name } | StatementKind::VariableDef { name } => {
                Some(name)
            }
            _ => None,
        }
    }

    /// Rewrite identifier occurrences selected by `select`, splicing new
    /// names into the raw text and refreshing every span offset in one pass.
    fn rename_idents<F>(&mut self, mut select: F)
    where
        F: FnMut(&IdentSpan) -> Option<String>,
    {
        if self.idents.is_empty() {
            return;
        }

        let mut out = String::with_capacity(self.raw.len());
        let mut new_idents = Vec::with_capacity(self.idents.len());
        let mut cursor = 0usize;

        for span in &self.idents {
            out.push_str(&self.raw[cursor..span.start]);
            cursor = span.start + span.name.len();

            let name = select(span).unwrap_or_else(|| span.name.clone());
            let start = out.len();
            out.push_str(&name);

            if span.context == IdentContext::Definition && name != span.name {
                match &mut self.kind {
                    StatementKind::FunctionDef { name: n }
                    | StatementKind::VariableDef { name: n } => *n = name.clone(),
                    _ => {}
                }
            }

            new_idents.push(IdentSpan {
                name,
                start,
                context: span.context,
            });
        }

        out.push_str(&self.raw[cursor..]);
        self.raw = out;
        self.idents = new_idents;
    }
}

/// A parsed file: leading annotations plus a flat statement list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    /// Leading `//@…` compiler annotation lines (e.g. `//@version=5`)
    pub annotations: Vec<String>,
    pub body: Vec<Statement>,
}

impl Tree {
    /// Rewrite every definition whose name appears in `renames`.
    ///
    /// Acts only on names present in the map, never on textual identity, so
    /// reapplying an already-applied map is a no-op.
    pub fn rename_definitions(&mut self, renames: &HashMap<String, String>) {
        for stmt in &mut self.body {
            stmt.rename_idents(|span| {
                if span.context == IdentContext::Definition {
                    renames.get(&span.name).cloned()
                } else {
                    None
                }
            });
        }
    }

    /// Rewrite every read-context reference whose name appears in `renames`.
    ///
    /// Write-context occurrences (local declarations, parameters, named
    /// arguments) are never touched, so a local declaration sharing an
    /// imported name keeps its bare name.
    pub fn rename_references(&mut self, renames: &HashMap<String, String>) {
        for stmt in &mut self.body {
            stmt.rename_idents(|span| {
                if span.context == IdentContext::Read {
                    renames.get(&span.name).cloned()
                } else {
                    None
                }
            });
        }
    }

    /// All top-level definition names, in statement order
    pub fn definition_names(&self) -> Vec<String> {
        self.body
            .iter()
            .filter_map(|s| s.defined_name().map(str::to_string))
            .collect()
    }
}
