//! Emitter boundary
//!
//! Applies a fixed, enumerable list of pattern-keyed fixups for known
//! serialization defects before the output is written, and writes the
//! output atomically (temp-file-then-rename) so an aborted build never
//! leaves a corrupted file.

use crate::errors::{BuildResult, BundleError};
use regex::Regex;
use std::io::Write;
use std::path::Path;

/// One known serialization defect and its repair
struct Fixup {
    /// Stable identifier for the defect
    name: &'static str,
    /// Release that introduced the fixup
    since: &'static str,
    pattern: &'static str,
    replacement: &'static str,
}

/// Every fixup ever shipped, applied in order.
///
/// `generic-new-call`: serializers have emitted `array.new < type > args`
/// for `array.new<type>(args)` (same for `matrix.new`). The pattern only
/// matches the broken spacing with unparenthesized arguments, so correct
/// calls pass through untouched.
const FIXUPS: &[Fixup] = &[Fixup {
    name: "generic-new-call",
    since: "0.2.0",
    pattern: r"\b(array|matrix)\.new\s*<\s*([A-Za-z_][A-Za-z0-9_]*)\s*>\s*([^(\s][^\n]*)",
    replacement: "${1}.new<${2}>(${3})",
}];

/// Repair known serialization defects in the final output text.
pub fn apply_fixups(text: &str) -> String {
    let mut out = text.to_string();
    for fixup in FIXUPS {
        let re = Regex::new(fixup.pattern)
            .unwrap_or_else(|_| panic!("invalid pattern for fixup {}", fixup.name));
        out = re.replace_all(&out, fixup.replacement).into_owned();
    }
    out
}

/// Write the output atomically, creating the output directory if needed.
///
/// The content lands in a temp file next to the target and is renamed over
/// it, so a cancelled build leaves either the old file or the new one.
pub fn write_atomic(output_path: &Path, content: &str) -> BuildResult<()> {
    let dir = output_path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| BundleError::io(dir, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| BundleError::io(dir, e))?;
    temp.write_all(content.as_bytes())
        .map_err(|e| BundleError::io(output_path, e))?;
    temp.persist(output_path)
        .map_err(|e| BundleError::io(output_path, e.error))?;
    Ok(())
}
