//! Pipeline orchestration
//!
//! One synchronous pass per build invocation: resolve → rename → merge →
//! fix up. Each run owns a fresh graph; nothing is shared between runs, so
//! watch-mode rebuilds and successive invocations cannot leak state.

use crate::config::PineConfig;
use crate::emitter;
use crate::errors::{BuildResult, Warning};
use crate::merger;
use crate::renamer;
use crate::resolver;
use crate::syntax::{PineProvider, SyntaxProvider};
use std::path::PathBuf;

/// Result of a successful bundling run
#[derive(Debug)]
pub struct BundleResult {
    /// The final program text
    pub output: String,
    pub modules_count: usize,
    pub entry_path: PathBuf,
    pub output_path: PathBuf,
    pub warnings: Vec<Warning>,
}

/// Bundle the project with the built-in Pine provider.
pub fn bundle(config: &PineConfig) -> BuildResult<BundleResult> {
    bundle_with(config, &PineProvider::new())
}

/// Bundle the project with an explicit syntax provider.
pub fn bundle_with(
    config: &PineConfig,
    provider: &dyn SyntaxProvider,
) -> BuildResult<BundleResult> {
    let mut graph = resolver::resolve(&config.entry, provider)?;

    let module_renames = renamer::build_module_renames(&graph, &config.root_dir)?;
    renamer::apply_renames(&mut graph, &module_renames);

    let merged = merger::merge(&graph);
    let output = emitter::apply_fixups(&provider.unparse(&merged));

    Ok(BundleResult {
        output,
        modules_count: graph.modules.len(),
        entry_path: config.entry.clone(),
        output_path: config.output.clone(),
        warnings: graph.warnings,
    })
}

/// Write a bundle result to its output path atomically.
pub fn write_bundle(result: &BundleResult) -> BuildResult<()> {
    emitter::write_atomic(&result.output_path, &result.output)
}
