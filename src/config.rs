//! Project configuration
//!
//! Loads and validates `pine.config.json`. Paths are resolved relative to
//! the config file's directory; unknown fields are ignored.

use crate::errors::{BuildResult, BundleError};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

pub const CONFIG_FILENAME: &str = "pine.config.json";

/// On-disk shape of `pine.config.json`
#[derive(Debug, Deserialize)]
struct RawConfig {
    entry: String,
    output: String,
}

/// Validated project configuration with absolute paths
#[derive(Debug, Clone)]
pub struct PineConfig {
    /// Entry point `.pine` file
    pub entry: PathBuf,
    /// Bundled output file
    pub output: PathBuf,
    /// Project root (the config file's directory)
    pub root_dir: PathBuf,
}

impl PineConfig {
    /// Directory containing the entry file; watch mode observes this tree
    pub fn src_dir(&self) -> &Path {
        self.entry.parent().unwrap_or(Path::new("."))
    }
}

/// Load and validate configuration.
///
/// Searches the current directory for `pine.config.json` when no explicit
/// path is given.
pub fn load_config(config_path: Option<&Path>) -> BuildResult<PineConfig> {
    let config_path = match config_path {
        Some(p) => p.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().map_err(|e| BundleError::io(".", e))?;
            cwd.join(CONFIG_FILENAME)
        }
    };

    if !config_path.exists() {
        return Err(BundleError::Config {
            message: format!(
                "config file not found; create a {} file with \"entry\" and \"output\" fields",
                CONFIG_FILENAME
            ),
            path: config_path,
        });
    }

    let text = std::fs::read_to_string(&config_path)
        .map_err(|e| BundleError::io(&config_path, e))?;

    let raw: RawConfig = serde_json::from_str(&text).map_err(|e| BundleError::Config {
        message: format!("invalid JSON: {}", e),
        path: config_path.clone(),
    })?;

    let root_dir = config_path
        .parent()
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let root_dir = root_dir
        .canonicalize()
        .map_err(|e| BundleError::io(&root_dir, e))?;

    let entry = normalize_path(&root_dir.join(&raw.entry));
    let output = normalize_path(&root_dir.join(&raw.output));

    if !entry.exists() {
        return Err(BundleError::Config {
            message: format!("entry file not found: {}", raw.entry),
            path: config_path,
        });
    }

    if entry.extension().map_or(true, |ext| ext != "pine") {
        return Err(BundleError::Config {
            message: format!("entry file must be a .pine file: {}", raw.entry),
            path: config_path,
        });
    }

    Ok(PineConfig {
        entry,
        output,
        root_dir,
    })
}

/// Lexically normalize a path, resolving `.` and `..` components without
/// touching the filesystem (the target may not exist yet).
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}
