// Pinepack - PineScript Module Bundler
// Splits PineScript projects into modules and bundles them back into a single
// script that the TradingView editor accepts.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod directives;
pub mod emitter;
pub mod errors;
pub mod merger;
pub mod renamer;
pub mod resolver;
pub mod syntax;
pub mod watcher;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use bundler::{bundle, BundleResult};
pub use config::{load_config, PineConfig};
pub use errors::{BundleError, Warning};
pub use resolver::{resolve, DependencyGraph, Module};
pub use syntax::{PineProvider, SyntaxProvider, Tree};
