use crate::bundler::{self, BundleResult};
use crate::config::{self, PineConfig};
use crate::errors::BundleError;
use crate::watcher;
use crate::Result;
use colored::Colorize;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

pub fn run(config_path: Option<&Path>, watch: bool, copy: bool) -> Result<()> {
    let config = config::load_config(config_path)?;

    if watch {
        return run_watch(&config, copy);
    }

    let result = bundler::bundle(&config)?;
    bundler::write_bundle(&result)?;
    report_success(&config, &result);

    if copy {
        copy_to_clipboard(&result.output);
    }

    Ok(())
}

fn run_watch(config: &PineConfig, copy: bool) -> Result<()> {
    println!(
        "{}",
        format!("Watching for changes in {}...", config.src_dir().display()).cyan()
    );
    println!("Press Ctrl+C to stop.");
    println!();

    watcher::watch(config, |outcome| match outcome {
        Ok(result) => {
            report_success(config, &result);
            if copy {
                copy_to_clipboard(&result.output);
            }
        }
        Err(e) => report_failure(&e),
    })?;
    Ok(())
}

fn report_success(config: &PineConfig, result: &BundleResult) {
    for warning in &result.warnings {
        println!("{}", format!("⚠ {}", warning).yellow());
    }
    let noun = if result.modules_count == 1 {
        "module"
    } else {
        "modules"
    };
    println!(
        "{}",
        format!(
            "✓ Bundled {} {} → {}",
            result.modules_count,
            noun,
            display_path(config, &result.output_path)
        )
        .green()
    );
}

/// Watch-mode failures are printed rather than propagated so the loop
/// survives transient syntax errors while the user edits.
fn report_failure(error: &BundleError) {
    eprintln!("{}", format!("Error: {}", error).red());
}

fn display_path(config: &PineConfig, path: &Path) -> String {
    path.strip_prefix(&config.root_dir)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Copy text to the system clipboard by shelling out to the platform's
/// clipboard utility. A missing utility downgrades to a warning; the bundle
/// on disk is the primary artifact.
fn copy_to_clipboard(text: &str) {
    let candidates: &[(&str, &[&str])] = if cfg!(target_os = "macos") {
        &[("pbcopy", &[])]
    } else if cfg!(target_os = "windows") {
        &[("clip", &[])]
    } else {
        &[("wl-copy", &[]), ("xclip", &["-selection", "clipboard"])]
    };

    for (program, args) in candidates {
        if pipe_to(program, args, text) {
            println!("{}", "✓ Copied to clipboard".green());
            return;
        }
    }
    println!(
        "{}",
        "⚠ Could not copy to clipboard (no clipboard utility found)".yellow()
    );
}

fn pipe_to(program: &str, args: &[&str], text: &str) -> bool {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(_) => return false,
    };
    if let Some(stdin) = child.stdin.as_mut() {
        if stdin.write_all(text.as_bytes()).is_err() {
            return false;
        }
    }
    child.wait().map(|s| s.success()).unwrap_or(false)
}
