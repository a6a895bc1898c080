//! Watch mode
//!
//! Watches the project root for filesystem events, coalesces bursts (editors
//! tend to fire several events per save), and rebuilds once per burst. Build
//! failures are reported through the callback and never stop the watch loop.

use crate::bundler::{self, BundleResult};
use crate::config::{normalize_path, PineConfig};
use crate::errors::{BuildResult, BundleError};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

/// How long to keep draining events after the first one arrives
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watch the project and rebuild on every relevant change.
///
/// `on_result` receives the outcome of each rebuild, including the initial
/// one performed before the loop starts. The function only returns if the
/// watcher backend itself fails.
pub fn watch(
    config: &PineConfig,
    mut on_result: impl FnMut(BuildResult<BundleResult>),
) -> BuildResult<()> {
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();

    let mut watcher: RecommendedWatcher = notify::recommended_watcher(tx)
        .map_err(|e| watch_error(&config.root_dir, e))?;
    watcher
        .watch(&config.root_dir, RecursiveMode::Recursive)
        .map_err(|e| watch_error(&config.root_dir, e))?;

    on_result(bundler::bundle(config).and_then(write_through));

    let output = normalize_path(&config.output);
    loop {
        let first = match rx.recv() {
            Ok(event) => event,
            // all senders dropped, the watcher backend is gone
            Err(_) => return Ok(()),
        };

        let mut relevant = event_touches_source(&first, &output);
        while let Ok(event) = rx.recv_timeout(DEBOUNCE) {
            relevant |= event_touches_source(&event, &output);
        }
        if !relevant {
            continue;
        }

        on_result(bundler::bundle(config).and_then(write_through));
    }
}

fn write_through(result: BundleResult) -> BuildResult<BundleResult> {
    bundler::write_bundle(&result)?;
    Ok(result)
}

/// A burst is worth a rebuild when it touches a `.pine` file other than the
/// bundle output itself. Writing the output must not retrigger the loop.
fn event_touches_source(event: &notify::Result<Event>, output: &Path) -> bool {
    let event = match event {
        Ok(event) => event,
        // backend hiccup; rebuild to be safe
        Err(_) => return true,
    };
    event.paths.iter().any(|p| is_source_file(p, output))
}

fn is_source_file(path: &Path, output: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "pine") && normalize_path(path) != *output
}

fn watch_error(root: &Path, source: notify::Error) -> BundleError {
    BundleError::Config {
        message: format!("failed to watch directory: {}", source),
        path: root.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn event_for(paths: Vec<PathBuf>) -> notify::Result<Event> {
        let mut event = Event::new(notify::EventKind::Modify(
            notify::event::ModifyKind::Any,
        ));
        event.paths = paths;
        Ok(event)
    }

    #[test]
    fn test_pine_file_triggers_rebuild() {
        let output = PathBuf::from("/project/dist/bundle.pine");
        let event = event_for(vec![PathBuf::from("/project/src/utils.pine")]);
        assert!(event_touches_source(&event, &output));
    }

    #[test]
    fn test_output_file_is_ignored() {
        let output = PathBuf::from("/project/dist/bundle.pine");
        let event = event_for(vec![PathBuf::from("/project/dist/bundle.pine")]);
        assert!(!event_touches_source(&event, &output));
    }

    #[test]
    fn test_non_pine_files_are_ignored() {
        let output = PathBuf::from("/project/dist/bundle.pine");
        let event = event_for(vec![
            PathBuf::from("/project/README.md"),
            PathBuf::from("/project/.git/index"),
        ]);
        assert!(!event_touches_source(&event, &output));
    }

    #[test]
    fn test_mixed_burst_counts_as_relevant() {
        let output = PathBuf::from("/project/dist/bundle.pine");
        let event = event_for(vec![
            PathBuf::from("/project/README.md"),
            PathBuf::from("/project/main.pine"),
        ]);
        assert!(event_touches_source(&event, &output));
    }
}
