use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    matcher::FileMatcher,
    models::{ItemSource, WorkItem},
    processing_queue::QueueHandle,
};

/// Watches one directory (not its subdirectories) and queues new
/// screenshots. Watching stops when this is dropped.
pub struct DirectoryWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl DirectoryWatcher {
    pub fn start(
        dir: &Path,
        matcher: FileMatcher,
        queue: QueueHandle,
        debounce: Duration,
    ) -> Result<Self, notify::Error> {
        let watched_dir = dir.to_path_buf();

        // Debouncing waits for the screenshot tool to finish writing
        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let mut seen = HashSet::new();
                    for event in events {
                        for path in created_paths(&event.event) {
                            if seen.insert(path.clone())
                                && is_candidate(&path, &watched_dir, &matcher)
                            {
                                queue.enqueue(WorkItem::new(path, ItemSource::Watcher));
                            }
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        warn!(error = %error, "Watcher error");
                    }
                }
            }
        })?;

        debouncer.watch(dir, RecursiveMode::NonRecursive)?;
        info!(dir = %dir.display(), "Watching for new screenshots");

        Ok(Self {
            _debouncer: debouncer,
        })
    }
}

/// Paths that just appeared: plain creations, plus files renamed or moved
/// into the directory (macOS writes screenshots to a temp name first).
pub fn created_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.clone()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().cloned().into_iter().collect()
        }
        // FSEvents cannot tell the two ends of a rename apart; the side
        // still on disk is the one that arrived
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event
            .paths
            .iter()
            .filter(|path| path.exists())
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

fn is_candidate(path: &Path, watched_dir: &Path, matcher: &FileMatcher) -> bool {
    if path.is_symlink() || !path.is_file() {
        return false;
    }

    // Only direct children of the watched directory
    if path.parent() != Some(watched_dir) {
        debug!(path = %path.display(), "Ignoring file outside watched directory");
        return false;
    }

    matcher.matches(path)
}
