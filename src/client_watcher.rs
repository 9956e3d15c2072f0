//! Binds the `notify` crate to the raw event shapes the classifier expects.
//! The watcher's own callback runs on a thread owned by `notify`, never on
//! the tokio executor; it only ever does a blocking send into a bounded
//! channel, so the main loop is the sole place raw events are interpreted.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::client_events::RawEvent;

/// Keeps the underlying `notify` watcher alive for as long as this handle is
/// held; dropping it stops delivery.
pub struct WatcherHandle {
    _watcher: RecommendedWatcher,
}

/// Starts watching `root` recursively, forwarding classified raw events into
/// a bounded channel of capacity `buffer`.
pub fn watch(root: &Path, buffer: usize) -> Result<(WatcherHandle, mpsc::Receiver<RawEvent>)> {
    let (tx, rx) = mpsc::channel(buffer);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let event = match res {
            Ok(event) => event,
            Err(_) => return,
        };
        for raw in split_event(event) {
            // Best-effort: if the main loop is gone (shutting down) or the
            // bounded channel is momentarily full, drop rather than block
            // the notify delivery thread indefinitely.
            let _ = tx.blocking_send(raw);
        }
    })
    .context("create filesystem watcher")?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("watch {}", root.display()))?;

    Ok((WatcherHandle { _watcher: watcher }, rx))
}

/// Converts one `notify::Event` (which may batch several paths, e.g. a
/// rename with two paths) into zero or more of our raw event shapes.
/// `notify` doesn't report directory-ness uniformly, so it's recomputed via
/// a metadata stat — best-effort (a path that's already gone by the time we
/// stat it, e.g. a delete, is treated as a file since `is_directory` is
/// irrelevant for the Deleted arm).
fn split_event(event: Event) -> Vec<RawEvent> {
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .into_iter()
            .map(|path| {
                let is_directory = path.is_dir();
                RawEvent::Created { path, is_directory }
            })
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .into_iter()
            .map(|path| RawEvent::Deleted { path })
            .collect(),
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => rename_pair(event.paths),
        EventKind::Modify(_) => event
            .paths
            .into_iter()
            .map(|path| {
                let is_directory = path.is_dir();
                RawEvent::Modified { path, is_directory }
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn rename_pair(mut paths: Vec<PathBuf>) -> Vec<RawEvent> {
    if paths.len() >= 2 {
        let dest = paths.pop().unwrap();
        let src = paths.pop().unwrap();
        vec![RawEvent::Moved { src, dest }]
    } else {
        // Only the "from" half of a move arrived (platform-dependent);
        // the safest classification is a delete.
        paths
            .into_iter()
            .map(|path| RawEvent::Deleted { path })
            .collect()
    }
}
