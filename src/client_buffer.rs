//! Per-file debounce state implementing the update-rate limiter: at most
//! one upload per file per `updatemax` seconds while edits keep arriving,
//! and the entry decays one interval after they stop.
//!
//! `now` is passed in rather than read internally so the state machine is
//! exercised deterministically in tests without real sleeps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

struct Entry {
    last_updated: Instant,
    pending: bool,
}

#[derive(Default)]
pub struct UpdateBuffer {
    entries: HashMap<PathBuf, Entry>,
}

impl UpdateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a Modified event for `abs_path`. Returns `true` if the
    /// caller should upload the file immediately (the file was not already
    /// being tracked); otherwise the entry is simply marked dirty.
    pub fn on_modify(&mut self, now: Instant, abs_path: PathBuf) -> bool {
        match self.entries.get_mut(&abs_path) {
            Some(entry) => {
                entry.pending = true;
                false
            }
            None => {
                self.entries.insert(
                    abs_path,
                    Entry {
                        last_updated: now,
                        pending: false,
                    },
                );
                true
            }
        }
    }

    /// Drops any tracked entry for `abs_path` (delete of the key).
    pub fn remove(&mut self, abs_path: &Path) {
        self.entries.remove(abs_path);
    }

    /// Moves an entry from `old` to `new`, preserving its state, if one
    /// exists (rename of the key).
    pub fn rename(&mut self, old: &Path, new: PathBuf) {
        if let Some(entry) = self.entries.remove(old) {
            self.entries.insert(new, entry);
        }
    }

    /// Scans all entries at `now`; returns the paths due for a flushed
    /// upload, refreshing their `last_updated`/`pending` state in place.
    /// Entries past `updatemax` with nothing pending are removed (idle
    /// decay).
    pub fn tick(&mut self, now: Instant, updatemax: Duration) -> Vec<PathBuf> {
        let mut due_upload = Vec::new();
        let mut due_remove = Vec::new();

        for (path, entry) in self.entries.iter_mut() {
            if now.saturating_duration_since(entry.last_updated) >= updatemax {
                if entry.pending {
                    entry.last_updated = now;
                    entry.pending = false;
                    due_upload.push(path.clone());
                } else {
                    due_remove.push(path.clone());
                }
            }
        }

        for path in &due_remove {
            self.entries.remove(path);
        }

        due_upload
    }

    #[cfg(test)]
    fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }
}
