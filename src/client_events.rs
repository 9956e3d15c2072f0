//! Maps raw filesystem events to the five synchronisation actions, per the
//! event classifier table: created directories are mirrored immediately,
//! created files are dropped (a Modified always follows), deletes and
//! renames carry the update-buffer housekeeping that must happen alongside
//! them.

use std::path::{Path, PathBuf};

use crate::relpath::RelPath;

#[derive(Debug, Clone)]
pub enum RawEvent {
    Created { path: PathBuf, is_directory: bool },
    Deleted { path: PathBuf },
    Modified { path: PathBuf, is_directory: bool },
    Moved { src: PathBuf, dest: PathBuf },
}

/// An action the event classifier has decided to take. `ModifyFile` is
/// deliberately not an upload by itself — the update buffer decides
/// whether to upload now or mark the entry dirty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateDir(RelPath),
    DeleteObject {
        abs_path: PathBuf,
        rel_path: RelPath,
    },
    ModifyFile {
        abs_path: PathBuf,
        rel_path: RelPath,
    },
    Rename {
        old_abs_path: PathBuf,
        new_abs_path: PathBuf,
        old: RelPath,
        new: RelPath,
    },
}

/// Classifies one raw event against `root`. Returns `None` for events the
/// table says to drop, or when a path cannot be related to `root` at all
/// (defensive; the watcher is only ever scoped to `root`).
pub fn classify(root: &Path, event: RawEvent) -> Option<Action> {
    match event {
        RawEvent::Created {
            path,
            is_directory: true,
        } => RelPath::from_abs(root, &path).ok().map(Action::CreateDir),
        RawEvent::Created {
            is_directory: false,
            ..
        } => None,
        RawEvent::Deleted { path } => {
            RelPath::from_abs(root, &path)
                .ok()
                .map(|rel_path| Action::DeleteObject {
                    abs_path: path,
                    rel_path,
                })
        }
        RawEvent::Modified {
            path,
            is_directory: false,
        } => RelPath::from_abs(root, &path).ok().map(|rel_path| Action::ModifyFile {
            abs_path: path,
            rel_path,
        }),
        RawEvent::Modified {
            is_directory: true, ..
        } => None,
        RawEvent::Moved { src, dest } => {
            if !dest.starts_with(root) {
                // Moved out of the watched tree; most OSes emit Deleted
                // instead, but handle it defensively.
                return RelPath::from_abs(root, &src)
                    .ok()
                    .map(|rel_path| Action::DeleteObject {
                        abs_path: src,
                        rel_path,
                    });
            }
            let old = RelPath::from_abs(root, &src).ok()?;
            let new = RelPath::from_abs(root, &dest).ok()?;
            Some(Action::Rename {
                old_abs_path: src,
                new_abs_path: dest,
                old,
                new,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/src")
    }

    #[test]
    fn created_dir_emits_create_dir() {
        let action = classify(
            &root(),
            RawEvent::Created {
                path: PathBuf::from("/src/A"),
                is_directory: true,
            },
        )
        .unwrap();
        assert_eq!(action, Action::CreateDir(RelPath::parse("A").unwrap()));
    }

    #[test]
    fn created_file_is_dropped() {
        let action = classify(
            &root(),
            RawEvent::Created {
                path: PathBuf::from("/src/f1"),
                is_directory: false,
            },
        );
        assert!(action.is_none());
    }

    #[test]
    fn deleted_emits_delete_object() {
        let action = classify(
            &root(),
            RawEvent::Deleted {
                path: PathBuf::from("/src/A/f2"),
            },
        )
        .unwrap();
        match action {
            Action::DeleteObject { rel_path, abs_path } => {
                assert_eq!(rel_path.as_str(), "A/f2");
                assert_eq!(abs_path, PathBuf::from("/src/A/f2"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn modified_dir_is_dropped() {
        let action = classify(
            &root(),
            RawEvent::Modified {
                path: PathBuf::from("/src/A"),
                is_directory: true,
            },
        );
        assert!(action.is_none());
    }

    #[test]
    fn modified_file_emits_modify_file() {
        let action = classify(
            &root(),
            RawEvent::Modified {
                path: PathBuf::from("/src/f1"),
                is_directory: false,
            },
        )
        .unwrap();
        match action {
            Action::ModifyFile { rel_path, abs_path } => {
                assert_eq!(rel_path.as_str(), "f1");
                assert_eq!(abs_path, PathBuf::from("/src/f1"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn moved_inside_root_emits_rename() {
        let action = classify(
            &root(),
            RawEvent::Moved {
                src: PathBuf::from("/src/FileToRename"),
                dest: PathBuf::from("/src/FileRenamed"),
            },
        )
        .unwrap();
        match action {
            Action::Rename { old, new, .. } => {
                assert_eq!(old.as_str(), "FileToRename");
                assert_eq!(new.as_str(), "FileRenamed");
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn moved_outside_root_emits_delete_object() {
        let action = classify(
            &root(),
            RawEvent::Moved {
                src: PathBuf::from("/src/f1"),
                dest: PathBuf::from("/elsewhere/f1"),
            },
        )
        .unwrap();
        match action {
            Action::DeleteObject { rel_path, abs_path } => {
                assert_eq!(rel_path.as_str(), "f1");
                assert_eq!(abs_path, PathBuf::from("/src/f1"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }
}
