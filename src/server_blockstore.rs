//! The server's block-accepting write path: offset-addressed writes,
//! truncation to a declared final size, and timestamp application, plus the
//! plain filesystem operations (`direxists`, `createdir`, `deleteobject`,
//! `renameobject`) that don't need block addressing.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::{Context, Result};
use filetime::FileTime;

pub fn dir_exists(path: &Path) -> bool {
    path.is_dir()
}

pub fn create_dir_recursive(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).with_context(|| format!("mkdir -p {}", path.display()))
}

/// Writes `data` at `offset` into `path`, creating the file if absent. If
/// `truncate_to` is set, the file is truncated (or extended with a hole) to
/// that length after the write. If `times` is set, `atime`/`mtime` are
/// applied last, so a reader observing the new mtime knows the write (and
/// any truncation) already landed.
pub fn write_block(
    path: &Path,
    offset: u64,
    data: &[u8],
    truncate_to: Option<u64>,
    times: Option<(u64, u64)>,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;

    if !data.is_empty() {
        file.seek(SeekFrom::Start(offset))
            .with_context(|| format!("seek {}", path.display()))?;
        file.write_all(data)
            .with_context(|| format!("write {}", path.display()))?;
    }

    if let Some(len) = truncate_to {
        file.set_len(len)
            .with_context(|| format!("truncate {}", path.display()))?;
    }
    drop(file);

    if let Some((atime_ns, mtime_ns)) = times {
        let atime = FileTime::from_unix_time(
            (atime_ns / 1_000_000_000) as i64,
            (atime_ns % 1_000_000_000) as u32,
        );
        let mtime = FileTime::from_unix_time(
            (mtime_ns / 1_000_000_000) as i64,
            (mtime_ns % 1_000_000_000) as u32,
        );
        filetime::set_file_times(path, atime, mtime)
            .with_context(|| format!("set times on {}", path.display()))?;
    }

    Ok(())
}

/// Overwrites `path` wholesale with `data` (the v1.0 fallback), applying
/// times if both are present.
pub fn copy_whole_file(path: &Path, data: &[u8], times: Option<(u64, u64)>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;

    if let Some((atime_ns, mtime_ns)) = times {
        let atime = FileTime::from_unix_time(
            (atime_ns / 1_000_000_000) as i64,
            (atime_ns % 1_000_000_000) as u32,
        );
        let mtime = FileTime::from_unix_time(
            (mtime_ns / 1_000_000_000) as i64,
            (mtime_ns % 1_000_000_000) as u32,
        );
        filetime::set_file_times(path, atime, mtime)
            .with_context(|| format!("set times on {}", path.display()))?;
    }
    Ok(())
}

/// Removes a regular file or an empty directory. Absent objects are
/// reported as success (idempotent delete).
pub fn delete_object(path: &Path) -> Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).with_context(|| format!("stat {}", path.display())),
    };
    if meta.is_dir() {
        // Only leaf (empty) directories are removed; a non-empty directory
        // is reported as success without recursing — the event stream
        // delivers per-file deletes first.
        match std::fs::remove_dir(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) if non_empty_dir(&e) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("rmdir {}", path.display())),
        }
    } else {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
}

fn non_empty_dir(e: &std::io::Error) -> bool {
    matches!(e.raw_os_error(), Some(39) | Some(66)) // ENOTEMPTY on Linux/macOS
}

/// Renames within the destination root. A missing source is reported as
/// success (the "already-renamed parent" case).
pub fn rename_object(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("rename {} to {}", from.display(), to.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn write_block_creates_and_writes_at_offset() {
        let dir = tmp("dirsync-blockstore-write");
        let path = dir.join("f");
        write_block(&path, 0, b"hello", None, None).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");

        write_block(&path, 5, b"world", None, None).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"helloworld");
    }

    #[test]
    fn write_block_truncates_to_declared_size() {
        let dir = tmp("dirsync-blockstore-truncate");
        let path = dir.join("f");
        write_block(&path, 0, b"0123456789", None, None).unwrap();
        write_block(&path, 0, b"", Some(4), None).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"0123");
    }

    #[test]
    fn delete_object_is_idempotent_on_missing_path() {
        let dir = tmp("dirsync-blockstore-delete-missing");
        let path = dir.join("nope");
        delete_object(&path).unwrap();
    }

    #[test]
    fn delete_object_removes_regular_file() {
        let dir = tmp("dirsync-blockstore-delete-file");
        let path = dir.join("f");
        std::fs::write(&path, b"x").unwrap();
        delete_object(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn delete_object_on_non_empty_dir_is_success_without_removal() {
        let dir = tmp("dirsync-blockstore-delete-nonempty");
        let sub = dir.join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("f"), b"x").unwrap();
        delete_object(&sub).unwrap();
        assert!(sub.exists());
    }

    #[test]
    fn rename_object_is_idempotent_on_missing_source() {
        let dir = tmp("dirsync-blockstore-rename-missing");
        rename_object(&dir.join("nope"), &dir.join("also-nope")).unwrap();
    }

    #[test]
    fn rename_object_moves_file() {
        let dir = tmp("dirsync-blockstore-rename");
        let from = dir.join("old");
        let to = dir.join("new");
        std::fs::write(&from, b"x").unwrap();
        rename_object(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"x");
    }
}
