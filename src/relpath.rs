//! Relative path: a forward-slash-separated path under a root, normalized
//! and never escaping it.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Result};

/// A relative path under a sync root. Never starts with `/`, never contains a
/// `..` segment, components are joined with `/` regardless of host platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(String);

impl RelPath {
    /// Build from an OS path and a root it's supposed to live under, computing
    /// the relative part (used by the client's event classifier).
    pub fn from_abs(root: &Path, abs: &Path) -> Result<Self> {
        let rel = abs
            .strip_prefix(root)
            .map_err(|_| anyhow::anyhow!("{} is not under {}", abs.display(), root.display()))?;
        Self::from_components(rel)
    }

    /// Build from a raw, already-relative string (e.g. a percent-decoded URL
    /// path segment), rejecting traversal and absolute paths.
    pub fn parse(raw: &str) -> Result<Self> {
        Self::from_components(Path::new(raw))
    }

    fn from_components(path: &Path) -> Result<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(seg) => {
                    let seg = seg
                        .to_str()
                        .ok_or_else(|| anyhow::anyhow!("non-utf8 path segment"))?;
                    segments.push(seg.to_string());
                }
                Component::CurDir => {}
                Component::ParentDir => bail!("path traversal not allowed: {}", path.display()),
                Component::RootDir | Component::Prefix(_) => {
                    bail!("absolute path not allowed: {}", path.display())
                }
            }
        }
        Ok(RelPath(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join this path under `root`, verifying the result still normalizes
    /// under `root` (defends against segments that were never rejected by
    /// `parse` but could still escape via platform-specific join quirks).
    pub fn resolve_under(&self, root: &Path) -> Result<PathBuf> {
        let joined = root.join(&self.0);
        let root_norm = normalize(root);
        let joined_norm = normalize(&joined);
        if !joined_norm.starts_with(&root_norm) {
            bail!("path escapes root: {}", self.0);
        }
        Ok(joined)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for RelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a path without touching the filesystem (unlike `canonicalize`,
/// which requires the path to exist).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_traversal() {
        assert!(RelPath::parse("../etc/passwd").is_err());
        assert!(RelPath::parse("a/../../b").is_err());
    }

    #[test]
    fn parse_rejects_absolute() {
        assert!(RelPath::parse("/etc/passwd").is_err());
    }

    #[test]
    fn parse_accepts_nested_relative() {
        let p = RelPath::parse("a/b/c.txt").unwrap();
        assert_eq!(p.as_str(), "a/b/c.txt");
    }

    #[test]
    fn from_abs_computes_relative() {
        let root = Path::new("/srv/source");
        let abs = Path::new("/srv/source/a/b.txt");
        let p = RelPath::from_abs(root, abs).unwrap();
        assert_eq!(p.as_str(), "a/b.txt");
    }

    #[test]
    fn resolve_under_rejects_escape() {
        // A crafted path that parse() would accept segment-by-segment but which
        // would escape if joined naively; exercise the defense-in-depth check.
        let root = Path::new("/srv/dest");
        let p = RelPath("..".to_string());
        assert!(p.resolve_under(root).is_err());
    }

    #[test]
    fn resolve_under_joins_normally() {
        let root = Path::new("/srv/dest");
        let p = RelPath::parse("a/b.txt").unwrap();
        let resolved = p.resolve_under(root).unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/dest/a/b.txt"));
    }
}
