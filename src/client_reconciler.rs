//! Startup bulk reconciliation: walks the source tree and brings the
//! server up to date before the watcher takes over steady-state updates.

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::client_context::ClientContext;
use crate::relpath::RelPath;

pub async fn reconcile(ctx: &ClientContext) -> Result<()> {
    for entry in WalkDir::new(&ctx.root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = entry.context("walk source tree")?;
        let rel = RelPath::from_abs(&ctx.root, entry.path())
            .with_context(|| format!("relativize {}", entry.path().display()))?;

        if entry.file_type().is_dir() {
            if !ctx.remote.dir_exists(&rel).await? {
                ctx.remote.create_dir(&rel).await?;
            }
        } else if entry.file_type().is_file() {
            if !ctx.remote.check_file(entry.path(), &rel).await? {
                ctx.remote.upload(entry.path(), &rel).await?;
            }
        }
        // Symlinks and other special files are out of scope.
    }
    Ok(())
}
