//! Relative link targets and local symlink creation.

use std::path::Path;

use relink_core::{DestinationName, SourcePath, relative_prefix};

use crate::error::{FsOpsError, FsOpsResult};
use crate::staging::remove_path;

/// Target for a link placed at `source` that resolves to
/// `<symlink_root>/<destination>` relative to the remote home directory.
#[must_use]
pub fn link_target(
    source: &SourcePath,
    symlink_root: &str,
    destination: &DestinationName,
) -> String {
    format!(
        "{}{}/{}",
        relative_prefix(source.depth()),
        symlink_root.trim_matches('/'),
        destination.as_str()
    )
}

/// Create `link` pointing at `target`, replacing whatever is already there.
///
/// # Errors
///
/// Returns an error when the existing entry cannot be removed or the link
/// cannot be created.
pub fn create_symlink(link: &Path, target: &str) -> FsOpsResult<()> {
    remove_path(link, "link.replace")?;
    symlink(target, link)
}

#[cfg(unix)]
fn symlink(target: &str, link: &Path) -> FsOpsResult<()> {
    std::os::unix::fs::symlink(target, link)
        .map_err(|source| FsOpsError::io("link.create", link, source))
}

#[cfg(not(unix))]
fn symlink(_target: &str, _link: &Path) -> FsOpsResult<()> {
    Err(FsOpsError::Unsupported {
        operation: "link.create",
    })
}
