//! Per-invocation staging directory.
//!
//! # Design
//! - One session directory per `<site>.<env>` under the staging root, with a
//!   fixed set of subdirectories (`download/`, `empty/`, `void/`, `removed/`,
//!   `link/`).
//! - Opening a session clears scratch subdirectories and the stale download
//!   of the current target; downloads of other targets are kept as backups.
//! - Nothing is removed implicitly on drop; [`StagingSession::purge`] is the
//!   only path that deletes the session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

const DOWNLOAD_DIR: &str = "download";
const EMPTY_DIR: &str = "empty";
const VOID_DIR: &str = "void";
const REMOVED_DIR: &str = "removed";
const LINK_DIR: &str = "link";
const SCRATCH_DIRS: &[&str] = &[EMPTY_DIR, VOID_DIR, REMOVED_DIR, LINK_DIR];

/// Kind of placeholder created for the symlink destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// Empty regular file.
    File,
    /// Empty directory.
    Directory,
}

/// Local staging directory for one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingSession {
    root: PathBuf,
}

impl StagingSession {
    /// Create or reuse `<staging_root>/<namespace>/` and prepare it for a run
    /// against `local_target`.
    ///
    /// # Errors
    ///
    /// Returns an error when a name is not a single path segment or when the
    /// directories cannot be prepared.
    pub fn open(staging_root: &Path, namespace: &str, local_target: &str) -> FsOpsResult<Self> {
        ensure_segment("namespace", namespace)?;
        ensure_segment("local_target", local_target)?;

        let root = staging_root.join(namespace);
        fs::create_dir_all(&root)
            .map_err(|source| FsOpsError::io("staging.create", &root, source))?;

        for name in SCRATCH_DIRS {
            let dir = root.join(name);
            remove_path(&dir, "staging.clear")?;
            fs::create_dir_all(&dir)
                .map_err(|source| FsOpsError::io("staging.create", &dir, source))?;
        }

        let download = root.join(DOWNLOAD_DIR);
        fs::create_dir_all(&download)
            .map_err(|source| FsOpsError::io("staging.create", &download, source))?;
        let stale = download.join(local_target);
        if remove_path(&stale, "staging.clear")? {
            debug!(path = %stale.display(), "cleared stale staged copy");
        }

        Ok(Self { root })
    }

    /// Session directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mirror of downloaded remote content.
    #[must_use]
    pub fn download_dir(&self) -> PathBuf {
        self.root.join(DOWNLOAD_DIR)
    }

    /// Placeholder directory.
    #[must_use]
    pub fn empty_dir(&self) -> PathBuf {
        self.root.join(EMPTY_DIR)
    }

    /// Always-empty directory used as the source of filtered deletes.
    #[must_use]
    pub fn void_dir(&self) -> PathBuf {
        self.root.join(VOID_DIR)
    }

    /// Sink for files fetched back while removing them remotely.
    #[must_use]
    pub fn removed_dir(&self) -> PathBuf {
        self.root.join(REMOVED_DIR)
    }

    /// Directory holding the locally built symlink.
    #[must_use]
    pub fn link_dir(&self) -> PathBuf {
        self.root.join(LINK_DIR)
    }

    /// Location of the staged copy of `name`.
    #[must_use]
    pub fn staged_path(&self, name: &str) -> PathBuf {
        self.download_dir().join(name)
    }

    /// Create an empty placeholder named `name` under `empty/`.
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not a single segment or the placeholder
    /// cannot be written.
    pub fn create_placeholder(&self, name: &str, kind: PlaceholderKind) -> FsOpsResult<PathBuf> {
        ensure_segment("placeholder", name)?;
        let path = self.empty_dir().join(name);
        remove_path(&path, "staging.placeholder")?;
        match kind {
            PlaceholderKind::File => fs::File::create(&path).map(drop),
            PlaceholderKind::Directory => fs::create_dir(&path),
        }
        .map_err(|source| FsOpsError::io("staging.placeholder", &path, source))?;
        Ok(path)
    }

    /// Copy the staged node at `staged` to `empty/<name>` so it can be
    /// uploaded into the symlink root under its destination name. Symlinks
    /// are recreated rather than followed; the staged copy stays in place.
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not a single segment or the copy fails.
    pub fn stage_existing(&self, staged: &Path, name: &str) -> FsOpsResult<PathBuf> {
        ensure_segment("destination", name)?;
        let path = self.empty_dir().join(name);
        remove_path(&path, "staging.existing")?;
        copy_tree(staged, &path)?;
        debug!(from = %staged.display(), to = %path.display(), "staged existing content");
        Ok(path)
    }

    /// Delete the whole session directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be removed.
    pub fn purge(self) -> FsOpsResult<()> {
        remove_path(&self.root, "staging.purge")?;
        info!(path = %self.root.display(), "purged staging directory");
        Ok(())
    }
}

fn ensure_segment(field: &'static str, value: &str) -> FsOpsResult<()> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(FsOpsError::invalid(
            field,
            "must be a single path segment",
            value,
        ));
    }
    Ok(())
}

fn copy_tree(source: &Path, destination: &Path) -> FsOpsResult<()> {
    for entry in WalkDir::new(source).follow_root_links(false) {
        let entry =
            entry.map_err(|err| FsOpsError::walkdir("staging.existing.walk", source, err))?;
        let relative = entry.path().strip_prefix(source).map_err(|_| {
            FsOpsError::invalid(
                "staged_path",
                "outside the staged node",
                &entry.path().to_string_lossy(),
            )
        })?;
        let target = if relative.as_os_str().is_empty() {
            destination.to_path_buf()
        } else {
            destination.join(relative)
        };
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            let link = fs::read_link(entry.path())
                .map_err(|err| FsOpsError::io("staging.existing.read_link", entry.path(), err))?;
            copy_symlink(&link, &target)?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|err| FsOpsError::io("staging.existing.create_dir", &target, err))?;
        } else {
            fs::copy(entry.path(), &target)
                .map_err(|err| FsOpsError::io("staging.existing.copy", &target, err))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> FsOpsResult<()> {
    std::os::unix::fs::symlink(link, target)
        .map_err(|err| FsOpsError::io("staging.existing.symlink", target, err))
}

#[cfg(not(unix))]
fn copy_symlink(_link: &Path, _target: &Path) -> FsOpsResult<()> {
    Err(FsOpsError::Unsupported {
        operation: "staging.existing.symlink",
    })
}

/// Remove a file, symlink or directory tree; returns whether anything existed.
pub(crate) fn remove_path(path: &Path, operation: &'static str) -> FsOpsResult<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => return Err(FsOpsError::io(operation, path, source)),
    };
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|source| FsOpsError::io(operation, path, source))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn open_creates_layout_and_clears_scratch() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let session = StagingSession::open(temp.path(), "acme.dev", "cache")?;
        for dir in [
            session.download_dir(),
            session.empty_dir(),
            session.void_dir(),
            session.removed_dir(),
            session.link_dir(),
        ] {
            assert!(dir.is_dir(), "{} missing", dir.display());
        }

        fs::write(session.void_dir().join("leftover"), b"x")?;
        fs::create_dir_all(session.staged_path("cache").join("nested"))?;
        fs::write(session.staged_path("other"), b"keep")?;

        let reopened = StagingSession::open(temp.path(), "acme.dev", "cache")?;
        assert_eq!(fs::read_dir(reopened.void_dir())?.count(), 0);
        assert!(!reopened.staged_path("cache").exists());
        assert!(reopened.staged_path("other").is_file());
        Ok(())
    }

    #[test]
    fn rejects_nested_namespace() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = StagingSession::open(temp.path(), "../escape", "cache")
            .expect_err("nested namespace rejected");
        assert!(matches!(
            err,
            FsOpsError::InvalidInput {
                field: "namespace",
                ..
            }
        ));
    }

    #[test]
    fn placeholders_match_requested_kind() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let session = StagingSession::open(temp.path(), "acme.dev", "cache")?;

        let dir = session.create_placeholder("cache", PlaceholderKind::Directory)?;
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir)?.count(), 0);

        let file = session.create_placeholder("cache", PlaceholderKind::File)?;
        assert!(file.is_file());
        assert_eq!(fs::metadata(&file)?.len(), 0);
        Ok(())
    }

    #[test]
    fn existing_content_is_copied_under_destination_name() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let session = StagingSession::open(temp.path(), "acme.dev", "wp-config.php")?;
        let staged = session.staged_path("wp-config.php");
        fs::write(&staged, b"<?php")?;

        let copy = session.stage_existing(&staged, "cfg")?;
        assert_eq!(copy, session.empty_dir().join("cfg"));
        assert_eq!(fs::read(&copy)?, b"<?php");
        assert!(staged.is_file());
        Ok(())
    }

    #[test]
    fn existing_directory_is_copied_recursively() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let session = StagingSession::open(temp.path(), "acme.dev", "tmp")?;
        let staged = session.staged_path("tmp");
        fs::create_dir_all(staged.join("nested"))?;
        fs::write(staged.join("nested/a.txt"), b"a")?;
        #[cfg(unix)]
        std::os::unix::fs::symlink("nested/a.txt", staged.join("alias"))?;

        let copy = session.stage_existing(&staged, "custom")?;
        assert_eq!(fs::read(copy.join("nested/a.txt"))?, b"a");
        #[cfg(unix)]
        assert_eq!(fs::read_link(copy.join("alias"))?, Path::new("nested/a.txt"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn existing_symlink_is_recreated_not_followed() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let session = StagingSession::open(temp.path(), "acme.dev", "uploads")?;
        let staged = session.staged_path("uploads");
        std::os::unix::fs::symlink("../files/uploads", &staged)?;

        let copy = session.stage_existing(&staged, "uploads")?;
        assert_eq!(fs::read_link(&copy)?, Path::new("../files/uploads"));
        Ok(())
    }

    #[test]
    fn purge_removes_session() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let session = StagingSession::open(temp.path(), "acme.dev", "cache")?;
        let root = session.root().to_path_buf();
        session.purge()?;
        assert!(!root.exists());
        Ok(())
    }
}
