//! Classification of staged nodes.

use std::fs;
use std::io;
use std::path::Path;

use relink_core::NodeKind;
use tracing::warn;

use crate::error::{FsOpsError, FsOpsResult};

/// Kind of a staged node plus whether the kind was guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Detected kind.
    pub kind: NodeKind,
    /// Nothing was staged, so the kind defaulted to [`NodeKind::File`].
    pub fallback: bool,
}

/// Classify the node at `path` without following symlinks.
///
/// A symlink is reported as [`NodeKind::Symlink`] even when it points at a
/// directory. A missing path yields [`NodeKind::File`] with `fallback` set.
///
/// # Errors
///
/// Returns an error for IO failures other than the path not existing.
pub fn classify_node(path: &Path) -> FsOpsResult<Classification> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(
                path = %path.display(),
                "nothing staged at path; treating it as a file"
            );
            return Ok(Classification {
                kind: NodeKind::File,
                fallback: true,
            });
        }
        Err(source) => return Err(FsOpsError::io("classify.metadata", path, source)),
    };

    let file_type = metadata.file_type();
    let kind = if file_type.is_symlink() {
        NodeKind::Symlink
    } else if file_type.is_dir() {
        NodeKind::Directory
    } else {
        NodeKind::File
    };
    Ok(Classification {
        kind,
        fallback: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn classifies_files_and_directories() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("wp-config.php");
        fs::write(&file, b"<?php")?;
        let dir = temp.path().join("cache");
        fs::create_dir(&dir)?;

        assert_eq!(classify_node(&file)?.kind, NodeKind::File);
        let classified = classify_node(&dir)?;
        assert_eq!(classified.kind, NodeKind::Directory);
        assert!(!classified.fallback);
        Ok(())
    }

    #[test]
    fn missing_path_falls_back_to_file() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let classified = classify_node(&temp.path().join("absent"))?;
        assert_eq!(
            classified,
            Classification {
                kind: NodeKind::File,
                fallback: true,
            }
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_directory_is_a_symlink() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let dir = temp.path().join("real");
        fs::create_dir(&dir)?;
        let link = temp.path().join("alias");
        std::os::unix::fs::symlink(&dir, &link)?;

        assert_eq!(classify_node(&link)?.kind, NodeKind::Symlink);
        Ok(())
    }
}
