//! Test fixtures: hosting records, requests, configuration and staged
//! content produced by fake downloads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use relink_config::RelinkConfig;
use relink_core::{EnvironmentRecord, ProvisioningRequest, SiteRecord};
use relink_transfer::Invocation;

use crate::mocks::has_arg;

/// Site identifier used by the fixtures.
pub const SITE_ID: &str = "3f2a9c1e";
/// Site name used by the fixtures.
pub const SITE_NAME: &str = "acme";

/// The fixture site.
#[must_use]
pub fn site_record() -> SiteRecord {
    SiteRecord {
        id: SITE_ID.to_string(),
        name: SITE_NAME.to_string(),
    }
}

/// An environment record with the given id.
#[must_use]
pub fn environment_record(id: &str) -> EnvironmentRecord {
    EnvironmentRecord { id: id.to_string() }
}

/// Request for `site_environment` and `source_path` with every option off.
#[must_use]
pub fn request(site_environment: &str, source_path: &str) -> ProvisioningRequest {
    ProvisioningRequest {
        site_environment: site_environment.to_string(),
        source_path: source_path.to_string(),
        destination: None,
        transfer_existing: false,
        point_to_file: false,
    }
}

/// Default configuration staging under `staging_root` with fast polling.
#[must_use]
pub fn test_config(staging_root: &Path) -> RelinkConfig {
    let mut config = RelinkConfig::default();
    config.layout.staging_root = Some(staging_root.to_path_buf());
    config.guard.poll_interval_ms = 1;
    config.guard.switch_timeout_secs = 5;
    config
}

/// Content a fake download leaves in the staging directory.
#[derive(Debug, Clone)]
pub enum StagedContent {
    /// Remote source does not exist.
    Nothing,
    /// Regular file with the given bytes.
    File(Vec<u8>),
    /// Directory holding the given `(name, bytes)` files.
    Directory(Vec<(String, Vec<u8>)>),
    /// Symbolic link to the given target.
    Symlink(String),
}

/// Hook for [`crate::mocks::RecordingRunner::on_run`] that materialises
/// `content` as `<local dir>/<local_target>` whenever a download runs.
pub fn download_hook(
    local_target: &str,
    content: StagedContent,
) -> impl Fn(&Invocation) -> io::Result<()> + Send + Sync + 'static {
    let local_target = local_target.to_string();
    move |invocation| {
        if !is_download(invocation) {
            return Ok(());
        }
        let Some(dir) = invocation.args().last() else {
            return Ok(());
        };
        let path = PathBuf::from(dir).join(&local_target);
        materialize(&path, &content)
    }
}

/// Whether `invocation` is a download (mirror from remote into staging).
#[must_use]
pub fn is_download(invocation: &Invocation) -> bool {
    has_arg(invocation, "--ignore-missing-args") && has_arg(invocation, "--size-only")
}

fn materialize(path: &Path, content: &StagedContent) -> io::Result<()> {
    match content {
        StagedContent::Nothing => Ok(()),
        StagedContent::File(bytes) => fs::write(path, bytes),
        StagedContent::Directory(files) => {
            fs::create_dir_all(path)?;
            for (name, bytes) in files {
                fs::write(path.join(name), bytes)?;
            }
            Ok(())
        }
        StagedContent::Symlink(target) => symlink(target, path),
    }
}

#[cfg(unix)]
fn symlink(target: &str, path: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, path)
}

#[cfg(not(unix))]
fn symlink(_target: &str, _path: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks require a unix host",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_hook_only_reacts_to_downloads() -> io::Result<()> {
        let temp = tempfile::tempdir()?;
        let hook = download_hook(
            "cache",
            StagedContent::Directory(vec![("object.bin".into(), b"1".to_vec())]),
        );

        let upload = Invocation::new("rsync")
            .arg("--size-only")
            .arg(temp.path().as_os_str());
        hook(&upload)?;
        assert!(!temp.path().join("cache").exists());

        let download = Invocation::new("rsync")
            .arg("--size-only")
            .arg("--ignore-missing-args")
            .arg(temp.path().as_os_str());
        hook(&download)?;
        assert!(temp.path().join("cache/object.bin").is_file());
        Ok(())
    }
}
