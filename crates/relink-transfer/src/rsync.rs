//! rsync argument builders.
//!
//! # Design
//! - One builder per remote operation; each returns a complete
//!   [`Invocation`] so the exact command can be asserted in tests and shown
//!   to operators on failure.
//! - Remote paths are relative to the application server home directory.
//! - A trailing slash on a local source means "the contents of", matching
//!   rsync's own convention.

use std::ffi::OsString;
use std::path::Path;

use relink_config::TransferSettings;
use relink_core::{RemoteEndpoint, RemoteNode};

use crate::invocation::Invocation;

/// `user@host:path` for the endpoint.
#[must_use]
pub fn remote_spec(settings: &TransferSettings, endpoint: &RemoteEndpoint, path: &str) -> String {
    format!("{}:{path}", endpoint.address(&settings.host_suffix))
}

fn transport(settings: &TransferSettings) -> String {
    format!("{} -p {}", settings.ssh_program, settings.ssh_port)
}

fn base(settings: &TransferSettings, flags: &str) -> Invocation {
    Invocation::new(&settings.rsync_program)
        .arg(flags)
        .arg("-e")
        .arg(transport(settings))
}

fn with_trailing_slash(path: &Path) -> OsString {
    let mut value = path.as_os_str().to_os_string();
    if !path.as_os_str().to_string_lossy().ends_with('/') {
        value.push("/");
    }
    value
}

/// Anchored filter rule matching `name` literally. rsync only honours
/// backslash escapes in patterns that contain a wildcard, so names are escaped
/// only in that case.
fn filter_pattern(name: &str, suffix: &str) -> String {
    let pattern = format!("/{name}{suffix}");
    if !pattern.contains(['*', '?', '[']) {
        return pattern;
    }
    let mut escaped = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if matches!(ch, '\\' | '*' | '?' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    format!("/{escaped}{suffix}")
}

/// Mirror `remote_path` into `local_dir`. A missing remote source is not an
/// error.
#[must_use]
pub fn download(
    settings: &TransferSettings,
    endpoint: &RemoteEndpoint,
    remote_path: &str,
    local_dir: &Path,
) -> Invocation {
    let flags = format!("-rl{}z", settings.verbosity.rsync_flag());
    base(settings, &flags)
        .arg("--size-only")
        .arg("--ipv4")
        .arg("--ignore-missing-args")
        .arg(remote_spec(settings, endpoint, remote_path))
        .arg(with_trailing_slash(local_dir))
}

/// Remove a remote file or symlink by fetching it into `removed_dir` with
/// `--remove-source-files`.
#[must_use]
pub fn remove_file(
    settings: &TransferSettings,
    endpoint: &RemoteEndpoint,
    node: &RemoteNode,
    removed_dir: &Path,
) -> Invocation {
    let flags = format!("-a{}z", settings.verbosity.rsync_flag());
    base(settings, &flags)
        .arg("--remove-source-files")
        .arg("--ignore-missing-args")
        .arg(remote_spec(settings, endpoint, &node.path()))
        .arg(with_trailing_slash(removed_dir))
}

/// Remove a remote directory by syncing an empty directory over its parent,
/// with filters limiting `--delete` to the named entry.
#[must_use]
pub fn remove_directory(
    settings: &TransferSettings,
    endpoint: &RemoteEndpoint,
    node: &RemoteNode,
    void_dir: &Path,
) -> Invocation {
    let flags = format!("-r{}", settings.verbosity.rsync_flag());
    base(settings, &flags)
        .arg("--delete")
        .arg("--include")
        .arg(filter_pattern(&node.name, ""))
        .arg("--include")
        .arg(filter_pattern(&node.name, "/***"))
        .arg("--exclude")
        .arg("*")
        .arg(with_trailing_slash(void_dir))
        .arg(remote_spec(settings, endpoint, &node.parent))
}

/// Upload `source` to `remote_path`. With `contents_only`, the directory's
/// contents land inside `remote_path` rather than a nested copy.
#[must_use]
pub fn upload(
    settings: &TransferSettings,
    source: &Path,
    contents_only: bool,
    endpoint: &RemoteEndpoint,
    remote_path: &str,
) -> Invocation {
    let flags = format!("-rl{}z", settings.verbosity.rsync_flag());
    let local = if contents_only {
        with_trailing_slash(source)
    } else {
        source.as_os_str().to_os_string()
    };
    base(settings, &flags)
        .arg("--size-only")
        .arg("--ipv4")
        .arg(format!("--temp-dir={}", settings.remote_temp_dir))
        .arg(local)
        .arg(remote_spec(settings, endpoint, remote_path))
}
