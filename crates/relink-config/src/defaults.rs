//! Built-in configuration values.
//!
//! # Design
//! - Keep platform constants in one place so the loader and tests agree.
//! - `test` and `live` are always protected; configuration can only add to
//!   the set.

/// API base URL used when nothing else is configured.
pub const API_URL: &str = "http://127.0.0.1:7070";
/// HTTP timeout for API calls, in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;
/// rsync executable.
pub const RSYNC_PROGRAM: &str = "rsync";
/// ssh executable used as rsync's remote shell.
pub const SSH_PROGRAM: &str = "ssh";
/// Application server SSH port.
pub const SSH_PORT: u16 = 2222;
/// Domain suffix of application server hosts.
pub const HOST_SUFFIX: &str = "drush.in";
/// Remote directory rsync uses for temporary files while uploading.
pub const REMOTE_TEMP_DIR: &str = "~/tmp/";
/// Top-level segment every source path is rooted under.
pub const CODE_ROOT: &str = "code";
/// Remote directory holding relocated content.
pub const SYMLINK_ROOT: &str = "files/symlink_target";
/// Directory under the user's home holding relink state.
pub const HOME_DIR_NAME: &str = ".relink";
/// Staging directory name under [`HOME_DIR_NAME`].
pub const STAGING_DIR_NAME: &str = "staging";
/// Optional configuration file name under [`HOME_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Environments on which provisioning is never allowed.
pub const PROTECTED_ENVIRONMENTS: &[&str] = &["test", "live"];
/// Connection mode that permits direct file writes.
pub const DIRECT_WRITE_MODE: &str = "sftp";
/// Interval between workflow progress checks, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 3_000;
/// Upper bound on waiting for a connection-mode switch, in seconds.
pub const SWITCH_TIMEOUT_SECS: u64 = 600;
