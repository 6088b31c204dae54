//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; every section deserialises with defaults so a
//!   configuration file only needs the keys it overrides.
//! - Derived values (protected set, staging root, durations) are exposed as
//!   methods rather than stored twice.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};

/// Complete relink configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelinkConfig {
    /// Hosting API client settings.
    pub api: ApiSettings,
    /// rsync/ssh transport settings.
    pub transfer: TransferSettings,
    /// Remote and local directory layout.
    pub layout: LayoutSettings,
    /// Environment safety settings.
    pub guard: GuardSettings,
}

/// Hosting API client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the hosting API.
    pub base_url: String,
    /// Session token sent as a bearer credential, when set.
    pub session_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: defaults::API_URL.to_string(),
            session_token: None,
            timeout_secs: defaults::HTTP_TIMEOUT_SECS,
        }
    }
}

impl ApiSettings {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Chattiness of the transfer program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Pass `-q` and discard the transfer program's standard output.
    #[default]
    Quiet,
    /// Pass `-v` and stream the transfer program's output to the terminal.
    Verbose,
}

impl Verbosity {
    /// Single-letter rsync flag for this verbosity.
    #[must_use]
    pub const fn rsync_flag(self) -> char {
        match self {
            Self::Quiet => 'q',
            Self::Verbose => 'v',
        }
    }
}

/// rsync/ssh transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// rsync executable.
    pub rsync_program: String,
    /// ssh executable used as the remote shell.
    pub ssh_program: String,
    /// Application server SSH port.
    pub ssh_port: u16,
    /// Domain suffix of application server hosts.
    pub host_suffix: String,
    /// Remote temporary directory for uploads.
    pub remote_temp_dir: String,
    /// Transfer verbosity.
    pub verbosity: Verbosity,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            rsync_program: defaults::RSYNC_PROGRAM.to_string(),
            ssh_program: defaults::SSH_PROGRAM.to_string(),
            ssh_port: defaults::SSH_PORT,
            host_suffix: defaults::HOST_SUFFIX.to_string(),
            remote_temp_dir: defaults::REMOTE_TEMP_DIR.to_string(),
            verbosity: Verbosity::Quiet,
        }
    }
}

/// Remote and local directory layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Top-level segment every source path is rooted under.
    pub code_root: String,
    /// Remote directory holding relocated content.
    pub symlink_root: String,
    /// Local staging root; defaults to `~/.relink/staging`.
    pub staging_root: Option<PathBuf>,
    /// Remove the staging session after a successful run.
    pub purge_on_success: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            code_root: defaults::CODE_ROOT.to_string(),
            symlink_root: defaults::SYMLINK_ROOT.to_string(),
            staging_root: None,
            purge_on_success: false,
        }
    }
}

impl LayoutSettings {
    /// Effective staging root.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingHome`] when no staging root is configured
    /// and the home directory cannot be determined.
    pub fn staging_root(&self) -> ConfigResult<PathBuf> {
        if let Some(root) = &self.staging_root {
            return Ok(root.clone());
        }
        dirs::home_dir()
            .map(|home| {
                home.join(defaults::HOME_DIR_NAME)
                    .join(defaults::STAGING_DIR_NAME)
            })
            .ok_or(ConfigError::MissingHome)
    }
}

/// Environment safety settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSettings {
    /// Additional environments to protect on top of `test` and `live`.
    pub protected_environments: Vec<String>,
    /// Connection mode that permits direct file writes.
    pub direct_write_mode: String,
    /// Interval between workflow progress checks, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum time to wait for a connection-mode switch, in seconds.
    pub switch_timeout_secs: u64,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            protected_environments: Vec::new(),
            direct_write_mode: defaults::DIRECT_WRITE_MODE.to_string(),
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            switch_timeout_secs: defaults::SWITCH_TIMEOUT_SECS,
        }
    }
}

impl GuardSettings {
    /// Full protected set: the built-in tiers plus any configured extras.
    #[must_use]
    pub fn protected(&self) -> Vec<String> {
        let mut protected: Vec<String> = defaults::PROTECTED_ENVIRONMENTS
            .iter()
            .map(|env| (*env).to_string())
            .collect();
        for env in &self.protected_environments {
            let env = env.trim().to_ascii_lowercase();
            if !env.is_empty() && !protected.contains(&env) {
                protected.push(env);
            }
        }
        protected
    }

    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Switch timeout as a [`Duration`].
    #[must_use]
    pub const fn switch_timeout(&self) -> Duration {
        Duration::from_secs(self.switch_timeout_secs)
    }
}
