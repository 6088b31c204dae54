//! Configuration layering: defaults, then a JSON file, then `RELINK_*`
//! environment variables. Command-line flags are applied by the caller on
//! the returned value, which is validated only once every layer is in.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{RelinkConfig, Verbosity};

/// Environment variable lookup used by the loader.
pub type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builder that assembles a [`RelinkConfig`] from its layers.
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: EnvLookup,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader reading the process environment and the default file location.
    #[must_use]
    pub fn new() -> Self {
        Self {
            file: None,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Read this file instead of `~/.relink/config.json`. The file must exist.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Replace the environment lookup.
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    /// Apply every layer. The result is not validated; call
    /// [`crate::validate()`] after any remaining overrides.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed or when an
    /// environment override is malformed.
    pub fn load(self) -> ConfigResult<RelinkConfig> {
        let mut config = match self.file.as_deref() {
            Some(path) => read_file(path)?,
            None => match default_file() {
                Some(path) if path.is_file() => read_file(&path)?,
                _ => RelinkConfig::default(),
            },
        };
        apply_env(&mut config, &*self.env)?;
        Ok(config)
    }
}

fn default_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(defaults::HOME_DIR_NAME)
            .join(defaults::CONFIG_FILE_NAME)
    })
}

fn read_file(path: &Path) -> ConfigResult<RelinkConfig> {
    debug!(path = %path.display(), "loading configuration file");
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env(config: &mut RelinkConfig, env: &dyn Fn(&str) -> Option<String>) -> ConfigResult<()> {
    let var = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    if let Some(value) = var("RELINK_API_URL") {
        config.api.base_url = value;
    }
    if let Some(value) = var("RELINK_SESSION_TOKEN") {
        config.api.session_token = Some(value);
    }
    if let Some(value) = var("RELINK_HTTP_TIMEOUT_SECS") {
        config.api.timeout_secs = parse_number("api", "timeout_secs", &value)?;
    }

    if let Some(value) = var("RELINK_RSYNC") {
        config.transfer.rsync_program = value;
    }
    if let Some(value) = var("RELINK_SSH") {
        config.transfer.ssh_program = value;
    }
    if let Some(value) = var("RELINK_SSH_PORT") {
        config.transfer.ssh_port = parse_number("transfer", "ssh_port", &value)?;
    }
    if let Some(value) = var("RELINK_HOST_SUFFIX") {
        config.transfer.host_suffix = value;
    }
    if let Some(value) = var("RELINK_REMOTE_TMP") {
        config.transfer.remote_temp_dir = value;
    }
    if let Some(value) = var("RELINK_VERBOSE") {
        config.transfer.verbosity = if parse_bool("transfer", "verbosity", &value)? {
            Verbosity::Verbose
        } else {
            Verbosity::Quiet
        };
    }

    if let Some(value) = var("RELINK_STAGING_DIR") {
        config.layout.staging_root = Some(PathBuf::from(value));
    }
    if let Some(value) = var("RELINK_PURGE_STAGING") {
        config.layout.purge_on_success = parse_bool("layout", "purge_on_success", &value)?;
    }

    if let Some(value) = var("RELINK_PROTECTED_ENVS") {
        config.guard.protected_environments = value
            .split(',')
            .map(str::trim)
            .filter(|env| !env.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(value) = var("RELINK_POLL_INTERVAL_MS") {
        config.guard.poll_interval_ms = parse_number("guard", "poll_interval_ms", &value)?;
    }
    if let Some(value) = var("RELINK_SWITCH_TIMEOUT_SECS") {
        config.guard.switch_timeout_secs = parse_number("guard", "switch_timeout_secs", &value)?;
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(
    section: &'static str,
    field: &'static str,
    value: &str,
) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::invalid(section, field, Some(value.to_string()), "must be a number")
    })
}

fn parse_bool(section: &'static str, field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "must be a boolean",
        )),
    }
}
