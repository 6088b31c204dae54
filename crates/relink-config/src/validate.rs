//! Consistency checks run after every configuration layer has been applied.

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::RelinkConfig;

/// Validate a fully layered configuration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first field that fails.
pub fn validate(config: &RelinkConfig) -> ConfigResult<()> {
    let api = &config.api;
    let url = Url::parse(&api.base_url).map_err(|_| {
        ConfigError::invalid("api", "base_url", Some(api.base_url.clone()), "must be a URL")
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            "api",
            "base_url",
            Some(api.base_url.clone()),
            "must use http or https",
        ));
    }
    if api.timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "api",
            "timeout_secs",
            Some("0".into()),
            "must be greater than zero",
        ));
    }

    let transfer = &config.transfer;
    require_non_empty("transfer", "rsync_program", &transfer.rsync_program)?;
    require_non_empty("transfer", "ssh_program", &transfer.ssh_program)?;
    require_non_empty("transfer", "remote_temp_dir", &transfer.remote_temp_dir)?;
    if transfer.ssh_port == 0 {
        return Err(ConfigError::invalid(
            "transfer",
            "ssh_port",
            Some("0".into()),
            "must be between 1 and 65535",
        ));
    }
    if transfer.host_suffix.trim().is_empty()
        || transfer.host_suffix.contains(char::is_whitespace)
        || transfer.host_suffix.starts_with('.')
    {
        return Err(ConfigError::invalid(
            "transfer",
            "host_suffix",
            Some(transfer.host_suffix.clone()),
            "must be a bare domain suffix",
        ));
    }

    let layout = &config.layout;
    if layout.code_root.is_empty()
        || layout.code_root.contains('/')
        || layout.code_root == "."
        || layout.code_root == ".."
    {
        return Err(ConfigError::invalid(
            "layout",
            "code_root",
            Some(layout.code_root.clone()),
            "must be a single path segment",
        ));
    }
    if layout.symlink_root.is_empty()
        || layout.symlink_root.starts_with('/')
        || layout.symlink_root.ends_with('/')
        || layout
            .symlink_root
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(ConfigError::invalid(
            "layout",
            "symlink_root",
            Some(layout.symlink_root.clone()),
            "must be a relative path without empty or relative segments",
        ));
    }

    let guard = &config.guard;
    require_non_empty("guard", "direct_write_mode", &guard.direct_write_mode)?;
    if guard.switch_timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "guard",
            "switch_timeout_secs",
            Some("0".into()),
            "must be greater than zero",
        ));
    }

    Ok(())
}

fn require_non_empty(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(
            section,
            field,
            None,
            "must not be empty",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: &ConfigError) -> Option<&'static str> {
        match err {
            ConfigError::InvalidField { field, .. } => Some(*field),
            _ => None,
        }
    }

    #[test]
    fn defaults_are_valid() {
        validate(&RelinkConfig::default()).expect("defaults validate");
    }

    #[test]
    fn rejects_non_http_api_url() {
        let mut config = RelinkConfig::default();
        config.api.base_url = "ftp://example.test".into();
        let err = validate(&config).expect_err("ftp rejected");
        assert_eq!(field_of(&err), Some("base_url"));
    }

    #[test]
    fn rejects_nested_code_root() {
        let mut config = RelinkConfig::default();
        config.layout.code_root = "code/web".into();
        let err = validate(&config).expect_err("nested root rejected");
        assert_eq!(field_of(&err), Some("code_root"));
    }

    #[test]
    fn rejects_escaping_symlink_root() {
        let mut config = RelinkConfig::default();
        config.layout.symlink_root = "files/../../etc".into();
        let err = validate(&config).expect_err("escaping root rejected");
        assert_eq!(field_of(&err), Some("symlink_root"));
    }

    #[test]
    fn rejects_zero_port() {
        let mut config = RelinkConfig::default();
        config.transfer.ssh_port = 0;
        let err = validate(&config).expect_err("zero port rejected");
        assert_eq!(field_of(&err), Some("ssh_port"));
    }
}
