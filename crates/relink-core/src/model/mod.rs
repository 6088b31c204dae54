//! Domain models for remote symlink provisioning.
//!
//! # Design
//! - Requests carry raw operator input; [`ResolvedContext`] carries the
//!   validated, immutable view the workflow runs against.
//! - Remote locations are slash-separated strings relative to the
//!   application server home directory.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::path::{DestinationName, SourcePath};
use crate::service::{EnvironmentRecord, SiteRecord};

/// Operator input for one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    /// Target in `<site>.<env>` form.
    pub site_environment: String,
    /// Remote path to replace with a symlink.
    pub source_path: String,
    /// Optional name for the relocated node; defaults to the source's last segment.
    pub destination: Option<String>,
    /// Move the existing remote content to the destination instead of an empty placeholder.
    pub transfer_existing: bool,
    /// Create a file placeholder rather than a directory.
    pub point_to_file: bool,
}

/// Parsed `<site>.<env>` identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEnvironment {
    site: String,
    env: String,
}

impl SiteEnvironment {
    /// Site name or identifier.
    #[must_use]
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Environment name.
    #[must_use]
    pub fn env(&self) -> &str {
        &self.env
    }
}

impl FromStr for SiteEnvironment {
    type Err = CoreError;

    fn from_str(value: &str) -> CoreResult<Self> {
        let trimmed = value.trim();
        let Some((site, env)) = trimmed.rsplit_once('.') else {
            return Err(CoreError::InvalidSiteEnvironment {
                value: value.to_string(),
            });
        };
        if site.is_empty() || env.is_empty() {
            return Err(CoreError::InvalidSiteEnvironment {
                value: value.to_string(),
            });
        }
        Ok(Self {
            site: site.to_string(),
            env: env.to_string(),
        })
    }
}

impl Display for SiteEnvironment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.site, self.env)
    }
}

/// Kind of filesystem node staged from the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Regular file, or nothing at all.
    File,
    /// Symbolic link, regardless of what it points at.
    Symlink,
    /// Directory.
    Directory,
}

impl NodeKind {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Symlink => "symlink",
            Self::Directory => "directory",
        }
    }
}

/// A remote filesystem node: its parent directory, name and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    /// Parent directory with a trailing slash (`code/wp-content/`).
    pub parent: String,
    /// Node name within the parent.
    pub name: String,
    /// Kind used to pick the deletion strategy.
    pub kind: NodeKind,
}

impl RemoteNode {
    /// Build a node from a parent directory and name.
    #[must_use]
    pub fn new(parent: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        let mut parent = parent.into();
        if !parent.is_empty() && !parent.ends_with('/') {
            parent.push('/');
        }
        Self {
            parent,
            name: name.into(),
            kind,
        }
    }

    /// Full remote path (`code/wp-content/cache`).
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}{}", self.parent, self.name)
    }
}

/// SSH-reachable application server for one site environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteEndpoint {
    /// Environment identifier (`dev`).
    pub environment_id: String,
    /// Site identifier (UUID).
    pub site_id: String,
}

impl RemoteEndpoint {
    /// Login user, `<env>.<site>`.
    #[must_use]
    pub fn user(&self) -> String {
        format!("{}.{}", self.environment_id, self.site_id)
    }

    /// Application server host, `appserver.<env>.<site>.<suffix>`.
    #[must_use]
    pub fn host(&self, host_suffix: &str) -> String {
        format!(
            "appserver.{}.{}.{host_suffix}",
            self.environment_id, self.site_id
        )
    }

    /// `user@host` address handed to the transport.
    #[must_use]
    pub fn address(&self, host_suffix: &str) -> String {
        format!("{}@{}", self.user(), self.host(host_suffix))
    }
}

/// Validated, immutable view of one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedContext {
    environment_id: String,
    site_id: String,
    site_name: String,
    source: SourcePath,
    destination: DestinationName,
}

impl ResolvedContext {
    /// Combine the resolved hosting records with the normalised request paths.
    #[must_use]
    pub fn new(
        site: &SiteRecord,
        environment: &EnvironmentRecord,
        source: SourcePath,
        destination: Option<DestinationName>,
    ) -> Self {
        let destination = destination.unwrap_or_else(|| DestinationName::from_source(&source));
        Self {
            environment_id: environment.id.clone(),
            site_id: site.id.clone(),
            site_name: site.name.clone(),
            source,
            destination,
        }
    }

    /// Environment identifier.
    #[must_use]
    pub fn environment_id(&self) -> &str {
        &self.environment_id
    }

    /// Site identifier.
    #[must_use]
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Site display name.
    #[must_use]
    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    /// Normalised source path.
    #[must_use]
    pub const fn source(&self) -> &SourcePath {
        &self.source
    }

    /// Last segment of the source path.
    #[must_use]
    pub fn local_target(&self) -> &str {
        self.source.local_target()
    }

    /// Destination name under the symlink target root.
    #[must_use]
    pub const fn destination(&self) -> &DestinationName {
        &self.destination
    }

    /// Remote endpoint for this site environment.
    #[must_use]
    pub fn endpoint(&self) -> RemoteEndpoint {
        RemoteEndpoint {
            environment_id: self.environment_id.clone(),
            site_id: self.site_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_environment_splits_on_last_dot() {
        let parsed: SiteEnvironment = "acme.dev".parse().expect("valid identifier");
        assert_eq!(parsed.site(), "acme");
        assert_eq!(parsed.env(), "dev");
        assert_eq!(parsed.to_string(), "acme.dev");

        assert!("acme".parse::<SiteEnvironment>().is_err());
        assert!(".dev".parse::<SiteEnvironment>().is_err());
        assert!("acme.".parse::<SiteEnvironment>().is_err());
    }

    #[test]
    fn remote_endpoint_builds_connection_address() {
        let endpoint = RemoteEndpoint {
            environment_id: "dev".into(),
            site_id: "1234".into(),
        };
        assert_eq!(
            endpoint.address("drush.in"),
            "dev.1234@appserver.dev.1234.drush.in"
        );
    }

    #[test]
    fn remote_node_path_joins_parent() {
        let node = RemoteNode::new("code/wp-content", "cache", NodeKind::Directory);
        assert_eq!(node.parent, "code/wp-content/");
        assert_eq!(node.path(), "code/wp-content/cache");
    }

    #[test]
    fn resolved_context_defaults_destination_to_local_target() {
        let site = SiteRecord {
            id: "1234".into(),
            name: "acme".into(),
        };
        let env = EnvironmentRecord { id: "dev".into() };
        let source = SourcePath::normalize("wp-content/cache", "code").expect("valid path");
        let context = ResolvedContext::new(&site, &env, source, None);
        assert_eq!(context.destination().as_str(), "cache");
        assert_eq!(context.local_target(), "cache");
        assert_eq!(context.endpoint().user(), "dev.1234");

        let source = SourcePath::normalize("uploads/tmp", "code").expect("valid path");
        let custom = DestinationName::parse("custom").expect("valid destination");
        let context = ResolvedContext::new(&site, &env, source, Some(custom));
        assert_eq!(context.destination().as_str(), "custom");
        assert_eq!(context.local_target(), "tmp");
    }
}
