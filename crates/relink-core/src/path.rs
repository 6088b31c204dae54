//! Source path normalisation and relative link prefixes.
//!
//! Remote paths are always slash-separated and relative to the application
//! server's home directory, so they are modelled as strings rather than
//! `Path`s.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::error::{CoreError, CoreResult};

/// A remote source path rooted under the canonical top-level segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SourcePath {
    normalized: String,
}

impl SourcePath {
    /// Normalise a caller-supplied path.
    ///
    /// Leading, trailing and repeated slashes are dropped. When the first
    /// segment is not `root`, the root segment is prefixed once, so
    /// normalising an already-normalised path is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSourcePath`] when the path is empty,
    /// contains `.` or `..` segments, or names the root segment itself.
    pub fn normalize(raw: &str, root: &str) -> CoreResult<Self> {
        let reject = |reason: &'static str| CoreError::InvalidSourcePath {
            value: raw.to_string(),
            reason,
        };

        let mut segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(reject("path is empty"));
        }
        if segments.iter().any(|s| *s == "." || *s == "..") {
            return Err(reject("relative segments are not allowed"));
        }
        if segments[0] != root {
            segments.insert(0, root);
        }
        if segments.len() < 2 {
            return Err(reject("path must name a node below the root segment"));
        }

        Ok(Self {
            normalized: segments.join("/"),
        })
    }

    /// Normalised path, e.g. `code/wp-content/cache`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Number of slash-separated segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.normalized.split('/').count()
    }

    /// Last path segment; the name of the node being replaced.
    #[must_use]
    pub fn local_target(&self) -> &str {
        self.normalized
            .rsplit_once('/')
            .map_or(self.normalized.as_str(), |(_, name)| name)
    }

    /// Parent directory including its trailing slash, e.g. `code/wp-content/`.
    #[must_use]
    pub fn parent(&self) -> &str {
        self.normalized
            .rfind('/')
            .map_or("", |index| &self.normalized[..=index])
    }
}

impl Display for SourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

/// Name of the relocated node under the symlink target root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DestinationName(String);

impl DestinationName {
    /// Validate a destination name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDestination`] unless the value is a single
    /// non-empty path segment other than `.` and `..`.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let reject = |reason: &'static str| CoreError::InvalidDestination {
            value: raw.to_string(),
            reason,
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(reject("destination is empty"));
        }
        if trimmed.contains('/') {
            return Err(reject("destination must be a single path segment"));
        }
        if trimmed == "." || trimmed == ".." {
            return Err(reject("relative segments are not allowed"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Destination defaulted from the source path's last segment.
    #[must_use]
    pub fn from_source(source: &SourcePath) -> Self {
        Self(source.local_target().to_string())
    }

    /// Borrow the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DestinationName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relative prefix leading from a node's directory back to the home root.
///
/// A node at depth `N` lives `N - 1` directories deep, so the prefix holds
/// exactly `N - 1` `../` components.
#[must_use]
pub fn relative_prefix(depth: usize) -> String {
    "../".repeat(depth.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_prefixes_root_once() {
        let path = SourcePath::normalize("wp-content/cache", "code").expect("valid path");
        assert_eq!(path.as_str(), "code/wp-content/cache");

        let path = SourcePath::normalize("/code/wp-content/cache/", "code").expect("valid path");
        assert_eq!(path.as_str(), "code/wp-content/cache");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "/code/wp-content/cache",
            "uploads//tmp/",
            "code/a",
            "codex/a",
            "sites/default/files",
        ] {
            let once = SourcePath::normalize(raw, "code").expect("valid path");
            let twice = SourcePath::normalize(once.as_str(), "code").expect("valid path");
            assert_eq!(once, twice, "normalising {raw} twice changed the result");
            assert!(once.as_str().starts_with("code/"));
            assert!(!once.as_str().starts_with("code/code/"));
        }
    }

    #[test]
    fn normalize_treats_lookalike_root_as_unrooted() {
        let path = SourcePath::normalize("codex/a", "code").expect("valid path");
        assert_eq!(path.as_str(), "code/codex/a");
    }

    #[test]
    fn normalize_rejects_unsafe_inputs() {
        assert!(SourcePath::normalize("", "code").is_err());
        assert!(SourcePath::normalize("///", "code").is_err());
        assert!(SourcePath::normalize("code", "code").is_err());
        assert!(SourcePath::normalize("code/../etc", "code").is_err());
        assert!(SourcePath::normalize("./cache", "code").is_err());
    }

    #[test]
    fn source_path_accessors() {
        let path = SourcePath::normalize("code/wp-content/cache", "code").expect("valid path");
        assert_eq!(path.depth(), 3);
        assert_eq!(path.local_target(), "cache");
        assert_eq!(path.parent(), "code/wp-content/");
    }

    #[test]
    fn relative_prefix_counts_parent_hops() {
        for depth in 1..8 {
            let prefix = relative_prefix(depth);
            assert_eq!(prefix.matches("../").count(), depth - 1);
        }
        assert_eq!(relative_prefix(3), "../../");
        assert_eq!(relative_prefix(0), "");
    }

    #[test]
    fn destination_requires_single_segment() {
        assert_eq!(
            DestinationName::parse(" custom ").expect("valid").as_str(),
            "custom"
        );
        assert!(DestinationName::parse("a/b").is_err());
        assert!(DestinationName::parse("..").is_err());
        assert!(DestinationName::parse("  ").is_err());
    }
}
