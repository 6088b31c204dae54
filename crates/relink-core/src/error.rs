//! # Design
//!
//! - Keep error messages constant; carry the offending input as fields.
//! - Separate request validation failures from hosting API failures so the
//!   CLI can map them to distinct exit codes.

use thiserror::Error;

/// Result alias for request validation.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result alias for hosting API calls.
pub type HostingResult<T> = Result<T, HostingError>;

/// Validation failures raised while building a provisioning request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The `site.env` identifier could not be parsed.
    #[error("invalid site environment identifier")]
    InvalidSiteEnvironment {
        /// Identifier supplied by the caller.
        value: String,
    },
    /// The source path could not be normalised.
    #[error("invalid source path")]
    InvalidSourcePath {
        /// Path supplied by the caller.
        value: String,
        /// Static reason for the rejection.
        reason: &'static str,
    },
    /// The destination name is not a single path segment.
    #[error("invalid destination name")]
    InvalidDestination {
        /// Destination supplied by the caller.
        value: String,
        /// Static reason for the rejection.
        reason: &'static str,
    },
}

impl CoreError {
    /// Offending value carried by the error.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::InvalidSiteEnvironment { value }
            | Self::InvalidSourcePath { value, .. }
            | Self::InvalidDestination { value, .. } => value,
        }
    }

    /// Static reason describing the rejection.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidSiteEnvironment { .. } => "expected <site>.<env>",
            Self::InvalidSourcePath { reason, .. } | Self::InvalidDestination { reason, .. } => {
                *reason
            }
        }
    }
}

/// Failures reported by a [`crate::HostingApi`] implementation.
#[derive(Debug, Error)]
pub enum HostingError {
    /// The requested site or environment does not exist.
    #[error("hosting resource not found")]
    NotFound {
        /// Kind of resource that was looked up (`site`, `environment`, `workflow`).
        resource: &'static str,
        /// Identifier that failed to resolve.
        value: String,
    },
    /// The request could not be sent or the response could not be read.
    #[error("hosting request failed")]
    Request {
        /// Operation identifier.
        operation: &'static str,
        /// Transport error detail.
        detail: String,
    },
    /// The API answered with a non-success status.
    #[error("hosting response status error")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status code returned by the API.
        status: u16,
        /// Response body or problem detail, when present.
        detail: Option<String>,
    },
    /// The response body did not match the expected shape.
    #[error("hosting response decode failed")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Decoder error detail.
        detail: String,
    },
}

impl HostingError {
    /// Human-readable detail used when rendering the error for operators.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::NotFound { resource, value } => format!("{resource} '{value}' was not found"),
            Self::Request { operation, detail } | Self::Decode { operation, detail } => {
                format!("{operation}: {detail}")
            }
            Self::Status {
                operation,
                status,
                detail,
            } => detail.as_ref().map_or_else(
                || format!("{operation}: status {status}"),
                |detail| format!("{operation}: {detail} (status {status})"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_exposes_value_and_reason() {
        let err = CoreError::InvalidSourcePath {
            value: "../etc".into(),
            reason: "parent segments are not allowed",
        };
        assert_eq!(err.value(), "../etc");
        assert_eq!(err.reason(), "parent segments are not allowed");

        let err = CoreError::InvalidSiteEnvironment {
            value: "nodot".into(),
        };
        assert_eq!(err.reason(), "expected <site>.<env>");
    }

    #[test]
    fn hosting_error_detail_includes_status() {
        let err = HostingError::Status {
            operation: "site.lookup",
            status: 503,
            detail: Some("maintenance".into()),
        };
        assert_eq!(err.detail(), "site.lookup: maintenance (status 503)");

        let err = HostingError::NotFound {
            resource: "site",
            value: "acme".into(),
        };
        assert_eq!(err.detail(), "site 'acme' was not found");
    }
}
