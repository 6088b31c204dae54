//! HTTP wiring to the hosting API, CLI exit semantics and run summaries.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use relink_api::HttpHostingApi;
use relink_config::ApiSettings;
use relink_core::HostingApi;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::Serialize;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const TELEMETRY_ENDPOINT_ENV: &str = "RELINK_TELEMETRY_ENDPOINT";
const TELEMETRY_TIMEOUT: Duration = Duration::from_secs(2);

/// Exit code for rejected input, configuration or protected targets.
pub(crate) const EXIT_REJECTED: i32 = 2;
/// Exit code for failures while talking to the platform or moving content.
pub(crate) const EXIT_FAILED: i32 = 3;

/// Why a run ended early. `Rejected` runs never touched the remote;
/// `Failed` runs may have.
#[derive(Debug)]
pub(crate) enum CliError {
    Rejected(String),
    Failed(anyhow::Error),
}

pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failed(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Rejected(_) => EXIT_REJECTED,
            Self::Failed(_) => EXIT_FAILED,
        }
    }

    /// Message printed after `error:` on stderr, with the full cause chain
    /// for failures.
    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            Self::Failed(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(_) => formatter.write_str("relink rejected the request"),
            Self::Failed(_) => formatter.write_str("relink run failed"),
        }
    }
}

impl std::error::Error for CliError {}

/// HTTP wiring built from the resolved API settings.
#[derive(Clone)]
pub(crate) struct CliDependencies {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) session_token: Option<String>,
}

impl CliDependencies {
    /// Construct an HTTP client tagging every request with `trace_id`.
    pub(crate) fn from_settings(settings: &ApiSettings, trace_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(settings.timeout())
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: parse_url(&settings.base_url).map_err(CliError::validation)?,
            session_token: settings.session_token.clone(),
        })
    }

    /// Hosting API client sharing this HTTP client.
    pub(crate) fn hosting_api(&self) -> Arc<dyn HostingApi> {
        Arc::new(HttpHostingApi::new(
            self.client.clone(),
            self.base_url.clone(),
            self.session_token.clone(),
        ))
    }
}

/// Posts a [`RunSummary`] to `RELINK_TELEMETRY_ENDPOINT` when it is set.
#[derive(Clone)]
pub(crate) struct TelemetryEmitter {
    pub(crate) client: Client,
    pub(crate) endpoint: Url,
}

impl TelemetryEmitter {
    #[must_use]
    pub(crate) fn from_env() -> Option<Self> {
        let endpoint = std::env::var(TELEMETRY_ENDPOINT_ENV)
            .ok()?
            .parse()
            .ok()?;
        let client = Client::builder()
            .timeout(TELEMETRY_TIMEOUT)
            .build()
            .ok()?;
        Some(Self { client, endpoint })
    }

    /// Best effort; a failed post only shows up in debug logs.
    pub(crate) async fn emit(&self, summary: &RunSummary<'_>) {
        let sent = self
            .client
            .post(self.endpoint.clone())
            .json(summary)
            .send()
            .await;
        if let Err(err) = sent {
            tracing::debug!(error = %err, endpoint = %self.endpoint, "run summary not delivered");
        }
    }
}

/// What one `relink` invocation did, as reported to telemetry.
#[derive(Debug, Serialize)]
pub(crate) struct RunSummary<'a> {
    pub(crate) trace_id: &'a str,
    pub(crate) command: &'static str,
    pub(crate) site_env: &'a str,
    pub(crate) succeeded: bool,
    pub(crate) exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<&'a str>,
    pub(crate) elapsed_ms: u64,
    pub(crate) build_sha: &'static str,
}

impl RunSummary<'_> {
    pub(crate) fn elapsed_ms(started: Instant) -> u64 {
        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Parse an API URL.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}
