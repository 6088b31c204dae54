//! # Design
//!
//! - One request per trait method step; no retries.
//! - 404 maps to [`HostingError::NotFound`] so a mistyped site or
//!   environment reads as a lookup failure, not a transport problem.
//! - The connection-mode change answers either with a bare JSON string or a
//!   workflow reference; both shapes decode into [`ModeChange`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use relink_core::{
    ConnectionInfo, EnvironmentRecord, HostingApi, HostingError, HostingResult, ModeChange,
    SiteRecord, WorkflowHandle, WorkflowProgress,
};

/// [`HostingApi`] over HTTP/JSON.
#[derive(Clone)]
pub struct HttpHostingApi {
    client: Client,
    base_url: Url,
    session_token: Option<String>,
}

#[derive(Serialize)]
struct ModeRequest<'a> {
    mode: &'a str,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ModeChangeBody {
    Message(String),
    Workflow(WorkflowHandle),
}

impl HttpHostingApi {
    /// Client sending requests below `base_url`, authenticated with
    /// `session_token` when present.
    #[must_use]
    pub const fn new(client: Client, base_url: Url, session_token: Option<String>) -> Self {
        Self {
            client,
            base_url,
            session_token,
        }
    }

    fn endpoint(&self, operation: &'static str, segments: &[&str]) -> HostingResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| HostingError::Request {
                operation,
                detail: format!("base URL '{}' cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        not_found: Option<(&'static str, &str)>,
    ) -> HostingResult<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| HostingError::Request {
                operation,
                detail: err.to_string(),
            })?;
        let status = response.status();
        debug!(operation, status = status.as_u16(), "hosting api response");

        if status == StatusCode::NOT_FOUND
            && let Some((resource, value)) = not_found
        {
            return Err(HostingError::NotFound {
                resource,
                value: value.to_string(),
            });
        }
        if !status.is_success() {
            return Err(HostingError::Status {
                operation,
                status: status.as_u16(),
                detail: problem_detail(response).await,
            });
        }

        response.json::<T>().await.map_err(|err| HostingError::Decode {
            operation,
            detail: err.to_string(),
        })
    }
}

async fn problem_detail(response: Response) -> Option<String> {
    let bytes = response.bytes().await.ok()?;
    if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
        for key in ["detail", "message", "title"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return Some(text.to_string());
            }
        }
    }
    let text = String::from_utf8_lossy(&bytes).trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl HostingApi for HttpHostingApi {
    async fn site_environment(
        &self,
        site: &str,
        env: &str,
    ) -> HostingResult<(SiteRecord, EnvironmentRecord)> {
        let url = self.endpoint("sites.get", &["sites", site])?;
        let site_record: SiteRecord = self
            .send("sites.get", self.client.get(url), Some(("site", site)))
            .await?;

        let url = self.endpoint(
            "environments.get",
            &["sites", site_record.id.as_str(), "environments", env],
        )?;
        let env_record: EnvironmentRecord = self
            .send(
                "environments.get",
                self.client.get(url),
                Some(("environment", env)),
            )
            .await?;
        Ok((site_record, env_record))
    }

    async fn connection_info(
        &self,
        site: &SiteRecord,
        env: &EnvironmentRecord,
    ) -> HostingResult<ConnectionInfo> {
        let url = self.endpoint(
            "connection.get",
            &["sites", site.id.as_str(), "environments", env.id.as_str(), "connection"],
        )?;
        self.send("connection.get", self.client.get(url), None).await
    }

    async fn change_connection_mode(
        &self,
        site: &SiteRecord,
        env: &EnvironmentRecord,
        mode: &str,
    ) -> HostingResult<ModeChange> {
        let url = self.endpoint(
            "connection.set",
            &["sites", site.id.as_str(), "environments", env.id.as_str(), "connection"],
        )?;
        let body: ModeChangeBody = self
            .send(
                "connection.set",
                self.client.put(url).json(&ModeRequest { mode }),
                None,
            )
            .await?;
        Ok(match body {
            ModeChangeBody::Message(message) => ModeChange::Immediate(message),
            ModeChangeBody::Workflow(handle) => ModeChange::Pending(handle),
        })
    }

    async fn workflow_progress(
        &self,
        site: &SiteRecord,
        workflow: &WorkflowHandle,
    ) -> HostingResult<WorkflowProgress> {
        let url = self.endpoint(
            "workflows.get",
            &["sites", site.id.as_str(), "workflows", workflow.id.as_str()],
        )?;
        self.send(
            "workflows.get",
            self.client.get(url),
            Some(("workflow", workflow.id.as_str())),
        )
        .await
    }
}
