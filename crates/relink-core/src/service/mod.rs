//! Hosting platform API consumed by the environment guard.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HostingResult;

/// Site resolved from an operator-supplied name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    /// Stable site identifier used in remote addressing.
    pub id: String,
    /// Human-readable site name.
    pub name: String,
}

/// Environment resolved within a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    /// Environment identifier (`dev`, `test`, `live`, or a multidev name).
    pub id: String,
}

/// Connection metadata for an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Current connection mode (`git`, `sftp`).
    pub mode: String,
}

/// Handle to an asynchronous platform workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowHandle {
    /// Workflow identifier.
    pub id: String,
}

/// Result of requesting a connection-mode change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeChange {
    /// The platform answered immediately with a textual result.
    Immediate(String),
    /// The platform queued a workflow that must be polled to completion.
    Pending(WorkflowHandle),
}

/// Lifecycle state of a platform workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Still running.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error.
    Failed,
}

/// Progress snapshot for a platform workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowProgress {
    /// Current state.
    pub state: WorkflowState,
    /// Latest progress or result message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Site/environment lookup and connection-mode control.
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// Resolve a site and one of its environments by name.
    async fn site_environment(
        &self,
        site: &str,
        env: &str,
    ) -> HostingResult<(SiteRecord, EnvironmentRecord)>;

    /// Fetch the environment's connection metadata.
    async fn connection_info(
        &self,
        site: &SiteRecord,
        env: &EnvironmentRecord,
    ) -> HostingResult<ConnectionInfo>;

    /// Request a connection-mode change.
    async fn change_connection_mode(
        &self,
        site: &SiteRecord,
        env: &EnvironmentRecord,
        mode: &str,
    ) -> HostingResult<ModeChange>;

    /// Poll a workflow started by [`HostingApi::change_connection_mode`].
    async fn workflow_progress(
        &self,
        site: &SiteRecord,
        workflow: &WorkflowHandle,
    ) -> HostingResult<WorkflowProgress>;
}
