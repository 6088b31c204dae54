//! Environment safety checks and connection-mode handling.
//!
//! # Design
//! - Protected environments are rejected before any API call, and again once
//!   the platform has resolved the environment id.
//! - Request paths are normalised before anything remote is touched.
//! - A mode change answered with a workflow is polled until it settles or the
//!   switch timeout elapses; there is no retry.

use std::sync::Arc;

use relink_config::GuardSettings;
use relink_core::{
    DestinationName, EnvironmentRecord, HostingApi, ModeChange, ProvisioningRequest,
    ResolvedContext, SiteEnvironment, SiteRecord, SourcePath, WorkflowHandle, WorkflowState,
};
use tokio::time::{Instant, sleep};
use tracing::{info, warn};

use crate::error::{ProvisionError, ProvisionResult};

/// Validates requests and prepares the target environment for writes.
#[derive(Clone)]
pub struct EnvironmentGuard {
    api: Arc<dyn HostingApi>,
    settings: GuardSettings,
    code_root: String,
    dry_run: bool,
}

impl EnvironmentGuard {
    /// Guard resolving sites through `api`, rooting source paths under
    /// `code_root`.
    #[must_use]
    pub fn new(
        api: Arc<dyn HostingApi>,
        settings: GuardSettings,
        code_root: impl Into<String>,
    ) -> Self {
        Self {
            api,
            settings,
            code_root: code_root.into(),
            dry_run: false,
        }
    }

    /// Log the connection-mode switch instead of requesting it.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validate `request`, resolve its site environment and make sure the
    /// environment accepts direct writes.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::EnvironmentProtected`] for protected
    /// environments, [`ProvisionError::InvalidRequest`] for malformed input,
    /// [`ProvisionError::SiteLookup`] when the platform cannot resolve the
    /// target and [`ProvisionError::ConnectionModeSwitch`] when the mode
    /// cannot be changed.
    pub async fn validate(
        &self,
        request: &ProvisioningRequest,
    ) -> ProvisionResult<ResolvedContext> {
        let target: SiteEnvironment = request.site_environment.parse()?;
        self.ensure_unprotected(target.env())?;

        let source = SourcePath::normalize(&request.source_path, &self.code_root)?;
        let destination = request
            .destination
            .as_deref()
            .map(DestinationName::parse)
            .transpose()?;

        let (site, env) = self
            .api
            .site_environment(target.site(), target.env())
            .await
            .map_err(|source| ProvisionError::SiteLookup { source })?;
        self.ensure_unprotected(&env.id)?;
        info!(site = %site.name, site_id = %site.id, env = %env.id, "resolved site environment");

        self.ensure_direct_write(&site, &env).await?;
        Ok(ResolvedContext::new(&site, &env, source, destination))
    }

    fn ensure_unprotected(&self, env: &str) -> ProvisionResult<()> {
        let normalized = env.trim().to_ascii_lowercase();
        if self.settings.protected().contains(&normalized) {
            warn!(env, "refusing to provision on a protected environment");
            return Err(ProvisionError::EnvironmentProtected {
                env: env.to_string(),
            });
        }
        Ok(())
    }

    async fn ensure_direct_write(
        &self,
        site: &SiteRecord,
        env: &EnvironmentRecord,
    ) -> ProvisionResult<()> {
        let wanted = self.settings.direct_write_mode.as_str();
        let switch_failed = |message: String| ProvisionError::ConnectionModeSwitch {
            env: env.id.clone(),
            message,
        };

        let info = self
            .api
            .connection_info(site, env)
            .await
            .map_err(|err| switch_failed(err.detail()))?;
        if info.mode.eq_ignore_ascii_case(wanted) {
            info!(mode = %info.mode, "connection mode already allows direct writes");
            return Ok(());
        }
        if self.dry_run {
            info!(from = %info.mode, to = wanted, "dry run: connection mode not changed");
            return Ok(());
        }

        info!(from = %info.mode, to = wanted, "switching connection mode");
        let change = self
            .api
            .change_connection_mode(site, env, wanted)
            .await
            .map_err(|err| switch_failed(err.detail()))?;
        match change {
            ModeChange::Immediate(message) => {
                info!(%message, "connection mode changed");
                Ok(())
            }
            ModeChange::Pending(handle) => self
                .await_workflow(site, &handle)
                .await
                .map_err(switch_failed),
        }
    }

    async fn await_workflow(
        &self,
        site: &SiteRecord,
        handle: &WorkflowHandle,
    ) -> Result<(), String> {
        let interval = self.settings.poll_interval();
        let deadline = Instant::now() + self.settings.switch_timeout();
        let mut last_message: Option<String> = None;

        loop {
            let progress = self
                .api
                .workflow_progress(site, handle)
                .await
                .map_err(|err| err.detail())?;
            if progress.message.is_some() && progress.message != last_message {
                info!(
                    workflow = %handle.id,
                    message = progress.message.as_deref().unwrap_or_default(),
                    "connection mode workflow progress"
                );
                last_message.clone_from(&progress.message);
            }

            match progress.state {
                WorkflowState::Succeeded => {
                    info!(workflow = %handle.id, "connection mode workflow finished");
                    return Ok(());
                }
                WorkflowState::Failed => {
                    return Err(last_message.unwrap_or_else(|| "workflow failed".to_string()));
                }
                WorkflowState::Running => {}
            }

            if Instant::now() + interval > deadline {
                return Err(format!(
                    "timed out after {}s waiting for workflow {}",
                    self.settings.switch_timeout_secs, handle.id
                ));
            }
            sleep(interval).await;
        }
    }
}
