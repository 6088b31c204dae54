//! Fake collaborators for exercising the provisioning workflow without a
//! network or an rsync binary.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use relink_core::{
    ConnectionInfo, EnvironmentRecord, HostingApi, HostingError, HostingResult, ModeChange,
    SiteRecord, WorkflowHandle, WorkflowProgress, WorkflowState,
};
use relink_transfer::{CommandOutput, CommandRunner, Invocation};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Call observed by [`FakeHostingApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostingCall {
    /// `site_environment(site, env)`.
    SiteEnvironment {
        /// Requested site.
        site: String,
        /// Requested environment.
        env: String,
    },
    /// `connection_info`.
    ConnectionInfo,
    /// `change_connection_mode(mode)`.
    ChangeConnectionMode {
        /// Requested mode.
        mode: String,
    },
    /// `workflow_progress(id)`.
    WorkflowProgress {
        /// Polled workflow.
        id: String,
    },
}

/// In-memory [`HostingApi`] with one site and one environment.
#[derive(Debug)]
pub struct FakeHostingApi {
    site: SiteRecord,
    env: EnvironmentRecord,
    mode: String,
    mode_change: ModeChange,
    workflow: Mutex<VecDeque<WorkflowProgress>>,
    calls: Mutex<Vec<HostingCall>>,
}

impl FakeHostingApi {
    /// API resolving `site`/`env`, currently in `git` mode, answering mode
    /// changes immediately.
    #[must_use]
    pub fn new(site: SiteRecord, env: EnvironmentRecord) -> Self {
        Self {
            site,
            env,
            mode: "git".to_string(),
            mode_change: ModeChange::Immediate("Enabled on-server development".to_string()),
            workflow: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Current connection mode reported by `connection_info`.
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Response to `change_connection_mode`.
    #[must_use]
    pub fn with_mode_change(mut self, change: ModeChange) -> Self {
        self.mode_change = change;
        self
    }

    /// Progress snapshots returned by successive `workflow_progress` calls.
    /// The last snapshot repeats once the queue drains.
    #[must_use]
    pub fn with_workflow(self, progress: impl IntoIterator<Item = WorkflowProgress>) -> Self {
        lock(&self.workflow).extend(progress);
        self
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<HostingCall> {
        lock(&self.calls).clone()
    }

    /// Number of `change_connection_mode` calls.
    #[must_use]
    pub fn mode_change_requests(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, HostingCall::ChangeConnectionMode { .. }))
            .count()
    }

    fn record(&self, call: HostingCall) {
        lock(&self.calls).push(call);
    }
}

/// Shorthand for a progress snapshot.
#[must_use]
pub fn progress(state: WorkflowState, message: &str) -> WorkflowProgress {
    WorkflowProgress {
        state,
        message: (!message.is_empty()).then(|| message.to_string()),
    }
}

#[async_trait]
impl HostingApi for FakeHostingApi {
    async fn site_environment(
        &self,
        site: &str,
        env: &str,
    ) -> HostingResult<(SiteRecord, EnvironmentRecord)> {
        self.record(HostingCall::SiteEnvironment {
            site: site.to_string(),
            env: env.to_string(),
        });
        if site != self.site.name && site != self.site.id {
            return Err(HostingError::NotFound {
                resource: "site",
                value: site.to_string(),
            });
        }
        if env != self.env.id {
            return Err(HostingError::NotFound {
                resource: "environment",
                value: env.to_string(),
            });
        }
        Ok((self.site.clone(), self.env.clone()))
    }

    async fn connection_info(
        &self,
        _site: &SiteRecord,
        _env: &EnvironmentRecord,
    ) -> HostingResult<ConnectionInfo> {
        self.record(HostingCall::ConnectionInfo);
        Ok(ConnectionInfo {
            mode: self.mode.clone(),
        })
    }

    async fn change_connection_mode(
        &self,
        _site: &SiteRecord,
        _env: &EnvironmentRecord,
        mode: &str,
    ) -> HostingResult<ModeChange> {
        self.record(HostingCall::ChangeConnectionMode {
            mode: mode.to_string(),
        });
        Ok(self.mode_change.clone())
    }

    async fn workflow_progress(
        &self,
        _site: &SiteRecord,
        workflow: &WorkflowHandle,
    ) -> HostingResult<WorkflowProgress> {
        self.record(HostingCall::WorkflowProgress {
            id: workflow.id.clone(),
        });
        let mut queue = lock(&self.workflow);
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(next.unwrap_or_else(|| progress(WorkflowState::Succeeded, "")))
    }
}

type Predicate = Box<dyn Fn(&Invocation) -> bool + Send + Sync>;
type Hook = Box<dyn Fn(&Invocation) -> io::Result<()> + Send + Sync>;

/// [`CommandRunner`] that records invocations instead of spawning them.
#[derive(Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<Invocation>>,
    failures: Vec<(Predicate, i32)>,
    hooks: Vec<Hook>,
}

impl RecordingRunner {
    /// Runner where every command succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with `code` for invocations matching `predicate`.
    #[must_use]
    pub fn fail_when<F>(mut self, predicate: F, code: i32) -> Self
    where
        F: Fn(&Invocation) -> bool + Send + Sync + 'static,
    {
        self.failures.push((Box::new(predicate), code));
        self
    }

    /// Run `hook` for every invocation before its exit status is decided.
    #[must_use]
    pub fn on_run<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Invocation) -> io::Result<()> + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Wrap in an [`Arc`] for sharing with a gateway.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Recorded invocations.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.invocations).clone()
    }

    /// Recorded invocations rendered as command lines.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        lock(&self.invocations)
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

/// Whether the invocation carries the argument `flag`.
#[must_use]
pub fn has_arg(invocation: &Invocation, flag: &str) -> bool {
    invocation.args().iter().any(|arg| arg == flag)
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        lock(&self.invocations).push(invocation.clone());
        for hook in &self.hooks {
            hook(invocation)?;
        }
        let code = self
            .failures
            .iter()
            .find(|(predicate, _)| predicate(invocation))
            .map_or(0, |(_, code)| *code);
        Ok(CommandOutput::exited(code))
    }
}
