//! Remote symlink provisioning state machine.
//!
//! # Design
//! - States run strictly in order: validating, downloading, classifying,
//!   deleting, staging, link building, uploading, done. Any error moves the
//!   run to `failed` and stops it.
//! - Every step logs a notice, then records started and completed, skipped
//!   or failed in the step journal carried by the report.
//! - Once deletion has started the remote may already be missing content; a
//!   failure from that point logs where the staged backup lives.

use std::future::Future;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use relink_core::{NodeKind, ProvisioningRequest, RemoteNode, ResolvedContext};
use relink_fsops::{
    Classification, PlaceholderKind, StagingSession, classify_node, create_symlink, link_target,
};
use relink_transfer::{DeleteScratch, TransferGateway};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{ProvisionError, ProvisionResult};
use crate::guard::EnvironmentGuard;

/// Workflow state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionState {
    /// Guard checks and staging setup.
    Validating,
    /// Mirroring the remote source into staging.
    Downloading,
    /// Classifying the staged copy.
    Classifying,
    /// Removing the remote source and the prior destination.
    Deleting,
    /// Placing content at the symlink destination.
    Staging,
    /// Building the symlink locally.
    LinkBuilding,
    /// Uploading the symlink in place of the source.
    Uploading,
    /// Finished successfully.
    Done,
    /// Stopped by an error.
    Failed,
}

impl ProvisionState {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Downloading => "downloading",
            Self::Classifying => "classifying",
            Self::Deleting => "deleting",
            Self::Staging => "staging",
            Self::LinkBuilding => "link_building",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    const fn notice(self) -> &'static str {
        match self {
            Self::Validating => "Validating the site environment",
            Self::Downloading => "Downloading the source to local staging",
            Self::Classifying => "Inspecting the staged source",
            Self::Deleting => "Removing the source and any previous destination",
            Self::Staging => "Placing content at the symlink destination",
            Self::LinkBuilding => "Building the symlink",
            Self::Uploading => "Uploading the symlink",
            Self::Done => "DONE!",
            Self::Failed => "Provisioning failed",
        }
    }
}

/// Status of a recorded step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step began.
    Started,
    /// Step finished.
    Completed,
    /// Step failed.
    Failed,
    /// Step had nothing to do.
    Skipped,
}

impl StepStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Journal entry for one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Step the entry describes.
    pub step: ProvisionState,
    /// Latest status.
    pub status: StepStatus,
    /// Optional detail.
    pub detail: Option<String>,
    /// Time of the latest status change.
    pub updated_at: DateTime<Utc>,
}

enum StepOutcome {
    Completed(Option<String>),
    Skipped(Option<String>),
}

impl StepOutcome {
    const fn status(&self) -> StepStatus {
        match self {
            Self::Completed(_) => StepStatus::Completed,
            Self::Skipped(_) => StepStatus::Skipped,
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            Self::Completed(detail) | Self::Skipped(detail) => detail.as_deref(),
        }
    }
}

#[derive(Default)]
struct StepJournal {
    records: Vec<StepRecord>,
    staging_dir: Option<PathBuf>,
}

impl StepJournal {
    fn record(&mut self, step: ProvisionState, status: StepStatus, detail: Option<&str>) {
        debug!(
            step = step.as_str(),
            status = status.as_str(),
            detail = detail.unwrap_or_default(),
            "step status"
        );
        let updated_at = Utc::now();
        let detail = detail.map(str::to_string);
        if let Some(existing) = self.records.iter_mut().find(|record| record.step == step) {
            existing.status = status;
            existing.detail = detail;
            existing.updated_at = updated_at;
        } else {
            self.records.push(StepRecord {
                step,
                status,
                detail,
                updated_at,
            });
        }
    }

    fn reached(&self, step: ProvisionState) -> bool {
        self.records.iter().any(|record| record.step >= step)
    }
}

async fn execute_step<T, Fut>(
    journal: &mut StepJournal,
    step: ProvisionState,
    op: Fut,
) -> ProvisionResult<T>
where
    Fut: Future<Output = ProvisionResult<(T, StepOutcome)>>,
{
    info!(step = step.as_str(), "{}", step.notice());
    journal.record(step, StepStatus::Started, None);
    match op.await {
        Ok((value, outcome)) => {
            journal.record(step, outcome.status(), outcome.detail());
            Ok(value)
        }
        Err(err) => {
            let detail = err.render();
            journal.record(step, StepStatus::Failed, Some(&detail));
            Err(err)
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    /// Resolved request.
    pub context: ResolvedContext,
    /// Final state.
    pub state: ProvisionState,
    /// Kind of the staged source.
    pub source_kind: NodeKind,
    /// Whether nothing existed at the source.
    pub source_absent: bool,
    /// Target of the uploaded symlink.
    pub link_target: String,
    /// Staging directory of the run.
    pub staging_dir: PathBuf,
    /// Whether the staging directory was removed.
    pub staging_purged: bool,
    /// Step journal.
    pub steps: Vec<StepRecord>,
}

/// Layout settings the orchestrator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Remote directory holding relocated content (`files/symlink_target`).
    pub symlink_root: String,
    /// Local staging root.
    pub staging_root: PathBuf,
    /// Remove the staging session after success.
    pub purge_on_success: bool,
}

impl OrchestratorSettings {
    fn remote_root(&self) -> String {
        format!("{}/", self.symlink_root.trim_matches('/'))
    }
}

/// Drives one provisioning run through every state.
pub struct SymlinkOrchestrator {
    guard: EnvironmentGuard,
    gateway: TransferGateway,
    settings: OrchestratorSettings,
}

impl SymlinkOrchestrator {
    /// Orchestrator validating with `guard` and transferring with `gateway`.
    #[must_use]
    pub const fn new(
        guard: EnvironmentGuard,
        gateway: TransferGateway,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            guard,
            gateway,
            settings,
        }
    }

    /// Replace the request's source path with a symlink into the symlink
    /// root.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProvisionError`] raised by any step.
    pub async fn run(&self, request: &ProvisioningRequest) -> ProvisionResult<ProvisionReport> {
        let mut journal = StepJournal::default();
        match self.drive(request, &mut journal).await {
            Ok(mut report) => {
                report.steps = journal.records;
                Ok(report)
            }
            Err(err) => {
                error!(
                    state = ProvisionState::Failed.as_str(),
                    error = %err.render(),
                    "{}",
                    ProvisionState::Failed.notice()
                );
                if journal.reached(ProvisionState::Deleting) {
                    let backup = journal
                        .staging_dir
                        .as_ref()
                        .map(|dir| dir.join("download").display().to_string())
                        .unwrap_or_default();
                    warn!(
                        %backup,
                        "remote content may already be removed; restore it from the staged \
                         backup. Re-running is not guaranteed to be idempotent past this point"
                    );
                }
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        request: &ProvisioningRequest,
        journal: &mut StepJournal,
    ) -> ProvisionResult<ProvisionReport> {
        let (context, session) = execute_step(journal, ProvisionState::Validating, async {
            let context = self.guard.validate(request).await?;
            let namespace = format!("{}.{}", context.site_name(), context.environment_id());
            let session = StagingSession::open(
                &self.settings.staging_root,
                &namespace,
                context.local_target(),
            )
            .map_err(|source| ProvisionError::staging("staging.open", source))?;
            let detail = format!("{} on {namespace}", context.source());
            Ok::<_, ProvisionError>(((context, session), StepOutcome::Completed(Some(detail))))
        })
        .await?;
        journal.staging_dir = Some(session.root().to_path_buf());

        let endpoint = context.endpoint();
        let source = context.source();
        let local_target = context.local_target();
        let destination = context.destination();

        execute_step(journal, ProvisionState::Downloading, async {
            self.gateway
                .download(&endpoint, source.as_str(), &session.download_dir())
                .await
                .map_err(|source| ProvisionError::transfer("download", source))?;
            Ok::<_, ProvisionError>(((), StepOutcome::Completed(None)))
        })
        .await?;

        let staged = session.staged_path(local_target);
        let Classification { kind, fallback } =
            execute_step(journal, ProvisionState::Classifying, async {
                let classification = classify_node(&staged)
                    .map_err(|source| ProvisionError::staging("classify", source))?;
                let detail = if classification.fallback {
                    "nothing staged; treating the source as a file".to_string()
                } else {
                    classification.kind.as_str().to_string()
                };
                Ok::<_, ProvisionError>((classification, StepOutcome::Completed(Some(detail))))
            })
            .await?;

        let void_dir = session.void_dir();
        let removed_dir = session.removed_dir();
        let scratch = DeleteScratch {
            void_dir: &void_dir,
            removed_dir: &removed_dir,
        };
        execute_step(journal, ProvisionState::Deleting, async {
            if fallback {
                info!(source = %source, "source is absent remotely; nothing to remove");
            } else {
                let node = RemoteNode::new(source.parent(), local_target, kind);
                self.gateway
                    .delete(&endpoint, &node, scratch)
                    .await
                    .map_err(|source| ProvisionError::transfer("delete_source", source))?;
            }
            let previous_kind = if kind == NodeKind::Directory {
                NodeKind::Directory
            } else {
                NodeKind::File
            };
            let previous = RemoteNode::new(
                self.settings.remote_root(),
                destination.as_str(),
                previous_kind,
            );
            self.gateway
                .delete(&endpoint, &previous, scratch)
                .await
                .map_err(|source| ProvisionError::transfer("delete_destination", source))?;
            let outcome = if fallback {
                StepOutcome::Skipped(Some("source absent; cleared previous destination".into()))
            } else {
                StepOutcome::Completed(None)
            };
            Ok::<_, ProvisionError>(((), outcome))
        })
        .await?;

        execute_step(journal, ProvisionState::Staging, async {
            let remote_root = self.settings.remote_root();
            if request.transfer_existing && !fallback {
                // Uploaded into the root itself so rsync creates it on a first run.
                let existing = session
                    .stage_existing(&staged, destination.as_str())
                    .map_err(|source| ProvisionError::staging("staging.existing", source))?;
                self.gateway
                    .upload(&existing, false, &endpoint, &remote_root)
                    .await
                    .map_err(|source| ProvisionError::transfer("transfer_existing", source))?;
                return Ok::<_, ProvisionError>((
                    (),
                    StepOutcome::Completed(Some(format!(
                        "moved existing content to {remote_root}{destination}"
                    ))),
                ));
            }
            if request.transfer_existing {
                warn!(
                    source = %source,
                    "nothing was staged to transfer; creating an empty placeholder instead"
                );
            }

            let placeholder_kind = if request.point_to_file {
                PlaceholderKind::File
            } else {
                PlaceholderKind::Directory
            };
            let placeholder = session
                .create_placeholder(destination.as_str(), placeholder_kind)
                .map_err(|source| ProvisionError::staging("placeholder", source))?;
            self.gateway
                .upload(&placeholder, false, &endpoint, &remote_root)
                .await
                .map_err(|source| ProvisionError::transfer("upload_placeholder", source))?;
            Ok::<_, ProvisionError>((
                (),
                StepOutcome::Completed(Some(format!(
                    "created empty {} {remote_root}{destination}",
                    if request.point_to_file { "file" } else { "directory" }
                ))),
            ))
        })
        .await?;

        let link_path = session.link_dir().join(destination.as_str());
        let target = execute_step(journal, ProvisionState::LinkBuilding, async {
            let target = link_target(source, &self.settings.symlink_root, destination);
            create_symlink(&link_path, &target)
                .map_err(|source| ProvisionError::staging("link", source))?;
            let detail = format!("{destination} -> {target}");
            Ok::<_, ProvisionError>((target, StepOutcome::Completed(Some(detail))))
        })
        .await?;

        execute_step(journal, ProvisionState::Uploading, async {
            self.gateway
                .upload(&link_path, false, &endpoint, source.parent())
                .await
                .map_err(|source| ProvisionError::transfer("upload_link", source))?;
            Ok::<_, ProvisionError>((
                (),
                StepOutcome::Completed(Some(format!("{}{destination}", source.parent()))),
            ))
        })
        .await?;

        let staging_dir = session.root().to_path_buf();
        let staging_purged = self.settings.purge_on_success;
        execute_step(journal, ProvisionState::Done, async {
            if staging_purged {
                session
                    .purge()
                    .map_err(|source| ProvisionError::staging("staging.purge", source))?;
                return Ok::<_, ProvisionError>(((), StepOutcome::Completed(None)));
            }
            Ok::<_, ProvisionError>((
                (),
                StepOutcome::Skipped(Some("staging kept as a backup".into())),
            ))
        })
        .await?;

        Ok(ProvisionReport {
            context,
            state: ProvisionState::Done,
            source_kind: kind,
            source_absent: fallback,
            link_target: target,
            staging_dir,
            staging_purged,
            steps: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_keeps_one_record_per_step() {
        let mut journal = StepJournal::default();
        journal.record(ProvisionState::Downloading, StepStatus::Started, None);
        journal.record(ProvisionState::Downloading, StepStatus::Completed, Some("ok"));
        assert_eq!(journal.records.len(), 1);
        assert_eq!(journal.records[0].status, StepStatus::Completed);
        assert!(!journal.reached(ProvisionState::Deleting));

        journal.record(ProvisionState::Deleting, StepStatus::Started, None);
        assert!(journal.reached(ProvisionState::Deleting));
    }

    #[test]
    fn remote_root_has_single_trailing_slash() {
        let settings = OrchestratorSettings {
            symlink_root: "files/symlink_target/".into(),
            staging_root: PathBuf::from("/tmp"),
            purge_on_success: false,
        };
        assert_eq!(settings.remote_root(), "files/symlink_target/");
    }

    #[test]
    fn state_labels_serialize_as_snake_case() -> Result<(), serde_json::Error> {
        assert_eq!(
            serde_json::to_string(&ProvisionState::LinkBuilding)?,
            "\"link_building\""
        );
        assert_eq!(ProvisionState::LinkBuilding.as_str(), "link_building");
        Ok(())
    }
}
