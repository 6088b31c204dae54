//! Download, delete and upload against one application server.

use std::path::Path;
use std::sync::Arc;

use relink_config::TransferSettings;
use relink_core::{NodeKind, RemoteEndpoint, RemoteNode};
use tracing::{debug, warn};

use crate::error::{TransferError, TransferResult};
use crate::invocation::Invocation;
use crate::rsync;
use crate::runner::CommandRunner;

/// Local scratch directories used by deletes.
#[derive(Debug, Clone, Copy)]
pub struct DeleteScratch<'a> {
    /// Always-empty directory synced over the parent of a removed directory.
    pub void_dir: &'a Path,
    /// Sink for files fetched back while removing them remotely.
    pub removed_dir: &'a Path,
}

/// Remote copy operations over rsync.
#[derive(Clone)]
pub struct TransferGateway {
    settings: TransferSettings,
    runner: Arc<dyn CommandRunner>,
}

impl TransferGateway {
    /// Gateway running commands through `runner`.
    #[must_use]
    pub fn new(settings: TransferSettings, runner: Arc<dyn CommandRunner>) -> Self {
        Self { settings, runner }
    }

    /// Transfer settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Mirror `remote_path` into `local_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot run or exits non-zero.
    pub async fn download(
        &self,
        endpoint: &RemoteEndpoint,
        remote_path: &str,
        local_dir: &Path,
    ) -> TransferResult<()> {
        let invocation = rsync::download(&self.settings, endpoint, remote_path, local_dir);
        self.execute(&invocation).await
    }

    /// Remove `node` from the server using the strategy for its kind.
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot run or exits non-zero.
    pub async fn delete(
        &self,
        endpoint: &RemoteEndpoint,
        node: &RemoteNode,
        scratch: DeleteScratch<'_>,
    ) -> TransferResult<()> {
        let invocation = match node.kind {
            NodeKind::Directory => {
                rsync::remove_directory(&self.settings, endpoint, node, scratch.void_dir)
            }
            NodeKind::File | NodeKind::Symlink => {
                rsync::remove_file(&self.settings, endpoint, node, scratch.removed_dir)
            }
        };
        self.execute(&invocation).await
    }

    /// Upload `source` to `remote_path`; `contents_only` uploads a
    /// directory's contents instead of the directory itself.
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot run or exits non-zero.
    pub async fn upload(
        &self,
        source: &Path,
        contents_only: bool,
        endpoint: &RemoteEndpoint,
        remote_path: &str,
    ) -> TransferResult<()> {
        let invocation =
            rsync::upload(&self.settings, source, contents_only, endpoint, remote_path);
        self.execute(&invocation).await
    }

    async fn execute(&self, invocation: &Invocation) -> TransferResult<()> {
        let command = invocation.to_string();
        debug!(command = %command, "executing transfer");
        let output = self
            .runner
            .run(invocation)
            .await
            .map_err(|source| TransferError::Spawn {
                command: command.clone(),
                source,
            })?;
        if output.succeeded() {
            return Ok(());
        }

        let stderr = (!output.stderr.is_empty()).then_some(output.stderr);
        warn!(
            command = %command,
            status = ?output.code,
            stderr = stderr.as_deref().unwrap_or_default(),
            "transfer command failed"
        );
        Err(TransferError::Failed {
            command,
            status: output.code,
            stderr,
        })
    }
}
