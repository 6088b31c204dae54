use std::sync::Arc;

use anyhow::anyhow;
use relink_app::{EnvironmentGuard, OrchestratorSettings, ProvisionError, SymlinkOrchestrator};
use relink_config::RelinkConfig;
use relink_core::ProvisioningRequest;
use relink_transfer::{CommandRunner, DryRunRunner, ProcessRunner, TransferGateway};

use crate::cli::{OutputFormat, SymlinkArgs};
use crate::client::{CliDependencies, CliError, CliResult};
use crate::output::render_report;

pub(crate) async fn handle_symlink(
    deps: &CliDependencies,
    config: &RelinkConfig,
    args: SymlinkArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let orchestrator = build_orchestrator(deps, config, args.dry_run)?;
    let request = ProvisioningRequest {
        site_environment: args.site_env,
        source_path: args.source,
        destination: args.destination,
        transfer_existing: args.transfer_existing,
        point_to_file: args.point_to_file,
    };

    let report = orchestrator
        .run(&request)
        .await
        .map_err(provision_error)?;
    render_report(&report, format)
}

fn build_orchestrator(
    deps: &CliDependencies,
    config: &RelinkConfig,
    dry_run: bool,
) -> CliResult<SymlinkOrchestrator> {
    let guard = EnvironmentGuard::new(
        deps.hosting_api(),
        config.guard.clone(),
        config.layout.code_root.clone(),
    )
    .dry_run(dry_run);

    let runner: Arc<dyn CommandRunner> = if dry_run {
        Arc::new(DryRunRunner)
    } else {
        Arc::new(ProcessRunner::new(config.transfer.verbosity))
    };
    let gateway = TransferGateway::new(config.transfer.clone(), runner);

    let staging_root = config
        .layout
        .staging_root()
        .map_err(|err| CliError::validation(format!("invalid configuration: {}", err.detail())))?;

    Ok(SymlinkOrchestrator::new(
        guard,
        gateway,
        OrchestratorSettings {
            symlink_root: config.layout.symlink_root.clone(),
            staging_root,
            purge_on_success: config.layout.purge_on_success,
        },
    ))
}

pub(crate) fn provision_error(err: ProvisionError) -> CliError {
    let message = err.render();
    if err.is_validation() {
        CliError::validation(message)
    } else {
        CliError::failure(anyhow!(message))
    }
}
