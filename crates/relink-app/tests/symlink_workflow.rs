//! End-to-end runs of the provisioning workflow against fake collaborators.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use relink_app::{
    EnvironmentGuard, OrchestratorSettings, ProvisionError, ProvisionState, StepStatus,
    SymlinkOrchestrator,
};
use relink_core::{NodeKind, ProvisioningRequest};
use relink_test_support::fixtures::{
    SITE_ID, StagedContent, download_hook, environment_record, is_download, request, site_record,
    test_config,
};
use relink_test_support::mocks::{FakeHostingApi, HostingCall, RecordingRunner, has_arg};
use relink_transfer::{CommandRunner, DryRunRunner, TransferError, TransferGateway};
use tempfile::TempDir;

struct Harness {
    _temp: TempDir,
    session: PathBuf,
    remote: String,
    api: Arc<FakeHostingApi>,
    orchestrator: SymlinkOrchestrator,
}

fn harness(api: FakeHostingApi, runner: Arc<dyn CommandRunner>, purge: bool) -> Result<Harness> {
    let temp = tempfile::tempdir()?;
    let config = test_config(temp.path());
    let api = Arc::new(api);
    let guard = EnvironmentGuard::new(
        api.clone(),
        config.guard.clone(),
        config.layout.code_root.clone(),
    );
    let gateway = TransferGateway::new(config.transfer.clone(), runner);
    let staging_root = config.layout.staging_root()?;
    let orchestrator = SymlinkOrchestrator::new(
        guard,
        gateway,
        OrchestratorSettings {
            symlink_root: config.layout.symlink_root.clone(),
            staging_root: staging_root.clone(),
            purge_on_success: purge,
        },
    );
    Ok(Harness {
        _temp: temp,
        session: staging_root.join("acme.dev"),
        remote: format!("dev.{SITE_ID}@appserver.dev.{SITE_ID}.drush.in"),
        api,
        orchestrator,
    })
}

fn dev_api() -> FakeHostingApi {
    FakeHostingApi::new(site_record(), environment_record("dev"))
}

fn dir(session: &Path, name: &str) -> String {
    session.join(name).display().to_string()
}

fn directory_content() -> StagedContent {
    StagedContent::Directory(vec![
        ("object-1.bin".into(), b"cached".to_vec()),
        ("object-2.bin".into(), b"cached".to_vec()),
    ])
}

#[tokio::test]
async fn empty_directory_replaces_source_by_default() -> Result<()> {
    let runner = RecordingRunner::new()
        .on_run(download_hook("cache", directory_content()))
        .shared();
    let h = harness(dev_api(), runner.clone(), false)?;

    let report = h
        .orchestrator
        .run(&request("acme.dev", "/code/wp-content/cache"))
        .await?;

    let r = &h.remote;
    let s = &h.session;
    assert_eq!(
        runner.commands(),
        vec![
            format!(
                "rsync -rlqz -e 'ssh -p 2222' --size-only --ipv4 --ignore-missing-args \
                 {r}:code/wp-content/cache {}/",
                dir(s, "download")
            ),
            format!(
                "rsync -rq -e 'ssh -p 2222' --delete --include /cache --include '/cache/***' \
                 --exclude '*' {}/ {r}:code/wp-content/",
                dir(s, "void")
            ),
            format!(
                "rsync -rq -e 'ssh -p 2222' --delete --include /cache --include '/cache/***' \
                 --exclude '*' {}/ {r}:files/symlink_target/",
                dir(s, "void")
            ),
            format!(
                "rsync -rlqz -e 'ssh -p 2222' --size-only --ipv4 --temp-dir=~/tmp/ \
                 {}/cache {r}:files/symlink_target/",
                dir(s, "empty")
            ),
            format!(
                "rsync -rlqz -e 'ssh -p 2222' --size-only --ipv4 --temp-dir=~/tmp/ \
                 {}/cache {r}:code/wp-content/",
                dir(s, "link")
            ),
        ]
    );

    assert_eq!(report.state, ProvisionState::Done);
    assert_eq!(report.source_kind, NodeKind::Directory);
    assert_eq!(report.link_target, "../../files/symlink_target/cache");
    assert_eq!(
        fs::read_link(s.join("link/cache"))?,
        PathBuf::from("../../files/symlink_target/cache")
    );
    assert!(s.join("empty/cache").is_dir());
    assert!(s.join("download/cache/object-1.bin").is_file());
    assert_eq!(report.steps.len(), 8);
    assert!(
        report.steps[..7]
            .iter()
            .all(|step| step.status == StepStatus::Completed)
    );
    assert_eq!(report.steps[7].step, ProvisionState::Done);
    assert_eq!(h.api.mode_change_requests(), 1);
    Ok(())
}

#[tokio::test]
async fn transfer_existing_moves_content_to_custom_destination() -> Result<()> {
    let runner = RecordingRunner::new()
        .on_run(download_hook("tmp", directory_content()))
        .shared();
    let h = harness(dev_api(), runner.clone(), false)?;

    let report = h
        .orchestrator
        .run(&ProvisioningRequest {
            destination: Some("custom".into()),
            transfer_existing: true,
            ..request("acme.dev", "code/uploads/tmp")
        })
        .await?;

    let r = &h.remote;
    let s = &h.session;
    let commands = runner.commands();
    assert_eq!(commands.len(), 5);
    assert!(commands[1].contains("--include /tmp "));
    assert!(commands[1].ends_with(&format!("{r}:code/uploads/")));
    assert!(commands[2].contains("--include /custom "));
    assert!(commands[2].ends_with(&format!("{r}:files/symlink_target/")));
    assert_eq!(
        commands[3],
        format!(
            "rsync -rlqz -e 'ssh -p 2222' --size-only --ipv4 --temp-dir=~/tmp/ \
             {}/custom {r}:files/symlink_target/",
            dir(s, "empty")
        )
    );
    assert_eq!(
        commands[4],
        format!(
            "rsync -rlqz -e 'ssh -p 2222' --size-only --ipv4 --temp-dir=~/tmp/ \
             {}/custom {r}:code/uploads/",
            dir(s, "link")
        )
    );

    assert_eq!(report.context.destination().as_str(), "custom");
    assert_eq!(report.link_target, "../../files/symlink_target/custom");
    assert!(s.join("empty/custom/object-1.bin").is_file());
    assert!(s.join("download/tmp/object-1.bin").is_file());
    Ok(())
}

#[tokio::test]
async fn transferred_file_is_uploaded_into_the_symlink_root() -> Result<()> {
    let runner = RecordingRunner::new()
        .on_run(download_hook(
            "wp-config.php",
            StagedContent::File(b"<?php".to_vec()),
        ))
        .shared();
    let h = harness(dev_api(), runner.clone(), false)?;

    let report = h
        .orchestrator
        .run(&ProvisioningRequest {
            destination: Some("cfg".into()),
            transfer_existing: true,
            ..request("acme.dev", "wp-config.php")
        })
        .await?;

    let r = &h.remote;
    let s = &h.session;
    let commands = runner.commands();
    assert_eq!(commands.len(), 5);
    assert!(commands[1].ends_with(&format!(
        "{r}:code/wp-config.php {}/",
        dir(s, "removed")
    )));
    assert!(commands[2].contains(&format!("{r}:files/symlink_target/cfg ")));
    assert_eq!(
        commands[3],
        format!(
            "rsync -rlqz -e 'ssh -p 2222' --size-only --ipv4 --temp-dir=~/tmp/ \
             {}/cfg {r}:files/symlink_target/",
            dir(s, "empty")
        )
    );
    assert_eq!(fs::read(s.join("empty/cfg"))?, b"<?php");
    assert_eq!(report.source_kind, NodeKind::File);
    assert_eq!(report.link_target, "../files/symlink_target/cfg");
    Ok(())
}

#[tokio::test]
async fn download_failure_stops_the_run() -> Result<()> {
    let runner = RecordingRunner::new()
        .fail_when(is_download, 12)
        .shared();
    let h = harness(dev_api(), runner.clone(), false)?;

    let err = h
        .orchestrator
        .run(&request("acme.dev", "wp-content/cache"))
        .await
        .expect_err("download fails");

    match &err {
        ProvisionError::Transfer {
            operation,
            source: TransferError::Failed { status, .. },
        } => {
            assert_eq!(*operation, "download");
            assert_eq!(*status, Some(12));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_validation());
    assert_eq!(runner.invocations().len(), 1);
    assert!(!h.session.join("empty/cache").exists());
    Ok(())
}

#[tokio::test]
async fn direct_write_mode_skips_mode_change() -> Result<()> {
    let runner = RecordingRunner::new()
        .on_run(download_hook("cache", directory_content()))
        .shared();
    let h = harness(dev_api().with_mode("sftp"), runner, false)?;

    h.orchestrator
        .run(&request("acme.dev", "wp-content/cache"))
        .await?;

    assert_eq!(h.api.mode_change_requests(), 0);
    assert!(
        h.api
            .calls()
            .iter()
            .all(|call| !matches!(call, HostingCall::ChangeConnectionMode { .. }))
    );
    Ok(())
}

#[tokio::test]
async fn protected_environments_touch_nothing() -> Result<()> {
    for target in ["acme.test", "acme.live"] {
        let runner = RecordingRunner::new().shared();
        let h = harness(dev_api(), runner.clone(), false)?;

        let err = h
            .orchestrator
            .run(&request(target, "wp-content/cache"))
            .await
            .expect_err("protected environment");

        assert!(matches!(err, ProvisionError::EnvironmentProtected { .. }));
        assert!(err.is_validation());
        assert!(h.api.calls().is_empty());
        assert!(runner.invocations().is_empty());
        assert!(!h.session.exists());
    }
    Ok(())
}

#[tokio::test]
async fn delete_failure_stops_before_staging() -> Result<()> {
    let runner = RecordingRunner::new()
        .on_run(download_hook("cache", directory_content()))
        .fail_when(|invocation| has_arg(invocation, "--delete"), 23)
        .shared();
    let h = harness(dev_api(), runner.clone(), false)?;

    let err = h
        .orchestrator
        .run(&request("acme.dev", "wp-content/cache"))
        .await
        .expect_err("delete fails");

    let expected = format!(
        "rsync -rq -e 'ssh -p 2222' --delete --include /cache --include '/cache/***' \
         --exclude '*' {}/ {}:code/wp-content/",
        dir(&h.session, "void"),
        h.remote
    );
    match &err {
        ProvisionError::Transfer {
            operation,
            source: TransferError::Failed {
                command, status, ..
            },
        } => {
            assert_eq!(*operation, "delete_source");
            assert_eq!(command, &expected);
            assert_eq!(*status, Some(23));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.render().contains(&expected));
    assert!(err.render().contains("exit status 23"));

    let commands = runner.commands();
    assert_eq!(commands.len(), 2);
    assert!(commands.iter().all(|command| !command.contains("--temp-dir")));
    assert!(h.session.join("download/cache/object-2.bin").is_file());
    Ok(())
}

#[tokio::test]
async fn absent_source_with_point_to_file_creates_file_placeholder() -> Result<()> {
    let runner = RecordingRunner::new()
        .on_run(download_hook("object-cache.php", StagedContent::Nothing))
        .shared();
    let h = harness(dev_api(), runner.clone(), false)?;

    let report = h
        .orchestrator
        .run(&ProvisioningRequest {
            point_to_file: true,
            ..request("acme.dev", "wp-content/object-cache.php")
        })
        .await?;

    let r = &h.remote;
    let s = &h.session;
    let commands = runner.commands();
    assert_eq!(commands.len(), 4);
    assert_eq!(
        commands[1],
        format!(
            "rsync -aqz -e 'ssh -p 2222' --remove-source-files --ignore-missing-args \
             {r}:files/symlink_target/object-cache.php {}/",
            dir(s, "removed")
        )
    );
    assert!(commands[2].ends_with(&format!(
        "{}/object-cache.php {r}:files/symlink_target/",
        dir(s, "empty")
    )));
    assert!(s.join("empty/object-cache.php").is_file());

    assert!(report.source_absent);
    assert_eq!(report.source_kind, NodeKind::File);
    let deleting = report
        .steps
        .iter()
        .find(|step| step.step == ProvisionState::Deleting)
        .expect("deleting step recorded");
    assert_eq!(deleting.status, StepStatus::Skipped);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn symlinked_source_is_moved_as_a_link() -> Result<()> {
    let runner = RecordingRunner::new()
        .on_run(download_hook(
            "cache",
            StagedContent::Symlink("../shared/cache".into()),
        ))
        .shared();
    let h = harness(dev_api(), runner.clone(), false)?;

    let report = h
        .orchestrator
        .run(&ProvisioningRequest {
            transfer_existing: true,
            ..request("acme.dev", "wp-content/cache")
        })
        .await?;

    let commands = runner.commands();
    assert!(commands[1].contains("--remove-source-files"));
    assert!(commands[3].ends_with(&format!(
        "{}/cache {}:files/symlink_target/",
        dir(&h.session, "empty"),
        h.remote
    )));
    assert_eq!(
        fs::read_link(h.session.join("empty/cache"))?,
        PathBuf::from("../shared/cache")
    );
    assert_eq!(report.source_kind, NodeKind::Symlink);
    Ok(())
}

#[tokio::test]
async fn purge_on_success_removes_staging() -> Result<()> {
    let runner = RecordingRunner::new()
        .on_run(download_hook("cache", directory_content()))
        .shared();
    let h = harness(dev_api(), runner, true)?;

    let report = h
        .orchestrator
        .run(&request("acme.dev", "wp-content/cache"))
        .await?;

    assert!(report.staging_purged);
    assert!(!h.session.exists());
    Ok(())
}

#[tokio::test]
async fn dry_run_completes_without_side_effects() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let config = test_config(temp.path());
    let api = Arc::new(dev_api());
    let guard = EnvironmentGuard::new(api.clone(), config.guard.clone(), "code").dry_run(true);
    let orchestrator = SymlinkOrchestrator::new(
        guard,
        TransferGateway::new(config.transfer.clone(), Arc::new(DryRunRunner)),
        OrchestratorSettings {
            symlink_root: config.layout.symlink_root.clone(),
            staging_root: config.layout.staging_root()?,
            purge_on_success: false,
        },
    );
    let report = orchestrator
        .run(&request("acme.dev", "wp-content/cache"))
        .await?;

    assert_eq!(report.state, ProvisionState::Done);
    assert!(report.source_absent);
    assert_eq!(api.mode_change_requests(), 0);
    Ok(())
}

#[tokio::test]
async fn report_serializes_for_json_output() -> Result<()> {
    let runner = RecordingRunner::new()
        .on_run(download_hook("cache", directory_content()))
        .shared();
    let h = harness(dev_api(), runner, false)?;
    let report = h
        .orchestrator
        .run(&request("acme.dev", "wp-content/cache"))
        .await?;

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["state"], "done");
    assert_eq!(json["source_kind"], "directory");
    assert_eq!(json["context"]["source"], "code/wp-content/cache");
    assert_eq!(json["steps"][0]["step"], "validating");
    Ok(())
}
