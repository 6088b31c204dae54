//! Output renderers for provisioning reports.

use anyhow::anyhow;
use relink_app::{ProvisionReport, StepStatus};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_report(report: &ProvisionReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(report)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{text}");
        }
        OutputFormat::Table => print!("{}", report_table(report)),
    }
    Ok(())
}

pub(crate) fn report_table(report: &ProvisionReport) -> String {
    let context = &report.context;
    let source_kind = if report.source_absent {
        "absent"
    } else {
        report.source_kind.as_str()
    };
    let mut lines = vec![
        format!("site: {} ({})", context.site_name(), context.site_id()),
        format!("environment: {}", context.environment_id()),
        format!("source: {} ({source_kind})", context.source()),
        format!("link: {} -> {}", context.source(), report.link_target),
        format!(
            "staging: {} ({})",
            report.staging_dir.display(),
            if report.staging_purged { "purged" } else { "kept" }
        ),
        format!("state: {}", report.state.as_str()),
        format!("{:<14} {:<10} DETAIL", "STEP", "STATUS"),
    ];
    lines.extend(report.steps.iter().map(|step| {
        format!(
            "{:<14} {:<10} {}",
            step.step.as_str(),
            status_to_str(step.status),
            step.detail.as_deref().unwrap_or("-")
        )
    }));
    lines.push(String::new());
    lines.join("\n")
}

#[must_use]
pub(crate) const fn status_to_str(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Started => "started",
        StepStatus::Completed => "completed",
        StepStatus::Failed => "failed",
        StepStatus::Skipped => "skipped",
    }
}
