//! One-off restart for a tag.

use crate::config::Config;
use crate::error::Result;
use crate::inventory::KubeInventory;
use crate::orchestrator::{EventOutcome, IgnoreReason, RestartOrchestrator, RestartOutcome, RestartReport};
use crate::policy::RestartPolicy;
use anyhow::bail;
use colored::Colorize;
use prettytable::{format, row, Table};
use std::sync::Arc;

/// Restart every eligible workload running `tag` and print what happened.
///
/// # Errors
///
/// Returns error if the cluster cannot be enumerated or any restart failed.
pub async fn run_restart(config: &Config, tag: &str, dry_run: bool) -> Result<()> {
    let policy = RestartPolicy::from_config(&config.policy)?;
    let inventory = Arc::new(KubeInventory::try_default(config.cluster.request_timeout()).await?);
    let orchestrator = RestartOrchestrator::new(policy, inventory).with_dry_run(dry_run);

    match orchestrator.restart_matching(tag).await? {
        EventOutcome::Ignored(reason) => {
            println!("{} {}", "Nothing to do:".yellow(), describe_ignore(reason, tag));
            Ok(())
        }
        EventOutcome::Processed(report) => {
            print_report(&report);

            let failed = report.failed().len();
            if failed > 0 {
                bail!("{} restart(s) failed for {}", failed, tag);
            }
            Ok(())
        }
    }
}

fn describe_ignore(reason: IgnoreReason, tag: &str) -> String {
    match reason {
        IgnoreReason::TagNotDeployable => {
            format!("tag '{}' does not match the image pattern", tag)
        }
        IgnoreReason::NotInsert => format!("event for '{}' is not an insert", tag),
    }
}

fn print_report(report: &RestartReport) {
    if report.matched().is_empty() {
        println!(
            "{} no workload runs {} in an eligible namespace ({} checked)",
            "No match:".yellow(),
            report.tag.cyan(),
            report.skipped_count()
        );
        return;
    }

    println!("\nRestart results for {}:", report.tag.cyan());
    report_table(report).printstd();
    println!(
        "\n{} restarted, {} failed, {} skipped\n",
        report.restarted().len(),
        report.failed().len(),
        report.skipped_count()
    );
}

/// Table of matched workloads; skipped ones are only counted.
pub(crate) fn report_table(report: &RestartReport) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row!["Namespace", "Deployment", "Outcome", "Detail"]);

    for entry in &report.outcomes {
        let detail = match &entry.outcome {
            RestartOutcome::SkippedPolicy => continue,
            RestartOutcome::Failed(reason) => reason.as_str(),
            RestartOutcome::Restarted | RestartOutcome::DryRun => "",
        };

        table.add_row(row![
            entry.workload.namespace,
            entry.workload.name,
            entry.outcome.as_str(),
            detail
        ]);
    }

    table
}
