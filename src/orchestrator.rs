//! Restart orchestration
//!
//! The single coordinator between decision and action. For an image update
//! event it:
//! 1. Ignores anything that is not an insert
//! 2. Ignores tags the image rule rejects, before touching the cluster
//! 3. Enumerates every workload, fresh, from the inventory
//! 4. Restarts each workload that is a restart target for the tag
//!
//! Restarts are best-effort: one failing workload never prevents restarting
//! the others. Only a failed enumeration fails the event as a whole.

use crate::error::DeployerError;
use crate::event::{EventAction, ImageUpdateEvent};
use crate::inventory::{Workload, WorkloadInventory};
use crate::metrics;
use crate::policy::RestartPolicy;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Why an event was discarded without looking at the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The event action was not an insert
    NotInsert,
    /// The tag does not match the image rule
    TagNotDeployable,
}

/// Per-workload result of one processing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// Restart request accepted by the cluster
    Restarted,
    /// Workload is not a restart target for this tag
    SkippedPolicy,
    /// Restart request rejected or timed out
    Failed(String),
    /// Workload matched but dry-run mode suppressed the restart
    DryRun,
}

impl RestartOutcome {
    /// Short label, used for metrics and tables
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restarted => "restarted",
            Self::SkippedPolicy => "skipped",
            Self::Failed(_) => "failed",
            Self::DryRun => "dry_run",
        }
    }
}

/// Outcome for one enumerated workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadOutcome {
    pub workload: Workload,
    pub outcome: RestartOutcome,
}

/// Everything one processing attempt did for a tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartReport {
    pub tag: String,
    pub outcomes: Vec<WorkloadOutcome>,
}

impl RestartReport {
    /// Workloads whose restart was accepted
    pub fn restarted(&self) -> Vec<&Workload> {
        self.filter(|o| matches!(o, RestartOutcome::Restarted))
    }

    /// Workloads whose restart failed
    pub fn failed(&self) -> Vec<&Workload> {
        self.filter(|o| matches!(o, RestartOutcome::Failed(_)))
    }

    /// Workloads that matched the policy, restarted or not
    pub fn matched(&self) -> Vec<&Workload> {
        self.filter(|o| !matches!(o, RestartOutcome::SkippedPolicy))
    }

    /// Number of enumerated workloads that did not match
    pub fn skipped_count(&self) -> usize {
        self.filter(|o| matches!(o, RestartOutcome::SkippedPolicy))
            .len()
    }

    fn filter<F>(&self, predicate: F) -> Vec<&Workload>
    where
        F: Fn(&RestartOutcome) -> bool,
    {
        self.outcomes
            .iter()
            .filter(|o| predicate(&o.outcome))
            .map(|o| &o.workload)
            .collect()
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Discarded before enumeration
    Ignored(IgnoreReason),
    /// Enumeration succeeded; individual restarts may still have failed
    Processed(RestartReport),
}

/// Coordinates policy decisions and inventory actions.
///
/// Holds only immutable state, so one instance can serve any number of
/// concurrent `handle` calls.
pub struct RestartOrchestrator {
    policy: RestartPolicy,
    inventory: Arc<dyn WorkloadInventory>,
    dry_run: bool,
}

impl RestartOrchestrator {
    /// Create an orchestrator over a compiled policy and an inventory gateway.
    pub fn new(policy: RestartPolicy, inventory: Arc<dyn WorkloadInventory>) -> Self {
        Self {
            policy,
            inventory,
            dry_run: false,
        }
    }

    /// Report matches without issuing restarts.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The policy this orchestrator decides with
    pub fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    /// Whether restarts are suppressed
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Handle one decoded image update event.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::InventoryUnavailable` if enumeration fails; in
    /// that case no restart was attempted.
    pub async fn handle(&self, event: &ImageUpdateEvent) -> Result<EventOutcome, DeployerError> {
        if event.action != EventAction::Insert {
            debug!(action = %event.action, tag = %event.tag, "Ignoring non-insert event");
            return Ok(EventOutcome::Ignored(IgnoreReason::NotInsert));
        }

        debug!(tag = %event.tag, "Processing tag");
        self.restart_matching(&event.tag).await
    }

    /// Restart every workload currently running `tag`, if the tag is deployable.
    ///
    /// This is the event path without the action check; the manual trigger
    /// enters here.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::InventoryUnavailable` if enumeration fails.
    pub async fn restart_matching(&self, tag: &str) -> Result<EventOutcome, DeployerError> {
        if !self.policy.is_tag_deployable(tag) {
            debug!(tag = %tag, "Restart disabled for tag");
            return Ok(EventOutcome::Ignored(IgnoreReason::TagNotDeployable));
        }

        info!(tag = %tag, dry_run = self.dry_run, "Restart enabled for tag");
        let started = Instant::now();
        let processed = self.enumerate_and_restart(tag).await;
        metrics::record_handle_duration(started.elapsed(), processed.is_ok());

        let report = processed?;
        info!(
            tag = %tag,
            matched = report.matched().len(),
            restarted = report.restarted().len(),
            failed = report.failed().len(),
            skipped = report.skipped_count(),
            "Tag processed"
        );

        Ok(EventOutcome::Processed(report))
    }

    async fn enumerate_and_restart(&self, tag: &str) -> Result<RestartReport, DeployerError> {
        let workloads = self.inventory.list_all().await.map_err(|e| {
            error!(tag = %tag, error = %e, "Workload enumeration failed");
            metrics::record_inventory_failure();
            match e {
                DeployerError::InventoryUnavailable(_) => e,
                other => DeployerError::InventoryUnavailable(other.to_string()),
            }
        })?;

        let mut report = RestartReport {
            tag: tag.to_string(),
            outcomes: Vec::with_capacity(workloads.len()),
        };

        for workload in workloads {
            let outcome = if !self.policy.is_restart_target(&workload, tag) {
                RestartOutcome::SkippedPolicy
            } else if self.dry_run {
                info!(
                    namespace = %workload.namespace,
                    workload = %workload.name,
                    "Dry-run: would restart"
                );
                RestartOutcome::DryRun
            } else {
                self.restart_one(&workload).await
            };

            metrics::record_restart(&outcome);
            report.outcomes.push(WorkloadOutcome { workload, outcome });
        }

        Ok(report)
    }

    async fn restart_one(&self, workload: &Workload) -> RestartOutcome {
        info!(
            namespace = %workload.namespace,
            workload = %workload.name,
            "Performing restart"
        );

        match self
            .inventory
            .restart(&workload.namespace, &workload.name)
            .await
        {
            Ok(()) => RestartOutcome::Restarted,
            Err(e) => {
                let reason = match e {
                    DeployerError::RestartFailed { reason, .. } => reason,
                    other => other.to_string(),
                };
                warn!(
                    namespace = %workload.namespace,
                    workload = %workload.name,
                    reason = %reason,
                    "Restart failed"
                );
                RestartOutcome::Failed(reason)
            }
        }
    }
}
