//! Offline restart policy evaluation.
//!
//! Answers "would this push restart anything, and would this workload be
//! one of them" without talking to the cluster.

use crate::config::Config;
use crate::error::Result;
use crate::inventory::Workload;
use crate::policy::RestartPolicy;
use colored::Colorize;

/// Policy verdicts for a tag and an optional hypothetical workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub tag_deployable: bool,
    pub namespace_eligible: Option<bool>,
    pub restart_target: Option<bool>,
}

/// Evaluate `policy` for `tag`.
///
/// When `namespace` is given, a workload in that namespace running `image`
/// (or `tag` itself) is also evaluated.
pub fn evaluate(
    policy: &RestartPolicy,
    tag: &str,
    namespace: Option<&str>,
    image: Option<&str>,
) -> CheckResult {
    let tag_deployable = policy.is_tag_deployable(tag);

    let (namespace_eligible, restart_target) = match namespace {
        Some(namespace) => {
            let workload = Workload {
                name: String::new(),
                namespace: namespace.to_string(),
                image: image.unwrap_or(tag).to_string(),
            };
            (
                Some(policy.is_namespace_eligible(namespace)),
                Some(tag_deployable && policy.is_restart_target(&workload, tag)),
            )
        }
        None => (None, None),
    };

    CheckResult {
        tag_deployable,
        namespace_eligible,
        restart_target,
    }
}

/// Print the verdicts for `tag`.
///
/// # Errors
///
/// Returns error if the configured patterns do not compile.
pub fn run_check(
    config: &Config,
    tag: &str,
    namespace: Option<&str>,
    image: Option<&str>,
) -> Result<()> {
    let policy = RestartPolicy::from_config(&config.policy)?;
    let result = evaluate(&policy, tag, namespace, image);

    println!("Policy: {}", policy.summary());
    println!("Tag {}: deployable = {}", tag.cyan(), verdict(result.tag_deployable));

    if let (Some(namespace), Some(eligible), Some(target)) =
        (namespace, result.namespace_eligible, result.restart_target)
    {
        println!("Namespace {}: eligible = {}", namespace.cyan(), verdict(eligible));
        println!(
            "Workload running {}: restart = {}",
            image.unwrap_or(tag).cyan(),
            verdict(target)
        );
    }

    Ok(())
}

fn verdict(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RestartPolicy {
        RestartPolicy::new(".*-int$", ".*:INT$").unwrap()
    }

    #[test]
    fn test_evaluate_tag_only() {
        let result = evaluate(&policy(), "repo/app:INT", None, None);

        assert!(result.tag_deployable);
        assert_eq!(result.namespace_eligible, None);
        assert_eq!(result.restart_target, None);
    }

    #[test]
    fn test_evaluate_matching_workload() {
        let result = evaluate(&policy(), "repo/app:INT", Some("svc-int"), None);

        assert_eq!(result.namespace_eligible, Some(true));
        assert_eq!(result.restart_target, Some(true));
    }

    #[test]
    fn test_evaluate_ineligible_namespace() {
        let result = evaluate(&policy(), "repo/app:INT", Some("svc-prod"), None);

        assert_eq!(result.namespace_eligible, Some(false));
        assert_eq!(result.restart_target, Some(false));
    }

    #[test]
    fn test_evaluate_different_image() {
        let result = evaluate(&policy(), "repo/app:INT", Some("svc-int"), Some("repo/other:INT"));

        assert_eq!(result.restart_target, Some(false));
    }

    #[test]
    fn test_evaluate_undeployable_tag_never_targets() {
        let result = evaluate(&policy(), "repo/app:PROD", Some("svc-int"), None);

        assert!(!result.tag_deployable);
        assert_eq!(result.namespace_eligible, Some(true));
        assert_eq!(result.restart_target, Some(false));
    }
}
