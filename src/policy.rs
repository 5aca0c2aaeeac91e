//! Restart policy matching
//!
//! Pure decision logic: whether an image tag may trigger restarts at all,
//! and whether a given workload is a restart target for a tag. Patterns are
//! compiled once at startup and always match the whole input.

use crate::config::PolicyConfig;
use crate::error::DeployerError;
use crate::inventory::Workload;
use regex::Regex;
use std::sync::Arc;

/// Compiled restart policy.
///
/// Cheap to clone; the compiled patterns are shared.
#[derive(Clone, Debug)]
pub struct RestartPolicy {
    namespace_pattern: String,
    image_pattern: String,
    namespace_rule: Arc<Regex>,
    image_rule: Arc<Regex>,
}

impl RestartPolicy {
    /// Compile a policy from namespace and image-tag patterns.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::Config` if either pattern fails to compile.
    ///
    /// # Examples
    ///
    /// ```
    /// use k8s_cd_deployer::policy::RestartPolicy;
    ///
    /// let policy = RestartPolicy::new(".*-int$", ".*:INT$").unwrap();
    /// assert!(policy.is_tag_deployable("repo/app:INT"));
    /// assert!(!policy.is_tag_deployable("repo/app:INT-old"));
    /// ```
    pub fn new(namespace_pattern: &str, image_pattern: &str) -> Result<Self, DeployerError> {
        Ok(Self {
            namespace_pattern: namespace_pattern.to_string(),
            image_pattern: image_pattern.to_string(),
            namespace_rule: Arc::new(compile_full_match("namespace_pattern", namespace_pattern)?),
            image_rule: Arc::new(compile_full_match("image_pattern", image_pattern)?),
        })
    }

    /// Compile the policy described by the `policy` configuration section.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, DeployerError> {
        Self::new(&config.namespace_pattern, &config.image_pattern)
    }

    /// Returns true iff `tag` matches the image rule as a whole.
    pub fn is_tag_deployable(&self, tag: &str) -> bool {
        self.image_rule.is_match(tag)
    }

    /// Returns true iff `namespace` matches the namespace rule as a whole.
    pub fn is_namespace_eligible(&self, namespace: &str) -> bool {
        self.namespace_rule.is_match(namespace)
    }

    /// Returns true iff the workload sits in an eligible namespace and runs
    /// exactly `tag`.
    ///
    /// The image comparison is plain string equality, never a pattern match.
    pub fn is_restart_target(&self, workload: &Workload, tag: &str) -> bool {
        self.is_namespace_eligible(&workload.namespace) && workload.image == tag
    }

    /// Human-readable summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "namespace~{}, image~{}",
            self.namespace_pattern, self.image_pattern
        )
    }
}

/// Anchor `pattern` on both ends so `is_match` behaves as a full-string match.
fn compile_full_match(field: &str, pattern: &str) -> Result<Regex, DeployerError> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| DeployerError::Config(format!("Invalid {} '{}': {}", field, pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workload(namespace: &str, image: &str) -> Workload {
        Workload {
            name: "app".to_string(),
            namespace: namespace.to_string(),
            image: image.to_string(),
        }
    }

    fn default_policy() -> RestartPolicy {
        RestartPolicy::new(".*-int$", ".*:INT$").unwrap()
    }

    #[test]
    fn test_tag_deployable_requires_full_match() {
        let policy = RestartPolicy::new(".*-int", "app:INT").unwrap();

        assert!(policy.is_tag_deployable("app:INT"));
        // A substring search would accept these.
        assert!(!policy.is_tag_deployable("repo/app:INT"));
        assert!(!policy.is_tag_deployable("app:INT2"));
    }

    #[test]
    fn test_tag_deployable_default_patterns() {
        let policy = default_policy();

        assert!(policy.is_tag_deployable("gcr.io/project/app:INT"));
        assert!(!policy.is_tag_deployable("gcr.io/project/app:STABLE"));
        assert!(!policy.is_tag_deployable("gcr.io/project/app:INTEGRATION"));
    }

    #[test]
    fn test_empty_tag_is_not_deployable() {
        assert!(!default_policy().is_tag_deployable(""));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let policy = RestartPolicy::new(".*", "a:INT|b:INT").unwrap();

        assert!(policy.is_tag_deployable("a:INT"));
        assert!(policy.is_tag_deployable("b:INT"));
        assert!(!policy.is_tag_deployable("a:INTx"));
        assert!(!policy.is_tag_deployable("xb:INT"));
    }

    #[test]
    fn test_restart_target_requires_namespace_and_exact_image() {
        let policy = default_policy();
        let tag = "repo/app:INT";

        assert!(policy.is_restart_target(&workload("svc-int", "repo/app:INT"), tag));
        assert!(!policy.is_restart_target(&workload("svc-prod", "repo/app:INT"), tag));
        assert!(!policy.is_restart_target(&workload("other-int", "repo/app:STABLE"), tag));
    }

    #[test]
    fn test_restart_target_image_is_not_a_pattern() {
        let policy = default_policy();

        // The tag contains regex metacharacters; equality must still be literal.
        assert!(!policy.is_restart_target(&workload("svc-int", "repoXapp:INT"), "repo.app:INT"));
        assert!(policy.is_restart_target(&workload("svc-int", "repo.app:INT"), "repo.app:INT"));
    }

    #[test]
    fn test_namespace_requires_full_match() {
        let policy = RestartPolicy::new("int", ".*").unwrap();

        assert!(policy.is_namespace_eligible("int"));
        assert!(!policy.is_namespace_eligible("svc-int"));
    }

    #[test]
    fn test_malformed_pattern_is_config_error() {
        let err = RestartPolicy::new("(", ".*").unwrap_err();
        assert!(matches!(err, DeployerError::Config(_)));
        assert!(err.to_string().contains("namespace_pattern"));

        let err = RestartPolicy::new(".*", "[").unwrap_err();
        assert!(err.to_string().contains("image_pattern"));
    }

    #[test]
    fn test_summary() {
        let summary = default_policy().summary();
        assert!(summary.contains("namespace~.*-int$"));
        assert!(summary.contains("image~.*:INT$"));
    }
}
