//! Gather configuration
//!
//! Cluster-layout names that differ between installs can be overridden
//! through `MUST_GATHER_*` environment variables.

use anyhow::Result;
use serde::Deserialize;

/// Gather configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatherConfig {
    /// CLI tool used for every cluster call
    #[serde(default = "default_cli_binary")]
    pub cli_binary: String,

    /// Workload namespace when the internal resource does not name one
    #[serde(default = "default_workload_namespace")]
    pub workload_namespace_default: String,

    /// Namespace of the platform monitoring stack
    #[serde(default = "default_monitoring_namespace")]
    pub monitoring_namespace: String,

    /// Namespace of the user-workload monitoring prometheus
    #[serde(default = "default_user_workload_namespace")]
    pub user_workload_namespace: String,

    /// Lifetime of the issued monitoring token
    #[serde(default = "default_token_duration")]
    pub token_duration: String,
}

fn default_cli_binary() -> String {
    "oc".to_string()
}

fn default_workload_namespace() -> String {
    "openshift-power-monitoring".to_string()
}

fn default_monitoring_namespace() -> String {
    "openshift-monitoring".to_string()
}

fn default_user_workload_namespace() -> String {
    "openshift-user-workload-monitoring".to_string()
}

fn default_token_duration() -> String {
    "10m".to_string()
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            cli_binary: default_cli_binary(),
            workload_namespace_default: default_workload_namespace(),
            monitoring_namespace: default_monitoring_namespace(),
            user_workload_namespace: default_user_workload_namespace(),
            token_duration: default_token_duration(),
        }
    }
}

impl GatherConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MUST_GATHER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring invalid MUST_GATHER_* settings");
            GatherConfig::default()
        }))
    }
}
