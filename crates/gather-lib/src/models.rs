//! Core data models for a gather run

use serde::Serialize;
use std::path::{Path, PathBuf};

/// What to collect and where to put it
#[derive(Debug, Clone, Serialize)]
pub struct CollectionTarget {
    pub operator_name: String,
    pub operator_namespace: String,
    /// Always absolute
    pub destination_dir: PathBuf,
}

impl CollectionTarget {
    /// Create a target, resolving the destination against the current directory
    pub fn new(
        operator_name: impl Into<String>,
        operator_namespace: impl Into<String>,
        destination_dir: impl AsRef<Path>,
    ) -> std::io::Result<Self> {
        Ok(Self {
            operator_name: operator_name.into(),
            operator_namespace: operator_namespace.into(),
            destination_dir: std::path::absolute(destination_dir.as_ref())?,
        })
    }

    /// OLM label selector identifying objects owned by the operator's install
    pub fn olm_selector(&self) -> String {
        format!(
            "operators.coreos.com/{}.{}",
            self.operator_name, self.operator_namespace
        )
    }

    /// Directory (relative to the bundle root) for operator lifecycle info
    pub fn operator_info_dir(&self) -> PathBuf {
        PathBuf::from(format!("{}-info", self.operator_name))
    }
}

/// How the CLI tool should render a `get`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// Default human-readable table
    Table,
    Wide,
    Yaml,
    Json,
    Name,
}

impl OutputFormat {
    /// Value for the `-o` flag, if any
    pub fn as_flag(&self) -> Option<String> {
        match self {
            OutputFormat::Table => None,
            OutputFormat::Wide => Some("wide".to_string()),
            OutputFormat::Yaml => Some("yaml".to_string()),
            OutputFormat::Json => Some("json".to_string()),
            OutputFormat::Name => Some("name".to_string()),
        }
    }
}

/// Which objects of a kind a query selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Named(String),
    Labeled(String),
    All,
}

/// One cluster read
#[derive(Debug, Clone)]
pub struct ResourceQuery {
    pub kind: String,
    pub selection: Selection,
    pub namespace: Option<String>,
    pub output_format: OutputFormat,
    /// Relative to the bundle root
    pub output_path: PathBuf,
}

impl ResourceQuery {
    pub fn named(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(kind, Selection::Named(name.into()))
    }

    pub fn labeled(kind: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::new(kind, Selection::Labeled(selector.into()))
    }

    pub fn all(kind: impl Into<String>) -> Self {
        Self::new(kind, Selection::All)
    }

    fn new(kind: impl Into<String>, selection: Selection) -> Self {
        Self {
            kind: kind.into(),
            selection,
            namespace: None,
            output_format: OutputFormat::Yaml,
            output_path: PathBuf::new(),
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn to(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Human-readable name or selector, used in logs and errors
    pub fn target_name(&self) -> String {
        match &self.selection {
            Selection::Named(name) => name.clone(),
            Selection::Labeled(selector) => format!("-l {}", selector),
            Selection::All => "*".to_string(),
        }
    }
}

/// A container inside a pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    pub namespace: String,
    pub pod: String,
    pub container: String,
}

/// Where to read logs from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    /// One container of one pod
    Container(ContainerRef),
    /// All containers of a workload (e.g. `deployment/olm-operator`)
    Workload { namespace: String, reference: String },
}

impl LogSource {
    pub fn describe(&self) -> String {
        match self {
            LogSource::Container(c) => format!("{}/{} ({})", c.namespace, c.pod, c.container),
            LogSource::Workload {
                namespace,
                reference,
            } => format!("{}/{}", namespace, reference),
        }
    }
}

/// Per-pod diagnostic fan-out for one workload pod
#[derive(Debug, Clone)]
pub struct PodDiagnosticSet {
    pub pod_name: String,
    pub container_name: String,
    /// Relative to the bundle root
    pub output_dir: PathBuf,
}

/// Everything the monitoring stage needs, discovered up front
#[derive(Clone)]
pub struct MonitoringContext {
    pub route_host: String,
    /// Relative to the bundle root
    pub ca_bundle_path: PathBuf,
    pub service_account_token: String,
    pub prometheus_pod_names: Vec<String>,
}

impl std::fmt::Debug for MonitoringContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringContext")
            .field("route_host", &self.route_host)
            .field("ca_bundle_path", &self.ca_bundle_path)
            .field("service_account_token", &"<redacted>")
            .field("prometheus_pod_names", &self.prometheus_pod_names)
            .finish()
    }
}

/// Outcome of one collection call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionResult {
    /// Output written to the bundle
    Written,
    /// Resource absent
    Skipped,
    /// Query or write error, logged
    Failed,
}

impl CollectionResult {
    pub fn is_written(&self) -> bool {
        matches!(self, CollectionResult::Written)
    }
}
