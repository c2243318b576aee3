//! Cluster object names and bundle paths

/// OLM
pub mod olm {
    pub const NAMESPACE: &str = "openshift-operator-lifecycle-manager";
    pub const MARKETPLACE_NAMESPACE: &str = "openshift-marketplace";
    pub const OLM_OPERATOR: &str = "deployment/olm-operator";
    pub const CATALOG_OPERATOR: &str = "deployment/catalog-operator";

    pub const DIR: &str = "olm-info";
    pub const PACKAGE_MANIFEST_FILE: &str = "packagemanifest.yaml";
    pub const PODS_FILE: &str = "olm-pods.yaml";
    pub const OLM_OPERATOR_LOG: &str = "olm-operator.log";
    pub const CATALOG_OPERATOR_LOG: &str = "catalog-operator.log";
}

/// Operator install (subscription and everything it produced)
pub mod operator {
    pub const SUBSCRIPTION_FILE: &str = "subscription.yaml";
    pub const CATALOG_SOURCE_FILE: &str = "catalogsource.yaml";
    pub const INSTALL_PLAN_FILE: &str = "installplan.yaml";
    pub const CSV_FILE: &str = "csv.yaml";
    pub const DEPLOYMENT_FILE: &str = "deployment.yaml";
    pub const POD_FILE: &str = "pod.yaml";
    pub const LOG_FILE: &str = "operator.log";
    pub const SUMMARY_FILE: &str = "summary.txt";
}

/// Kepler custom resources
pub mod instances {
    pub const INTERNAL_KIND: &str = "keplerinternals.kepler.system.sustainable.computing.io";
    pub const INTERNAL_NAME: &str = "kepler";
    pub const KIND: &str = "keplers.kepler.system.sustainable.computing.io";

    /// JSON pointer to the workload namespace inside the internal resource
    pub const NAMESPACE_FIELD: &str = "/spec/exporter/deployment/namespace";

    pub const INTERNALS_FILE: &str = "kepler-internals.yaml";
    pub const KEPLERS_FILE: &str = "keplers.yaml";
}

/// Exporter workload
pub mod workload {
    pub const DAEMONSET: &str = "kepler-exporter-ds";
    pub const CONFIGMAP: &str = "kepler-exporter-cm";
    pub const SERVICE_ACCOUNT: &str = "kepler-exporter-sa";
    pub const SCC: &str = "kepler-exporter-scc";
    pub const POD_SELECTOR: &str =
        "app.kubernetes.io/component=exporter,app.kubernetes.io/part-of=kepler";
    pub const CONTAINER: &str = "kepler-exporter";

    pub const DAEMONSET_FILE: &str = "kepler-ds.yaml";
    pub const CONFIGMAP_FILE: &str = "kepler-cm.yaml";
    pub const SERVICE_ACCOUNT_FILE: &str = "kepler-sa.yaml";
    pub const SCC_FILE: &str = "kepler-scc.yaml";

    pub const DIR: &str = "kepler-info";
    pub const POD_FILE: &str = "kepler-pod.yaml";
    pub const CPUID_FILE: &str = "node-cpuid-info";
    pub const ENV_FILE: &str = "env-variables";
    pub const KERNEL_FILE: &str = "kernel-info";
    pub const EBPF_FILE: &str = "ebpf-info";
    pub const LOG_FILE: &str = "kepler.log";

    pub const CPUID_COMMAND: &[&str] = &["cpuid", "-1"];
    pub const ENV_COMMAND: &[&str] = &["env"];
    pub const KERNEL_COMMAND: &[&str] = &["uname", "-a"];
    pub const EBPF_COMMAND: &[&str] = &["bpftool", "-f", "prog", "show"];

    /// File holding the namespace's events
    pub fn events_file(namespace: &str) -> String {
        format!("{}_events", namespace)
    }
}

/// User-workload monitoring
pub mod monitoring {
    pub const ROUTE: &str = "thanos-querier";
    pub const SERVICE_ACCOUNT: &str = "prometheus-k8s";
    pub const CA_CONFIGMAP: &str = "serving-certs-ca-bundle";
    pub const CA_KEY: &str = "service-ca.crt";
    pub const PROMETHEUS_SELECTOR: &str = "app.kubernetes.io/name=prometheus";
    pub const PROMETHEUS_CONTAINER: &str = "prometheus";
    pub const PROMETHEUS_LOCAL_API: &str = "http://localhost:9090/api/v1";
    pub const RULES_PATH: &str = "api/v1/rules";

    pub const DIR: &str = "uwm-info";
    pub const CA_BUNDLE_FILE: &str = "ca-bundle.crt";
    pub const RULES_FILE: &str = "rules.json";

    /// (API path below the local prometheus API, output file below the pod dir)
    pub const SNAPSHOTS: &[(&str, &str)] = &[
        ("status/runtimeinfo", "status/runtimeinfo.json"),
        ("status/config", "status/config.json"),
        ("targets?state=active", "active-targets.json"),
        ("status/tsdb", "status/tsdb.json"),
    ];
}

pub const DEBUG_LOG_FILE: &str = "gather-debug.log";
pub const SUMMARY_FILE: &str = "gather-summary.json";
