//! Exporter workload: namespace objects and per-pod diagnostics

use crate::discovery::{self, Discovery};
use crate::gatherer::Gatherer;
use crate::layout::workload;
use crate::models::{ContainerRef, LogSource, OutputFormat, PodDiagnosticSet, ResourceQuery};
use crate::observability::Step;
use std::path::Path;
use tracing::{info, warn};

impl PodDiagnosticSet {
    /// Diagnostics for an exporter pod, under `kepler-info/<pod>`
    pub fn for_exporter(pod_name: &str) -> Self {
        Self {
            pod_name: pod_name.to_string(),
            container_name: workload::CONTAINER.to_string(),
            output_dir: Path::new(workload::DIR).join(pod_name),
        }
    }
}

/// Collect namespace-level objects, then diagnostics for every exporter pod
///
/// Does nothing (no cluster calls) when the workload namespace is unresolved.
pub async fn collect_workload(gatherer: &mut Gatherer<'_>, discovery: &Discovery) {
    let Some(ns) = discovery.workload_namespace.as_deref() else {
        info!(stage = "workload", "Workload namespace unresolved, skipping workload diagnostics");
        return;
    };
    info!(stage = "workload", namespace = %ns, "Collecting workload diagnostics");

    gatherer
        .get(
            &ResourceQuery::all("events")
                .in_namespace(ns)
                .format(OutputFormat::Table)
                .to(workload::events_file(ns)),
        )
        .await;

    for (kind, name, file) in [
        ("daemonset", workload::DAEMONSET, workload::DAEMONSET_FILE),
        ("configmap", workload::CONFIGMAP, workload::CONFIGMAP_FILE),
        ("serviceaccount", workload::SERVICE_ACCOUNT, workload::SERVICE_ACCOUNT_FILE),
    ] {
        gatherer
            .get(&ResourceQuery::named(kind, name).in_namespace(ns).to(file))
            .await;
    }
    gatherer
        .get(&ResourceQuery::named("securitycontextconstraints", workload::SCC).to(workload::SCC_FILE))
        .await;

    let pods = match discovery::pod_names(gatherer.client(), ns, workload::POD_SELECTOR).await {
        Ok(pods) => pods,
        Err(e) => {
            gatherer.note_failed(
                Step::new("list", "pod", format!("-l {}", workload::POD_SELECTOR)).in_namespace(Some(ns)),
                e.to_string(),
            );
            return;
        }
    };
    info!(namespace = %ns, count = pods.len(), "Discovered exporter pods");

    for pod in &pods {
        let set = PodDiagnosticSet::for_exporter(pod);
        let written = collect_pod(gatherer, ns, &set).await;
        info!(pod = %pod, written, "Finished pod diagnostics");
    }
}

/// Six independent diagnostic calls for one pod; returns how many produced output
pub async fn collect_pod(gatherer: &mut Gatherer<'_>, namespace: &str, set: &PodDiagnosticSet) -> usize {
    if let Err(e) = gatherer.sink().create_dir(&set.output_dir).await {
        warn!(pod = %set.pod_name, error = %e, "Could not create pod directory");
    }

    let dir = &set.output_dir;
    let container = ContainerRef {
        namespace: namespace.to_string(),
        pod: set.pod_name.clone(),
        container: set.container_name.clone(),
    };

    let mut results = Vec::with_capacity(6);
    results.push(
        gatherer
            .get(
                &ResourceQuery::named("pod", &set.pod_name)
                    .in_namespace(namespace)
                    .to(dir.join(workload::POD_FILE)),
            )
            .await,
    );
    for (command, file) in [
        (workload::CPUID_COMMAND, workload::CPUID_FILE),
        (workload::ENV_COMMAND, workload::ENV_FILE),
        (workload::KERNEL_COMMAND, workload::KERNEL_FILE),
        (workload::EBPF_COMMAND, workload::EBPF_FILE),
    ] {
        results.push(gatherer.exec(&container, command, &dir.join(file)).await);
    }
    results.push(
        gatherer
            .logs(&LogSource::Container(container), &dir.join(workload::LOG_FILE))
            .await,
    );

    results.iter().filter(|r| r.is_written()).count()
}
