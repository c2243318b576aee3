//! Stage and full-run tests against a fake cluster
//!
//! These tests drive the stages (and the orchestrator) with an in-memory
//! cluster and inspect the bundle written to a temporary directory.

use crate::config::GatherConfig;
use crate::layout::{instances, monitoring, workload};
use crate::testing::FakeCluster;
use serde_json::json;
use std::path::Path;

const WORKLOAD_NS: &str = "power";
const UWM_NS: &str = "openshift-user-workload-monitoring";

/// Add the objects monitoring discovery needs
pub(crate) fn monitoring_cluster(fake: FakeCluster, prometheus_pods: &[&str]) -> FakeCluster {
    fake.with_object(
        "route",
        monitoring::ROUTE,
        Some("openshift-monitoring"),
        json!({ "spec": { "host": "thanos.apps.example.com" } }),
    )
    .with_object(
        "configmap",
        monitoring::CA_CONFIGMAP,
        Some("openshift-monitoring"),
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": monitoring::CA_CONFIGMAP },
            "data": { "service-ca.crt": "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n" }
        }),
    )
    .with_pods(UWM_NS, monitoring::PROMETHEUS_SELECTOR, prometheus_pods)
}

/// Add the internal and user-facing Kepler resources
pub(crate) fn instances_cluster(fake: FakeCluster, workload_ns: &str) -> FakeCluster {
    fake.with_object(
        instances::INTERNAL_KIND,
        instances::INTERNAL_NAME,
        None,
        json!({
            "kind": "KeplerInternal",
            "metadata": { "name": "kepler" },
            "spec": { "exporter": { "deployment": { "namespace": workload_ns } } }
        }),
    )
    .with_object(instances::KIND, "kepler", None, json!({ "kind": "Kepler" }))
}

/// Add exporter objects and pods
pub(crate) fn workload_cluster(fake: FakeCluster, pods: &[&str]) -> FakeCluster {
    fake.with_object("daemonset", workload::DAEMONSET, Some(WORKLOAD_NS), json!({}))
        .with_object("configmap", workload::CONFIGMAP, Some(WORKLOAD_NS), json!({}))
        .with_object("serviceaccount", workload::SERVICE_ACCOUNT, Some(WORKLOAD_NS), json!({}))
        .with_object("securitycontextconstraints", workload::SCC, None, json!({}))
        .with_pods(WORKLOAD_NS, workload::POD_SELECTOR, pods)
}

/// Add the operator's OLM install objects
pub(crate) fn operator_cluster(fake: FakeCluster, namespace: &str, operator: &str) -> FakeCluster {
    let selector = format!("operators.coreos.com/{}.{}", operator, namespace);
    fake.with_labeled(
        "subscription",
        &selector,
        Some(namespace),
        json!({
            "spec": { "source": "kepler-catalog", "sourceNamespace": "openshift-marketplace" },
            "status": { "installPlanRef": { "name": "install-xyz" } }
        }),
    )
    .with_object("catalogsource", "kepler-catalog", Some("openshift-marketplace"), json!({}))
    .with_object("installplan", "install-xyz", Some(namespace), json!({}))
    .with_labeled(
        "deployment",
        &selector,
        Some(namespace),
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": format!("{}-controller", operator) }
        }),
    )
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

mod workload_tests {
    use super::*;
    use crate::discovery::Discovery;
    use crate::gatherer::Gatherer;
    use crate::sink::OutputSink;
    use crate::stages::collect_workload;
    use tempfile::TempDir;

    fn resolved() -> Discovery {
        Discovery {
            workload_namespace: Some(WORKLOAD_NS.to_string()),
        }
    }

    #[tokio::test]
    async fn test_every_pod_gets_a_directory_even_after_a_failed_pod() {
        let dir = TempDir::new().unwrap();
        let fake = workload_cluster(FakeCluster::new(), &["kepler-c", "kepler-a", "kepler-b"])
            .fail_pod("kepler-b");
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(dir.path()));

        collect_workload(&mut gatherer, &resolved()).await;

        let info = dir.path().join(workload::DIR);
        assert_eq!(file_names(&info), vec!["kepler-a", "kepler-b", "kepler-c"]);
        assert_eq!(
            file_names(&info.join("kepler-a")),
            vec![
                "ebpf-info",
                "env-variables",
                "kepler-pod.yaml",
                "kepler.log",
                "kernel-info",
                "node-cpuid-info"
            ]
        );
        assert!(file_names(&info.join("kepler-b")).is_empty());
        assert_eq!(file_names(&info.join("kepler-c")).len(), 6);

        // pods are processed in name order, the failed one did not stop the next
        let execs = fake.calls_mentioning("exec power/");
        let first_c = execs.iter().position(|c| c.contains("kepler-c")).unwrap();
        let last_b = execs.iter().rposition(|c| c.contains("kepler-b")).unwrap();
        assert!(last_b < first_c);
        assert_eq!(gatherer.tally().failed, 6);
    }

    #[tokio::test]
    async fn test_failed_probe_does_not_block_the_rest() {
        let dir = TempDir::new().unwrap();
        let fake = workload_cluster(FakeCluster::new(), &["kepler-a"]).fail_exec("cpuid -1");
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(dir.path()));

        collect_workload(&mut gatherer, &resolved()).await;

        let pod_dir = dir.path().join(workload::DIR).join("kepler-a");
        let files = file_names(&pod_dir);
        assert_eq!(files.len(), 5);
        assert!(!files.contains(&"node-cpuid-info".to_string()));
    }

    #[tokio::test]
    async fn test_namespace_objects_collected() {
        let dir = TempDir::new().unwrap();
        let fake = workload_cluster(FakeCluster::new(), &[]);
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(dir.path()));

        collect_workload(&mut gatherer, &resolved()).await;

        for file in ["kepler-ds.yaml", "kepler-cm.yaml", "kepler-sa.yaml", "kepler-scc.yaml"] {
            assert!(dir.path().join(file).exists(), "missing {file}");
        }
        // no pods: no per-pod tree, and that is not a failure
        assert!(!dir.path().join(workload::DIR).exists());
        assert_eq!(gatherer.tally().failed, 0);
        // events query ran against the workload namespace
        assert_eq!(fake.calls_mentioning("get events").len(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_namespace_makes_no_calls() {
        let dir = TempDir::new().unwrap();
        let fake = workload_cluster(FakeCluster::new(), &["kepler-a"]);
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(dir.path()));

        collect_workload(&mut gatherer, &Discovery::default()).await;

        assert!(fake.calls().is_empty());
        assert_eq!(gatherer.tally().total(), 0);
    }

    #[tokio::test]
    async fn test_pod_list_failure_is_recorded() {
        let dir = TempDir::new().unwrap();
        let fake = workload_cluster(FakeCluster::new(), &["kepler-a"]).fail_get("pod");
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(dir.path()));

        collect_workload(&mut gatherer, &resolved()).await;

        assert!(fake.calls_mentioning("exec").is_empty());
        assert!(gatherer
            .tally()
            .records
            .iter()
            .any(|r| r.step.action == "list" && r.step.kind == "pod"));
    }
}

mod instance_tests {
    use super::*;
    use crate::gatherer::Gatherer;
    use crate::sink::OutputSink;
    use crate::stages::collect_instances;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_internal_kind_stops_stage() {
        let dir = TempDir::new().unwrap();
        let fake = FakeCluster::new()
            .without_kind(instances::INTERNAL_KIND)
            .with_object(instances::KIND, "kepler", None, json!({}));
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(dir.path()));

        let discovered = collect_instances(&mut gatherer, &GatherConfig::default()).await;

        assert_eq!(discovered.workload_namespace, None);
        assert!(fake.calls_mentioning(instances::KIND).is_empty());
        assert!(!dir.path().join(instances::KEPLERS_FILE).exists());
    }

    #[tokio::test]
    async fn test_no_internal_object_leaves_namespace_unresolved() {
        let dir = TempDir::new().unwrap();
        let fake = FakeCluster::new();
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(dir.path()));

        let discovered = collect_instances(&mut gatherer, &GatherConfig::default()).await;

        // type served but empty: both lists are saved, nothing to resolve from
        assert_eq!(discovered.workload_namespace, None);
        assert!(dir.path().join(instances::INTERNALS_FILE).exists());
        assert!(dir.path().join(instances::KEPLERS_FILE).exists());
        assert_eq!(gatherer.tally().failed, 0);
    }

    #[tokio::test]
    async fn test_instances_written_and_namespace_resolved() {
        let dir = TempDir::new().unwrap();
        let fake = instances_cluster(FakeCluster::new(), WORKLOAD_NS);
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(dir.path()));

        let discovered = collect_instances(&mut gatherer, &GatherConfig::default()).await;

        assert_eq!(discovered.workload_namespace.as_deref(), Some(WORKLOAD_NS));
        assert!(dir.path().join(instances::INTERNALS_FILE).exists());
        assert!(dir.path().join(instances::KEPLERS_FILE).exists());
    }
}

mod operator_tests {
    use super::*;
    use crate::gatherer::Gatherer;
    use crate::models::CollectionTarget;
    use crate::sink::OutputSink;
    use crate::stages::collect_operator_info;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_queries_scoped_to_namespace_and_operator_label() {
        let dir = TempDir::new().unwrap();
        let target = CollectionTarget::new("bar", "foo", dir.path()).unwrap();
        let fake = operator_cluster(FakeCluster::new(), "foo", "bar");
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(&target.destination_dir));

        collect_operator_info(&mut gatherer, &target).await;

        let labeled = fake.calls_mentioning("-l operators.coreos.com/");
        assert!(!labeled.is_empty());
        for call in &labeled {
            assert!(
                call.ends_with("-l operators.coreos.com/bar.foo -n foo"),
                "unscoped call: {call}"
            );
        }
        for kind in ["subscription", "clusterserviceversion", "deployment", "pod"] {
            assert!(
                labeled.iter().any(|c| c.starts_with(&format!("get {kind} "))),
                "no labeled {kind} query"
            );
        }
        assert_eq!(
            fake.calls_mentioning("get installplan install-xyz -n foo").len(),
            2
        );
        assert_eq!(fake.calls_mentioning("logs foo/deployment/bar-controller").len(), 1);
    }

    #[tokio::test]
    async fn test_summary_append_order() {
        let dir = TempDir::new().unwrap();
        let target = CollectionTarget::new("bar", "foo", dir.path()).unwrap();
        let fake = operator_cluster(FakeCluster::new(), "foo", "bar");
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(&target.destination_dir));

        collect_operator_info(&mut gatherer, &target).await;

        let info = dir.path().join("bar-info");
        let summary = std::fs::read_to_string(info.join("summary.txt")).unwrap();
        let label = "NAME\noperators.coreos.com/bar.foo\n";
        let expected = format!(
            "NAME\nkepler-catalog\n{label}NAME\ninstall-xyz\n{label}{label}{label}"
        );
        assert_eq!(summary, expected);

        for file in [
            "subscription.yaml",
            "catalogsource.yaml",
            "installplan.yaml",
            "csv.yaml",
            "deployment.yaml",
            "pod.yaml",
            "operator.log",
        ] {
            assert!(info.join(file).exists(), "missing {file}");
        }
    }

    #[tokio::test]
    async fn test_rerun_does_not_duplicate_summary() {
        let dir = TempDir::new().unwrap();
        let target = CollectionTarget::new("bar", "foo", dir.path()).unwrap();
        let fake = operator_cluster(FakeCluster::new(), "foo", "bar");

        for _ in 0..2 {
            let mut gatherer = Gatherer::new(&fake, OutputSink::new(&target.destination_dir));
            collect_operator_info(&mut gatherer, &target).await;
        }

        let summary = std::fs::read_to_string(dir.path().join("bar-info/summary.txt")).unwrap();
        assert_eq!(summary.matches("NAME\n").count(), 6);
    }

    #[tokio::test]
    async fn test_missing_subscription_skips_dependent_objects() {
        let dir = TempDir::new().unwrap();
        let target = CollectionTarget::new("bar", "foo", dir.path()).unwrap();
        let fake = FakeCluster::new();
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(&target.destination_dir));

        collect_operator_info(&mut gatherer, &target).await;

        assert!(fake.calls_mentioning("catalogsource").is_empty());
        assert!(fake.calls_mentioning("installplan").is_empty());
        assert!(fake.calls_mentioning("logs").is_empty());
        assert!(gatherer.tally().skipped >= 2);
    }
}

mod monitoring_tests {
    use super::*;
    use crate::discovery::monitoring_context;
    use crate::gatherer::Gatherer;
    use crate::sink::OutputSink;
    use crate::stages::collect_monitoring;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_rules_and_per_pod_snapshots() {
        let dir = TempDir::new().unwrap();
        let config = GatherConfig::default();
        let fake = monitoring_cluster(FakeCluster::new(), &["prometheus-user-workload-1", "prometheus-user-workload-0"]);
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(dir.path()));

        let ctx = monitoring_context(&mut gatherer, &config).await.unwrap();
        collect_monitoring(&mut gatherer, &ctx, &config).await;

        let uwm = dir.path().join(monitoring::DIR);
        assert!(uwm.join("rules.json").exists());
        assert!(uwm.join("ca-bundle.crt").exists());
        for pod in ["prometheus-user-workload-0", "prometheus-user-workload-1"] {
            for file in [
                "status/runtimeinfo.json",
                "status/config.json",
                "active-targets.json",
                "status/tsdb.json",
            ] {
                assert!(uwm.join(pod).join(file).exists(), "missing {pod}/{file}");
            }
        }

        assert_eq!(
            fake.calls_mentioning("proxy"),
            vec!["proxy https://thanos.apps.example.com/api/v1/rules"]
        );
        let snapshots = fake.calls_mentioning("curl -s http://localhost:9090/api/v1/");
        assert_eq!(snapshots.len(), 8);
        assert!(snapshots[0].contains("prometheus-user-workload-0"));
        assert!(snapshots[0].starts_with(&format!("exec {UWM_NS}/")));
    }

    #[tokio::test]
    async fn test_rules_failure_still_collects_pods() {
        let dir = TempDir::new().unwrap();
        let config = GatherConfig::default();
        let fake = monitoring_cluster(FakeCluster::new(), &["prometheus-0"]).fail_proxy();
        let mut gatherer = Gatherer::new(&fake, OutputSink::new(dir.path()));

        let ctx = monitoring_context(&mut gatherer, &config).await.unwrap();
        collect_monitoring(&mut gatherer, &ctx, &config).await;

        assert!(!dir.path().join("uwm-info/rules.json").exists());
        assert!(dir.path().join("uwm-info/prometheus-0/status/tsdb.json").exists());
        assert_eq!(gatherer.tally().failed, 1);
    }
}

mod run_tests {
    use super::*;
    use crate::models::CollectionTarget;
    use crate::orchestrator::{Orchestrator, Phase};
    use tempfile::TempDir;

    fn full_cluster() -> FakeCluster {
        let fake = operator_cluster(FakeCluster::new(), "openshift-operators", "kepler-operator");
        let fake = instances_cluster(fake, WORKLOAD_NS);
        let fake = workload_cluster(fake, &["kepler-a", "kepler-b"]);
        monitoring_cluster(fake, &["prometheus-0"])
    }

    fn target(dir: &TempDir) -> CollectionTarget {
        CollectionTarget::new("kepler-operator", "openshift-operators", dir.path()).unwrap()
    }

    #[tokio::test]
    async fn test_full_run_visits_every_phase() {
        let dir = TempDir::new().unwrap();
        let fake = full_cluster();

        let report = Orchestrator::new(&fake, target(&dir), GatherConfig::default())
            .run()
            .await;

        assert_eq!(
            report.phases,
            vec![
                Phase::Init,
                Phase::Olm,
                Phase::OperatorInfo,
                Phase::Instances,
                Phase::WorkloadDiagnostics,
                Phase::MonitoringDiscovery,
                Phase::Monitoring,
                Phase::Done,
            ]
        );
        assert!(report.monitoring_collected);
        assert_eq!(report.workload_namespace.as_deref(), Some(WORKLOAD_NS));
        assert_eq!(file_names(&dir.path().join("kepler-info")), vec!["kepler-a", "kepler-b"]);

        report.save().await.unwrap();
        let saved: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("gather-summary.json")).unwrap()).unwrap();
        assert_eq!(saved["phases"].as_array().unwrap().last().unwrap(), "done");
        assert_eq!(saved["target"]["operator_name"], "kepler-operator");
    }

    #[tokio::test]
    async fn test_token_failure_skips_monitoring_stage() {
        let dir = TempDir::new().unwrap();
        let fake = full_cluster().fail_token();

        let report = Orchestrator::new(&fake, target(&dir), GatherConfig::default())
            .run()
            .await;

        assert!(!report.monitoring_collected);
        assert!(report.phases.contains(&Phase::SkipMonitoring));
        assert!(!report.phases.contains(&Phase::Monitoring));
        assert_eq!(report.phases.last(), Some(&Phase::Done));
        assert!(fake.calls_mentioning("proxy").is_empty());
        assert!(fake.calls_mentioning(&format!("exec {UWM_NS}/")).is_empty());
        assert!(!dir.path().join("uwm-info/rules.json").exists());
        // workload collection before it was unaffected
        assert!(dir.path().join("kepler-info/kepler-a/kepler.log").exists());
    }

    #[tokio::test]
    async fn test_missing_parent_resource_skips_workload() {
        let dir = TempDir::new().unwrap();
        let fake = workload_cluster(FakeCluster::new(), &["kepler-a"]);

        let report = Orchestrator::new(&fake, target(&dir), GatherConfig::default())
            .run()
            .await;

        assert_eq!(report.workload_namespace, None);
        assert!(fake.calls_mentioning(&format!("-n {WORKLOAD_NS}")).is_empty());
        assert!(fake.calls_mentioning(&format!("exec {WORKLOAD_NS}/")).is_empty());
        assert!(!dir.path().join("kepler-info").exists());
        assert_eq!(report.phases.last(), Some(&Phase::Done));
    }

    #[tokio::test]
    async fn test_empty_cluster_still_completes() {
        let dir = TempDir::new().unwrap();
        let fake = FakeCluster::new();

        let report = Orchestrator::new(&fake, target(&dir), GatherConfig::default())
            .run()
            .await;

        assert_eq!(report.phases.last(), Some(&Phase::Done));
        assert!(report.phases.contains(&Phase::SkipMonitoring));
        assert_eq!(report.workload_namespace, None);
        assert!(report.tally.skipped > 0);
    }
}
