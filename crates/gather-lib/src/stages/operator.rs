//! Operator install: subscription, catalog source, install plan, CSV,
//! deployment, pods and logs

use crate::client::ClusterClient;
use crate::discovery;
use crate::error::QueryError;
use crate::gatherer::Gatherer;
use crate::layout::operator as files;
use crate::models::{CollectionTarget, LogSource, OutputFormat, ResourceQuery};
use crate::observability::Step;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Objects the subscription points at
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SubscriptionRefs {
    pub catalog_source: Option<String>,
    pub catalog_namespace: Option<String>,
    pub install_plan: Option<String>,
}

impl SubscriptionRefs {
    /// Read references from a subscription list (first item wins)
    pub(crate) fn from_list(list: &Value) -> Option<Self> {
        let subscription = list.pointer("/items/0")?;
        let text = |pointer: &str| {
            subscription
                .pointer(pointer)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some(Self {
            catalog_source: text("/spec/source"),
            catalog_namespace: text("/spec/sourceNamespace"),
            install_plan: text("/status/installPlanRef/name")
                .or_else(|| text("/status/installplan/name")),
        })
    }
}

async fn subscription_refs(
    client: &dyn ClusterClient,
    target: &CollectionTarget,
) -> Result<Option<SubscriptionRefs>, QueryError> {
    let list = client
        .get_json(
            &ResourceQuery::labeled("subscription", target.olm_selector())
                .in_namespace(&target.operator_namespace),
        )
        .await?;
    Ok(SubscriptionRefs::from_list(&list))
}

/// Collect the operator's OLM install objects, its logs and a wide summary
pub async fn collect_operator_info(gatherer: &mut Gatherer<'_>, target: &CollectionTarget) {
    info!(
        stage = "operator",
        operator = %target.operator_name,
        namespace = %target.operator_namespace,
        "Collecting operator info"
    );

    let dir = target.operator_info_dir();
    let ns = target.operator_namespace.as_str();
    let selector = target.olm_selector();

    let labeled = |kind: &str| {
        ResourceQuery::labeled(kind, selector.clone()).in_namespace(ns)
    };

    gatherer
        .get(&labeled("subscription").to(dir.join(files::SUBSCRIPTION_FILE)))
        .await;

    let refs = match subscription_refs(gatherer.client(), target).await {
        Ok(Some(refs)) => refs,
        Ok(None) => {
            gatherer.note_skipped(
                Step::new("get", "subscription", format!("-l {}", selector)).in_namespace(Some(ns)),
                "no subscription matches the operator; catalog source and install plan unknown",
            );
            SubscriptionRefs::default()
        }
        Err(e) => {
            gatherer.note_failed(
                Step::new("read", "subscription", format!("-l {}", selector)).in_namespace(Some(ns)),
                e.to_string(),
            );
            SubscriptionRefs::default()
        }
    };
    debug!(?refs, "Subscription references");

    let catalog_source = refs.catalog_source.as_ref().map(|name| {
        ResourceQuery::named("catalogsource", name)
            .in_namespace(refs.catalog_namespace.as_deref().unwrap_or(ns))
    });
    let install_plan = refs
        .install_plan
        .as_ref()
        .map(|name| ResourceQuery::named("installplan", name).in_namespace(ns));

    match &catalog_source {
        Some(query) => {
            gatherer
                .get(&query.clone().to(dir.join(files::CATALOG_SOURCE_FILE)))
                .await;
        }
        None => warn!("Catalog source unknown, skipping"),
    }
    match &install_plan {
        Some(query) => {
            gatherer
                .get(&query.clone().to(dir.join(files::INSTALL_PLAN_FILE)))
                .await;
        }
        None => warn!("Install plan unknown, skipping"),
    }

    gatherer
        .get(&labeled("clusterserviceversion").to(dir.join(files::CSV_FILE)))
        .await;
    gatherer
        .get(&labeled("deployment").to(dir.join(files::DEPLOYMENT_FILE)))
        .await;
    gatherer
        .get(&labeled("pod").to(dir.join(files::POD_FILE)))
        .await;

    collect_operator_logs(gatherer, target, &dir).await;

    // Summary order: catalog source, subscription, install plan, CSV, deployment, pod
    let summary_path = dir.join(files::SUMMARY_FILE);
    if let Err(e) = gatherer.sink().write(&summary_path, b"").await {
        warn!(error = %e, "Could not reset summary file");
    }
    let summary = [
        catalog_source,
        Some(labeled("subscription")),
        install_plan,
        Some(labeled("clusterserviceversion")),
        Some(labeled("deployment")),
        Some(labeled("pod")),
    ];
    for query in summary.into_iter().flatten() {
        gatherer
            .append_get(&query.format(OutputFormat::Wide).to(&summary_path))
            .await;
    }
}

async fn collect_operator_logs(gatherer: &mut Gatherer<'_>, target: &CollectionTarget, dir: &Path) {
    let ns = target.operator_namespace.as_str();
    let selector = target.olm_selector();

    let deployments = match discovery::deployment_names(gatherer.client(), ns, &selector).await {
        Ok(names) => names,
        Err(e) => {
            gatherer.note_failed(
                Step::new("list", "deployment", format!("-l {}", selector)).in_namespace(Some(ns)),
                e.to_string(),
            );
            return;
        }
    };

    if deployments.is_empty() {
        gatherer.note_skipped(
            Step::new("logs", "deployment", format!("-l {}", selector)).in_namespace(Some(ns)),
            "no operator deployment found",
        );
        return;
    }

    let single = deployments.len() == 1;
    for name in &deployments {
        let file = if single {
            files::LOG_FILE.to_string()
        } else {
            format!("{}.log", name)
        };
        let source = LogSource::Workload {
            namespace: ns.to_string(),
            reference: format!("deployment/{}", name),
        };
        gatherer.logs(&source, &dir.join(file)).await;
    }
}
