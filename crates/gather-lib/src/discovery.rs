//! Resource discovery
//!
//! Derives the identifiers later stages depend on: the workload namespace,
//! workload pod names and the monitoring endpoints. Everything discovered
//! lands in a [`Discovery`] value that stages read but never modify.

use crate::client::ClusterClient;
use crate::config::GatherConfig;
use crate::error::{DiscoveryError, QueryError};
use crate::gatherer::Gatherer;
use crate::layout::{instances, monitoring};
use crate::models::{MonitoringContext, OutputFormat, ResourceQuery};
use crate::observability::Step;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::Metadata;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Values discovered during one run
#[derive(Debug, Default)]
pub struct Discovery {
    /// Set only when the internal custom resource exists
    pub workload_namespace: Option<String>,
}

/// `items` of a list response
#[derive(Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Resolve the namespace the exporter workload runs in
///
/// Returns `Ok(None)` when the internal custom resource is absent.
pub async fn workload_namespace(
    client: &dyn ClusterClient,
    config: &GatherConfig,
) -> Result<Option<String>, QueryError> {
    if !client
        .exists(instances::INTERNAL_KIND, instances::INTERNAL_NAME, None)
        .await?
    {
        info!(
            kind = instances::INTERNAL_KIND,
            name = instances::INTERNAL_NAME,
            "Internal resource absent, workload namespace unresolved"
        );
        return Ok(None);
    }

    let doc = client
        .get_json(&ResourceQuery::named(
            instances::INTERNAL_KIND,
            instances::INTERNAL_NAME,
        ))
        .await?;

    let namespace = match doc
        .pointer(instances::NAMESPACE_FIELD)
        .and_then(|v| v.as_str())
        .filter(|ns| !ns.is_empty())
    {
        Some(ns) => ns.to_string(),
        None => {
            debug!("Namespace field empty, using default");
            config.workload_namespace_default.clone()
        }
    };

    info!(namespace = %namespace, "Resolved workload namespace");
    Ok(Some(namespace))
}

/// Names of pods matching `selector`, sorted
///
/// An empty result is not an error.
pub async fn pod_names(
    client: &dyn ClusterClient,
    namespace: &str,
    selector: &str,
) -> Result<Vec<String>, QueryError> {
    listed_names::<Pod>(client, "pod", namespace, selector).await
}

/// Names of deployments matching `selector`, sorted
pub async fn deployment_names(
    client: &dyn ClusterClient,
    namespace: &str,
    selector: &str,
) -> Result<Vec<String>, QueryError> {
    listed_names::<Deployment>(client, "deployment", namespace, selector).await
}

async fn listed_names<K>(
    client: &dyn ClusterClient,
    kind: &str,
    namespace: &str,
    selector: &str,
) -> Result<Vec<String>, QueryError>
where
    K: Metadata<Ty = ObjectMeta> + DeserializeOwned,
{
    let query = ResourceQuery::labeled(kind, selector)
        .in_namespace(namespace)
        .format(OutputFormat::Json);
    let out = client.get(&query).await?;

    let list: ItemList<K> = serde_json::from_slice(&out)
        .map_err(|e| QueryError::decode(format!("{} list -l {}", kind, selector), e))?;

    let mut names: Vec<String> = list
        .items
        .iter()
        .filter_map(|item| item.metadata().name.clone())
        .collect();
    names.sort();

    debug!(kind = %kind, namespace = %namespace, selector = %selector, count = names.len(), "Listed objects");
    Ok(names)
}

/// Discover everything the monitoring stage needs
///
/// The CA bundle is saved into the bundle as part of discovery since the
/// monitoring stage reads it back from there.
pub async fn monitoring_context(
    gatherer: &mut Gatherer<'_>,
    config: &GatherConfig,
) -> Result<MonitoringContext, DiscoveryError> {
    let client = gatherer.client();
    let platform_ns = config.monitoring_namespace.as_str();

    let route = client
        .get_json(&ResourceQuery::named("route", monitoring::ROUTE).in_namespace(platform_ns))
        .await
        .map_err(|e| DiscoveryError::query("monitoring route", e))?;
    let route_host = route
        .pointer("/spec/host")
        .and_then(|v| v.as_str())
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            DiscoveryError::query(
                "monitoring route",
                QueryError::MissingField {
                    kind: "route".to_string(),
                    name: monitoring::ROUTE.to_string(),
                    field: "spec.host".to_string(),
                },
            )
        })?;

    let token = client
        .issue_token(platform_ns, monitoring::SERVICE_ACCOUNT, &config.token_duration)
        .await
        .map_err(|e| DiscoveryError::query("monitoring token", e))?;

    let prometheus_pod_names = pod_names(
        client,
        &config.user_workload_namespace,
        monitoring::PROMETHEUS_SELECTOR,
    )
    .await
    .map_err(|e| DiscoveryError::query("prometheus pods", e))?;

    let ca_bundle = service_ca_bundle(client, platform_ns)
        .await
        .map_err(|e| DiscoveryError::query("service CA bundle", e))?;

    let ca_bundle_path = Path::new(monitoring::DIR).join(monitoring::CA_BUNDLE_FILE);
    let step = Step::new("write", "configmap", monitoring::CA_CONFIGMAP)
        .in_namespace(Some(platform_ns));
    if !gatherer
        .write(step, &ca_bundle_path, ca_bundle.as_bytes())
        .await
        .is_written()
    {
        return Err(DiscoveryError::Unwritable {
            what: "service CA bundle",
            path: ca_bundle_path,
        });
    }

    info!(
        route_host = %route_host,
        prometheus_pods = prometheus_pod_names.len(),
        "Discovered monitoring endpoints"
    );

    Ok(MonitoringContext {
        route_host,
        ca_bundle_path,
        service_account_token: token,
        prometheus_pod_names,
    })
}

async fn service_ca_bundle(client: &dyn ClusterClient, namespace: &str) -> Result<String, QueryError> {
    let doc = client
        .get_json(&ResourceQuery::named("configmap", monitoring::CA_CONFIGMAP).in_namespace(namespace))
        .await?;
    let configmap: ConfigMap = serde_json::from_value(doc)
        .map_err(|e| QueryError::decode(format!("configmap {}", monitoring::CA_CONFIGMAP), e))?;

    configmap
        .data
        .and_then(|mut data| data.remove(monitoring::CA_KEY))
        .filter(|ca| !ca.trim().is_empty())
        .ok_or_else(|| QueryError::MissingField {
            kind: "configmap".to_string(),
            name: monitoring::CA_CONFIGMAP.to_string(),
            field: format!("data.{}", monitoring::CA_KEY),
        })
}
