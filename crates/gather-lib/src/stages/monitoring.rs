//! User-workload monitoring snapshot

use crate::config::GatherConfig;
use crate::gatherer::Gatherer;
use crate::layout::monitoring;
use crate::models::{ContainerRef, MonitoringContext};
use crate::observability::Step;
use std::path::Path;
use tracing::info;
use url::Url;

/// Rules endpoint behind the route
pub fn rules_url(route_host: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("https://{}/", route_host))?.join(monitoring::RULES_PATH)
}

/// Active rules through the route, then four API snapshots per prometheus pod
pub async fn collect_monitoring(
    gatherer: &mut Gatherer<'_>,
    ctx: &MonitoringContext,
    config: &GatherConfig,
) {
    info!(
        stage = "monitoring",
        route_host = %ctx.route_host,
        pods = ctx.prometheus_pod_names.len(),
        "Collecting monitoring snapshot"
    );
    let dir = Path::new(monitoring::DIR);

    collect_rules(gatherer, ctx, &dir.join(monitoring::RULES_FILE)).await;

    for pod in &ctx.prometheus_pod_names {
        let container = ContainerRef {
            namespace: config.user_workload_namespace.clone(),
            pod: pod.clone(),
            container: monitoring::PROMETHEUS_CONTAINER.to_string(),
        };
        for (api, file) in monitoring::SNAPSHOTS {
            let url = format!("{}/{}", monitoring::PROMETHEUS_LOCAL_API, api);
            gatherer
                .exec(&container, &["curl", "-s", &url], &dir.join(pod).join(file))
                .await;
        }
    }
}

async fn collect_rules(gatherer: &mut Gatherer<'_>, ctx: &MonitoringContext, output: &Path) {
    let step = || Step::new("proxy", "rules", ctx.route_host.clone());

    let url = match rules_url(&ctx.route_host) {
        Ok(url) => url,
        Err(e) => {
            gatherer.note_failed(step(), format!("invalid route host: {}", e));
            return;
        }
    };

    let ca_path = match gatherer.sink().resolve(&ctx.ca_bundle_path) {
        Ok(path) => path,
        Err(e) => {
            gatherer.note_failed(step(), e.to_string());
            return;
        }
    };
    let ca_bundle = match tokio::fs::read(&ca_path).await {
        Ok(ca) => ca,
        Err(e) => {
            gatherer.note_failed(step(), format!("CA bundle unreadable: {}", e));
            return;
        }
    };

    gatherer
        .proxy_get(
            url.as_str(),
            &ctx.service_account_token,
            &ca_bundle,
            output,
        )
        .await;
}
