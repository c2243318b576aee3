//! OLM state relevant to the operator's install

use crate::gatherer::Gatherer;
use crate::layout::olm;
use crate::models::{CollectionTarget, LogSource, ResourceQuery};
use std::path::Path;
use tracing::info;

/// Package manifest, OLM pods and OLM controller logs
pub async fn collect_olm_info(gatherer: &mut Gatherer<'_>, target: &CollectionTarget) {
    info!(stage = "olm", "Collecting OLM info");
    let dir = Path::new(olm::DIR);

    gatherer
        .get(
            &ResourceQuery::named("packagemanifest", &target.operator_name)
                .in_namespace(olm::MARKETPLACE_NAMESPACE)
                .to(dir.join(olm::PACKAGE_MANIFEST_FILE)),
        )
        .await;

    gatherer
        .get(
            &ResourceQuery::all("pod")
                .in_namespace(olm::NAMESPACE)
                .to(dir.join(olm::PODS_FILE)),
        )
        .await;

    for (reference, file) in [
        (olm::OLM_OPERATOR, olm::OLM_OPERATOR_LOG),
        (olm::CATALOG_OPERATOR, olm::CATALOG_OPERATOR_LOG),
    ] {
        let source = LogSource::Workload {
            namespace: olm::NAMESPACE.to_string(),
            reference: reference.to_string(),
        };
        gatherer.logs(&source, &dir.join(file)).await;
    }
}
