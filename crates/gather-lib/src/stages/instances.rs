//! Kepler custom-resource instances

use crate::config::GatherConfig;
use crate::discovery::{self, Discovery};
use crate::gatherer::Gatherer;
use crate::layout::instances;
use crate::models::ResourceQuery;
use crate::observability::Step;
use tracing::{info, warn};

/// Collect the internal and user-facing resources and resolve the workload
/// namespace from the internal one
///
/// The user-facing kind is only looked up once the internal kind was
/// collected.
pub async fn collect_instances(gatherer: &mut Gatherer<'_>, config: &GatherConfig) -> Discovery {
    info!(stage = "instances", "Collecting custom resource instances");

    let internals = gatherer
        .get(&ResourceQuery::all(instances::INTERNAL_KIND).to(instances::INTERNALS_FILE))
        .await;
    if !internals.is_written() {
        warn!(
            kind = instances::INTERNAL_KIND,
            "Internal resources unavailable, skipping instance collection"
        );
        gatherer.note_skipped(
            Step::new("get", instances::KIND, "*"),
            "internal resources unavailable",
        );
        return Discovery::default();
    }

    gatherer
        .get(&ResourceQuery::all(instances::KIND).to(instances::KEPLERS_FILE))
        .await;

    let workload_namespace = match discovery::workload_namespace(gatherer.client(), config).await {
        Ok(ns) => ns,
        Err(e) => {
            gatherer.note_failed(
                Step::new("discover", instances::INTERNAL_KIND, instances::INTERNAL_NAME),
                e.to_string(),
            );
            None
        }
    };

    Discovery { workload_namespace }
}
