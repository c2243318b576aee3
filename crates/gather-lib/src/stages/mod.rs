//! Collection stages
//!
//! Each stage is a short, ordered list of collection calls with fixed
//! output paths. Stages never fail: every call's outcome is recorded by the
//! [`Gatherer`](crate::gatherer::Gatherer) and the stage moves on.

mod instances;
mod monitoring;
mod olm;
mod operator;
mod workload;

#[cfg(test)]
pub(crate) mod tests;

pub use instances::collect_instances;
pub use monitoring::{collect_monitoring, rules_url};
pub use olm::collect_olm_info;
pub use operator::collect_operator_info;
pub use workload::{collect_pod, collect_workload};
