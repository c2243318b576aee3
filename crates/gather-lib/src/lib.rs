//! Diagnostic bundle collection for the Kepler operator
//!
//! This crate provides the core functionality for:
//! - Querying the cluster through the `oc` CLI and the monitoring route
//! - Discovering the workload namespace, pods and monitoring endpoints
//! - Running the collection stages in a fixed order
//! - Writing every artifact atomically into the bundle directory
//!
//! Individual query failures never abort a run. They are recorded in a
//! [`RunTally`] and reported at the end.

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod gatherer;
pub mod layout;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod sink;
pub mod stages;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{CliClient, ClusterClient};
pub use config::GatherConfig;
pub use error::{DiscoveryError, QueryError, SinkError};
pub use models::*;
pub use observability::{RunTally, Step, StepRecord};
pub use orchestrator::{prepare_destination, Orchestrator, Phase, RunReport};
