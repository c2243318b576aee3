//! Cluster query client
//!
//! Every cluster interaction of a gather run goes through [`ClusterClient`].
//! The production implementation shells out to the cluster CLI tool; tests
//! substitute an in-memory fake.

mod cli;
mod proxy;

pub use cli::CliClient;

use crate::error::QueryError;
use crate::models::{ContainerRef, LogSource, OutputFormat, ResourceQuery};
use async_trait::async_trait;

/// Blocking-semantics cluster operations (one call in flight, no retry)
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Read resources; `NotFound` when the named object or its type is absent
    async fn get(&self, query: &ResourceQuery) -> Result<Vec<u8>, QueryError>;

    /// Run a command inside a container
    async fn exec(&self, container: &ContainerRef, command: &[&str])
        -> Result<Vec<u8>, QueryError>;

    /// Read container logs
    async fn logs(&self, source: &LogSource) -> Result<Vec<u8>, QueryError>;

    /// Issue a short-lived token for a service account
    async fn issue_token(
        &self,
        namespace: &str,
        service_account: &str,
        duration: &str,
    ) -> Result<String, QueryError>;

    /// HTTPS GET through a cluster route, trusting only `ca_bundle`
    async fn proxy_get(
        &self,
        url: &str,
        token: &str,
        ca_bundle: &[u8],
    ) -> Result<Vec<u8>, QueryError>;

    /// Whether a named object exists
    async fn exists(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<bool, QueryError> {
        let mut query = ResourceQuery::named(kind, name).format(OutputFormat::Name);
        if let Some(ns) = namespace {
            query = query.in_namespace(ns);
        }
        match self.get(&query).await {
            Ok(out) => Ok(!String::from_utf8_lossy(&out).trim().is_empty()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// `get` rendered as JSON and decoded
    async fn get_json(&self, query: &ResourceQuery) -> Result<serde_json::Value, QueryError> {
        let query = query.clone().format(OutputFormat::Json);
        let out = self.get(&query).await?;
        serde_json::from_slice(&out)
            .map_err(|e| QueryError::decode(format!("{} {}", query.kind, query.target_name()), e))
    }
}
