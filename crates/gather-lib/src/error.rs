//! Error types for cluster queries, bundle writes and discovery

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single cluster query
#[derive(Debug, Error)]
pub enum QueryError {
    /// The requested resource (or resource type) does not exist
    #[error("{kind} {name} not found{}", namespace_suffix(.namespace))]
    NotFound {
        kind: String,
        name: String,
        namespace: Option<String>,
    },

    /// The CLI tool ran but exited unsuccessfully
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The CLI tool could not be started
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP request through a route failed
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// Output could not be decoded
    #[error("failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    /// A document was fetched but the expected field was absent
    #[error("{kind} {name} has no field {field}")]
    MissingField {
        kind: String,
        name: String,
        field: String,
    },
}

fn namespace_suffix(namespace: &Option<String>) -> String {
    match namespace {
        Some(ns) => format!(" in namespace {}", ns),
        None => String::new(),
    }
}

impl QueryError {
    /// Create a not-found error for a resource
    pub fn not_found(kind: &str, name: &str, namespace: Option<&str>) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
        }
    }

    /// Create a decode error
    pub fn decode(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Returns true if the resource is absent rather than the query broken
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failure writing into the bundle
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("refusing to write outside the bundle: {0}")]
    InvalidPath(PathBuf),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A value needed by a later stage could not be derived
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("discovery of {what} failed: {source}")]
    Query {
        what: &'static str,
        #[source]
        source: QueryError,
    },

    #[error("discovered {what} could not be saved to {path}")]
    Unwritable { what: &'static str, path: PathBuf },
}

impl DiscoveryError {
    pub fn query(what: &'static str, source: QueryError) -> Self {
        Self::Query { what, source }
    }
}
