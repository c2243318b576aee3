//! In-memory [`ClusterClient`] for tests

use crate::client::ClusterClient;
use crate::error::QueryError;
use crate::models::{ContainerRef, LogSource, OutputFormat, ResourceQuery, Selection};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

type ObjectKey = (String, String, Option<String>);
type ListKey = (String, String, Option<String>);

/// Fake cluster that records every call
#[derive(Default)]
pub struct FakeCluster {
    objects: HashMap<ObjectKey, Value>,
    lists: HashMap<ListKey, Vec<Value>>,
    failing_kinds: HashSet<String>,
    missing_kinds: HashSet<String>,
    failing_exec: HashSet<String>,
    failing_pods: HashSet<String>,
    fail_token: bool,
    fail_proxy: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named object
    pub fn with_object(mut self, kind: &str, name: &str, namespace: Option<&str>, doc: Value) -> Self {
        self.objects.insert(
            (kind.to_string(), name.to_string(), namespace.map(str::to_string)),
            doc,
        );
        self
    }

    /// Add an object returned for a label selector
    pub fn with_labeled(mut self, kind: &str, selector: &str, namespace: Option<&str>, doc: Value) -> Self {
        self.lists
            .entry((kind.to_string(), selector.to_string(), namespace.map(str::to_string)))
            .or_default()
            .push(doc);
        self
    }

    /// Add pods matching `selector`, also reachable by name
    pub fn with_pods(mut self, namespace: &str, selector: &str, names: &[&str]) -> Self {
        for name in names {
            let pod = json!({
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": { "name": name, "namespace": namespace }
            });
            self = self
                .with_object("pod", name, Some(namespace), pod.clone())
                .with_labeled("pod", selector, Some(namespace), pod);
        }
        self
    }

    /// Every `get` of `kind` fails with a transport-style error
    pub fn fail_get(mut self, kind: &str) -> Self {
        self.failing_kinds.insert(kind.to_string());
        self
    }

    /// The resource type is not served (CRD not installed)
    pub fn without_kind(mut self, kind: &str) -> Self {
        self.missing_kinds.insert(kind.to_string());
        self
    }

    /// Every exec of `command` (space-joined) fails
    pub fn fail_exec(mut self, command: &str) -> Self {
        self.failing_exec.insert(command.to_string());
        self
    }

    /// Every exec, logs and get touching `pod` fails
    pub fn fail_pod(mut self, pod: &str) -> Self {
        self.failing_pods.insert(pod.to_string());
        self
    }

    pub fn fail_token(mut self) -> Self {
        self.fail_token = true;
        self
    }

    pub fn fail_proxy(mut self) -> Self {
        self.fail_proxy = true;
        self
    }

    /// Calls made so far, as `"<action> ..."` strings
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls mentioning `needle`
    pub fn calls_mentioning(&self, needle: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(needle))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn failure(command: String) -> QueryError {
        QueryError::CommandFailed {
            command,
            status: "exit status: 1".to_string(),
            stderr: "injected failure".to_string(),
        }
    }

    fn render(doc: &Value, kind: &str, name: &str, format: &OutputFormat) -> Vec<u8> {
        match format {
            OutputFormat::Name => format!("{}/{}\n", kind, name).into_bytes(),
            OutputFormat::Table | OutputFormat::Wide => format!("NAME\n{}\n", name).into_bytes(),
            _ => serde_json::to_vec_pretty(doc).unwrap(),
        }
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get(&self, query: &ResourceQuery) -> Result<Vec<u8>, QueryError> {
        let ns = query.namespace.clone();
        self.record(format!(
            "get {} {} -n {}",
            query.kind,
            query.target_name(),
            ns.as_deref().unwrap_or("")
        ));

        if self.failing_kinds.contains(&query.kind) {
            return Err(Self::failure(format!("get {}", query.kind)));
        }
        if self.missing_kinds.contains(&query.kind) {
            return Err(QueryError::not_found(&query.kind, &query.target_name(), ns.as_deref()));
        }

        match &query.selection {
            Selection::Named(name) => {
                if query.kind == "pod" && self.failing_pods.contains(name) {
                    return Err(Self::failure(format!("get pod {}", name)));
                }
                let key = (query.kind.clone(), name.clone(), ns.clone());
                match self.objects.get(&key) {
                    Some(doc) => Ok(Self::render(doc, &query.kind, name, &query.output_format)),
                    None => Err(QueryError::not_found(&query.kind, name, ns.as_deref())),
                }
            }
            Selection::Labeled(selector) => {
                let key = (query.kind.clone(), selector.clone(), ns);
                let items = self.lists.get(&key).cloned().unwrap_or_default();
                let list = json!({ "apiVersion": "v1", "kind": "List", "items": items });
                Ok(Self::render(&list, &query.kind, selector, &query.output_format))
            }
            Selection::All => {
                let items: Vec<Value> = self
                    .objects
                    .iter()
                    .filter(|((kind, _, obj_ns), _)| *kind == query.kind && *obj_ns == ns)
                    .map(|(_, doc)| doc.clone())
                    .collect();
                let list = json!({ "apiVersion": "v1", "kind": "List", "items": items });
                Ok(Self::render(&list, &query.kind, "*", &query.output_format))
            }
        }
    }

    async fn exec(&self, container: &ContainerRef, command: &[&str]) -> Result<Vec<u8>, QueryError> {
        let joined = command.join(" ");
        self.record(format!("exec {}/{} {}", container.namespace, container.pod, joined));
        if self.failing_exec.contains(&joined) || self.failing_pods.contains(&container.pod) {
            return Err(Self::failure(format!("exec {}", joined)));
        }
        Ok(format!("output of {}\n", joined).into_bytes())
    }

    async fn logs(&self, source: &LogSource) -> Result<Vec<u8>, QueryError> {
        self.record(format!("logs {}", source.describe()));
        if let LogSource::Container(c) = source {
            if self.failing_pods.contains(&c.pod) {
                return Err(Self::failure(format!("logs {}", c.pod)));
            }
        }
        Ok(b"log line\n".to_vec())
    }

    async fn issue_token(&self, namespace: &str, service_account: &str, _duration: &str) -> Result<String, QueryError> {
        self.record(format!("token {}/{}", namespace, service_account));
        if self.fail_token {
            return Err(Self::failure("create token".to_string()));
        }
        Ok("fake-token".to_string())
    }

    async fn proxy_get(&self, url: &str, _token: &str, _ca_bundle: &[u8]) -> Result<Vec<u8>, QueryError> {
        self.record(format!("proxy {}", url));
        if self.fail_proxy {
            return Err(QueryError::Http {
                url: url.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(br#"{"status":"success","data":{"groups":[]}}"#.to_vec())
    }
}
