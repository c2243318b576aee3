//! [`ClusterClient`] backed by the cluster CLI tool (`oc` / `kubectl`)

use super::{proxy, ClusterClient};
use crate::error::QueryError;
use crate::models::{ContainerRef, LogSource, ResourceQuery, Selection};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Stderr fragments `get` prints when an object or its type is absent
const NOT_FOUND_MARKERS: &[&str] = &[
    "Error from server (NotFound)",
    "doesn't have a resource type",
    "no matches for kind",
];

/// Object a `get` is about, for the `NotFound` error
struct Subject<'a> {
    kind: &'a str,
    name: String,
    namespace: Option<&'a str>,
}

/// Runs cluster queries by invoking the CLI tool once per call
#[derive(Debug, Clone)]
pub struct CliClient {
    binary: String,
    kubeconfig: Option<PathBuf>,
    env: Vec<(String, OsString)>,
}

impl CliClient {
    /// Create a client invoking `binary`
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            kubeconfig: None,
            env: Vec::new(),
        }
    }

    /// Pass `--kubeconfig` on every invocation
    pub fn with_kubeconfig(mut self, kubeconfig: Option<PathBuf>) -> Self {
        self.kubeconfig = kubeconfig;
        self
    }

    /// Set an environment variable for every child process
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Arguments for a `get`
    pub fn get_args(query: &ResourceQuery) -> Vec<String> {
        let mut args = vec!["get".to_string(), query.kind.clone()];
        match &query.selection {
            Selection::Named(name) => {
                args.push(name.clone());
                args.push("--ignore-not-found".to_string());
            }
            Selection::Labeled(selector) => {
                args.push("-l".to_string());
                args.push(selector.clone());
            }
            Selection::All => {}
        }
        if let Some(ns) = &query.namespace {
            args.push("-n".to_string());
            args.push(ns.clone());
        }
        if let Some(format) = query.output_format.as_flag() {
            args.push("-o".to_string());
            args.push(format);
        }
        args
    }

    /// Arguments for an `exec`
    pub fn exec_args(container: &ContainerRef, command: &[&str]) -> Vec<String> {
        let mut args = vec![
            "exec".to_string(),
            "-n".to_string(),
            container.namespace.clone(),
            container.pod.clone(),
            "-c".to_string(),
            container.container.clone(),
            "--".to_string(),
        ];
        args.extend(command.iter().map(|s| s.to_string()));
        args
    }

    /// Arguments for a `logs`
    pub fn logs_args(source: &LogSource) -> Vec<String> {
        match source {
            LogSource::Container(c) => vec![
                "logs".to_string(),
                "-n".to_string(),
                c.namespace.clone(),
                c.pod.clone(),
                "-c".to_string(),
                c.container.clone(),
            ],
            LogSource::Workload {
                namespace,
                reference,
            } => vec![
                "logs".to_string(),
                "-n".to_string(),
                namespace.clone(),
                reference.clone(),
                "--all-containers".to_string(),
            ],
        }
    }

    /// Full argv: global flags first, so nothing lands after an exec `--`
    pub fn command_args(&self, args: Vec<String>) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 1);
        if let Some(kubeconfig) = &self.kubeconfig {
            full.push(format!("--kubeconfig={}", kubeconfig.display()));
        }
        full.extend(args);
        full
    }

    fn command_line(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Run one invocation
    ///
    /// Only calls that pass `absent` can yield `NotFound`; everything else
    /// fails with the CLI's stderr kept.
    async fn run(&self, args: Vec<String>, absent: Option<Subject<'_>>) -> Result<Vec<u8>, QueryError> {
        let args = self.command_args(args);
        let command = self.command_line(&args);
        debug!(command = %command, "Running cluster command");

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let output = cmd.output().await.map_err(|source| QueryError::Spawn {
            command: command.clone(),
            source,
        })?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if let Some(subject) = absent.filter(|_| is_not_found(&stderr)) {
            return Err(QueryError::NotFound {
                kind: subject.kind.to_string(),
                name: subject.name,
                namespace: subject.namespace.map(str::to_string),
            });
        }

        warn!(command = %command, status = %output.status, "Cluster command failed");
        Err(QueryError::CommandFailed {
            command,
            status: output.status.to_string(),
            stderr,
        })
    }
}

/// Whether CLI stderr reports a missing object or resource type
pub(crate) fn is_not_found(stderr: &str) -> bool {
    NOT_FOUND_MARKERS.iter().any(|m| stderr.contains(m))
}

#[async_trait]
impl ClusterClient for CliClient {
    async fn get(&self, query: &ResourceQuery) -> Result<Vec<u8>, QueryError> {
        let subject = Subject {
            kind: &query.kind,
            name: query.target_name(),
            namespace: query.namespace.as_deref(),
        };
        let out = self.run(Self::get_args(query), Some(subject)).await?;

        // --ignore-not-found turns a missing named object into empty output
        let named = matches!(query.selection, Selection::Named(_));
        if named && out.iter().all(u8::is_ascii_whitespace) {
            return Err(QueryError::not_found(
                &query.kind,
                &query.target_name(),
                query.namespace.as_deref(),
            ));
        }
        Ok(out)
    }

    async fn exec(
        &self,
        container: &ContainerRef,
        command: &[&str],
    ) -> Result<Vec<u8>, QueryError> {
        self.run(Self::exec_args(container, command), None).await
    }

    async fn logs(&self, source: &LogSource) -> Result<Vec<u8>, QueryError> {
        self.run(Self::logs_args(source), None).await
    }

    async fn issue_token(
        &self,
        namespace: &str,
        service_account: &str,
        duration: &str,
    ) -> Result<String, QueryError> {
        let args = vec![
            "create".to_string(),
            "token".to_string(),
            service_account.to_string(),
            "-n".to_string(),
            namespace.to_string(),
            format!("--duration={}", duration),
        ];
        let out = self.run(args, None).await?;
        let token = String::from_utf8(out)
            .map_err(|e| QueryError::decode("token", e))?
            .trim()
            .to_string();
        if token.is_empty() {
            return Err(QueryError::decode("token", "empty token issued"));
        }
        Ok(token)
    }

    async fn proxy_get(
        &self,
        url: &str,
        token: &str,
        ca_bundle: &[u8],
    ) -> Result<Vec<u8>, QueryError> {
        proxy::fetch(url, token, Some(ca_bundle)).await
    }
}
