//! Pairs the cluster client with the bundle sink
//!
//! Each method performs one cluster call, writes its output into the
//! bundle and records the outcome. Nothing here returns an error: failures
//! are logged and tallied at the call boundary so stages never unwind.

use crate::client::ClusterClient;
use crate::error::QueryError;
use crate::models::{CollectionResult, ContainerRef, LogSource, ResourceQuery};
use crate::observability::{RunTally, Step};
use crate::sink::OutputSink;
use std::path::Path;

/// Collection calls with failure isolation
pub struct Gatherer<'a> {
    client: &'a dyn ClusterClient,
    sink: OutputSink,
    tally: RunTally,
}

impl<'a> Gatherer<'a> {
    pub fn new(client: &'a dyn ClusterClient, sink: OutputSink) -> Self {
        Self {
            client,
            sink,
            tally: RunTally::new(),
        }
    }

    pub fn client(&self) -> &'a dyn ClusterClient {
        self.client
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    pub fn tally(&self) -> &RunTally {
        &self.tally
    }

    pub fn into_tally(self) -> RunTally {
        self.tally
    }

    /// `get` into `query.output_path`
    pub async fn get(&mut self, query: &ResourceQuery) -> CollectionResult {
        let step = query_step(query);
        let result = self.client.get(query).await;
        self.finish(step, result, &query.output_path, false).await
    }

    /// `get` appended to `query.output_path`
    pub async fn append_get(&mut self, query: &ResourceQuery) -> CollectionResult {
        let step = query_step(query);
        let result = self.client.get(query).await;
        self.finish(step, result, &query.output_path, true).await
    }

    /// Run `command` in a container and save its stdout
    pub async fn exec(
        &mut self,
        container: &ContainerRef,
        command: &[&str],
        output: &Path,
    ) -> CollectionResult {
        let step = Step::new("exec", command.join(" "), &container.pod)
            .in_namespace(Some(container.namespace.as_str()));
        let result = self.client.exec(container, command).await;
        self.finish(step, result, output, false).await
    }

    /// Save container logs
    pub async fn logs(&mut self, source: &LogSource, output: &Path) -> CollectionResult {
        let step = Step::new("logs", "pod", source.describe());
        let result = self.client.logs(source).await;
        self.finish(step, result, output, false).await
    }

    /// Save the body of an authenticated route GET
    pub async fn proxy_get(
        &mut self,
        url: &str,
        token: &str,
        ca_bundle: &[u8],
        output: &Path,
    ) -> CollectionResult {
        let step = Step::new("proxy", "url", url);
        let result = self.client.proxy_get(url, token, ca_bundle).await;
        self.finish(step, result, output, false).await
    }

    /// Save already-fetched content
    pub async fn write(&mut self, step: Step, output: &Path, content: &[u8]) -> CollectionResult {
        self.finish(step, Ok(content.to_vec()), output, false).await
    }

    /// Record a call that was never attempted because a prerequisite is missing
    pub fn note_skipped(&mut self, step: Step, reason: impl Into<String>) {
        self.tally.record_skipped(step, reason, None);
    }

    /// Record a failure that happened outside a collection call
    pub fn note_failed(&mut self, step: Step, reason: impl Into<String>) {
        self.tally.record_failed(step, reason, None);
    }

    async fn finish(
        &mut self,
        step: Step,
        result: Result<Vec<u8>, QueryError>,
        output: &Path,
        append: bool,
    ) -> CollectionResult {
        let content = match result {
            Ok(content) => content,
            Err(e) if e.is_not_found() => {
                self.tally
                    .record_skipped(step, e.to_string(), Some(output.to_path_buf()));
                return CollectionResult::Skipped;
            }
            Err(e) => {
                self.tally
                    .record_failed(step, e.to_string(), Some(output.to_path_buf()));
                return CollectionResult::Failed;
            }
        };

        let written = if append {
            self.sink.append(output, &content).await
        } else {
            self.sink.write(output, &content).await
        };

        match written {
            Ok(path) => {
                self.tally.record_written(&step, &path);
                CollectionResult::Written
            }
            Err(e) => {
                self.tally
                    .record_failed(step, e.to_string(), Some(output.to_path_buf()));
                CollectionResult::Failed
            }
        }
    }
}

fn query_step(query: &ResourceQuery) -> Step {
    Step::new("get", &query.kind, query.target_name()).in_namespace(query.namespace.as_deref())
}
