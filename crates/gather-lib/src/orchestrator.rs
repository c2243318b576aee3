//! Run orchestration
//!
//! Runs the stages in their fixed order:
//!
//! `Init → Olm → OperatorInfo → Instances → WorkloadDiagnostics →
//! MonitoringDiscovery → (Monitoring | SkipMonitoring) → Done`
//!
//! The only branch is on monitoring discovery. Stage failures are recorded
//! and never stop the sequence.

use crate::client::ClusterClient;
use crate::config::GatherConfig;
use crate::discovery;
use crate::error::SinkError;
use crate::gatherer::Gatherer;
use crate::layout;
use crate::models::CollectionTarget;
use crate::observability::{RunTally, Step};
use crate::sink::OutputSink;
use crate::stages;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Position in the run's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Olm,
    OperatorInfo,
    Instances,
    WorkloadDiagnostics,
    MonitoringDiscovery,
    Monitoring,
    SkipMonitoring,
    Done,
}

/// What a run did, written to `gather-summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub target: CollectionTarget,
    pub phases: Vec<Phase>,
    pub workload_namespace: Option<String>,
    pub monitoring_collected: bool,
    pub tally: RunTally,
}

/// Create the bundle root; the only I/O failure that aborts a run
pub async fn prepare_destination(target: &CollectionTarget) -> Result<(), SinkError> {
    tokio::fs::create_dir_all(&target.destination_dir)
        .await
        .map_err(|source| SinkError::Io {
            path: target.destination_dir.clone(),
            source,
        })
}

/// Drives one gather run
pub struct Orchestrator<'a> {
    target: CollectionTarget,
    config: GatherConfig,
    gatherer: Gatherer<'a>,
    phases: Vec<Phase>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(client: &'a dyn ClusterClient, target: CollectionTarget, config: GatherConfig) -> Self {
        let sink = OutputSink::new(&target.destination_dir);
        Self {
            target,
            config,
            gatherer: Gatherer::new(client, sink),
            phases: vec![Phase::Init],
        }
    }

    fn enter(&mut self, phase: Phase) {
        info!(event = "phase", phase = ?phase, "Entering phase");
        self.phases.push(phase);
    }

    /// Run every stage and return the report
    pub async fn run(mut self) -> RunReport {
        let started_at = Utc::now();
        info!(
            operator = %self.target.operator_name,
            namespace = %self.target.operator_namespace,
            destination = %self.target.destination_dir.display(),
            "Starting must-gather"
        );

        self.enter(Phase::Olm);
        stages::collect_olm_info(&mut self.gatherer, &self.target).await;

        self.enter(Phase::OperatorInfo);
        stages::collect_operator_info(&mut self.gatherer, &self.target).await;

        self.enter(Phase::Instances);
        let discovered = stages::collect_instances(&mut self.gatherer, &self.config).await;

        self.enter(Phase::WorkloadDiagnostics);
        stages::collect_workload(&mut self.gatherer, &discovered).await;

        self.enter(Phase::MonitoringDiscovery);
        let monitoring_collected =
            match discovery::monitoring_context(&mut self.gatherer, &self.config).await {
                Ok(ctx) => {
                    self.enter(Phase::Monitoring);
                    stages::collect_monitoring(&mut self.gatherer, &ctx, &self.config).await;
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Monitoring discovery failed, skipping monitoring stage");
                    self.gatherer
                        .note_skipped(Step::new("collect", "monitoring", layout::monitoring::DIR), e.to_string());
                    self.enter(Phase::SkipMonitoring);
                    false
                }
            };

        self.enter(Phase::Done);

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            target: self.target,
            phases: self.phases,
            workload_namespace: discovered.workload_namespace,
            monitoring_collected,
            tally: self.gatherer.into_tally(),
        };

        info!(
            written = report.tally.written,
            skipped = report.tally.skipped,
            failed = report.tally.failed,
            "Must-gather finished"
        );
        report
    }
}

impl RunReport {
    /// Save the report into the bundle
    pub async fn save(&self) -> Result<(), SinkError> {
        let sink = OutputSink::new(&self.target.destination_dir);
        let json = serde_json::to_vec_pretty(self).map_err(|e| SinkError::Io {
            path: self.target.destination_dir.join(layout::SUMMARY_FILE),
            source: e.into(),
        })?;
        sink.write(Path::new(layout::SUMMARY_FILE), &json).await?;
        Ok(())
    }
}
