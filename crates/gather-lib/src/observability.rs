//! Run-level bookkeeping for a gather run
//!
//! Provides:
//! - A tally of written/skipped/failed collection calls
//! - Structured logging of every call outcome with tracing

use crate::models::CollectionResult;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One collection call, described well enough to diagnose it afterwards
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    /// get / exec / logs / token / proxy / write
    pub action: &'static str,
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Step {
    pub fn new(action: &'static str, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            action,
            kind: kind.into(),
            name: name.into(),
            namespace: None,
        }
    }

    pub fn in_namespace(mut self, namespace: Option<&str>) -> Self {
        self.namespace = namespace.map(str::to_string);
        self
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.action, self.kind, self.name)?;
        if let Some(ns) = &self.namespace {
            write!(f, " -n {}", ns)?;
        }
        Ok(())
    }
}

/// A call that did not produce output
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub outcome: CollectionResult,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// Counts of call outcomes for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTally {
    pub written: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Skipped and failed calls, in order
    pub records: Vec<StepRecord>,
}

impl RunTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful call
    pub fn record_written(&mut self, step: &Step, output: &Path) {
        self.written += 1;
        info!(
            event = "step_written",
            action = step.action,
            kind = %step.kind,
            name = %step.name,
            namespace = step.namespace.as_deref().unwrap_or(""),
            path = %output.display(),
            "Collected {}",
            step
        );
    }

    /// Record an absent resource
    pub fn record_skipped(&mut self, step: Step, reason: impl Into<String>, output: Option<PathBuf>) {
        let reason = reason.into();
        self.skipped += 1;
        warn!(
            event = "step_skipped",
            action = step.action,
            kind = %step.kind,
            name = %step.name,
            namespace = step.namespace.as_deref().unwrap_or(""),
            reason = %reason,
            "Skipped {}",
            step
        );
        self.records.push(StepRecord {
            step,
            outcome: CollectionResult::Skipped,
            reason,
            output,
        });
    }

    /// Record a query or write failure
    pub fn record_failed(&mut self, step: Step, reason: impl Into<String>, output: Option<PathBuf>) {
        let reason = reason.into();
        self.failed += 1;
        warn!(
            event = "step_failed",
            action = step.action,
            kind = %step.kind,
            name = %step.name,
            namespace = step.namespace.as_deref().unwrap_or(""),
            reason = %reason,
            "Failed to {}",
            step
        );
        self.records.push(StepRecord {
            step,
            outcome: CollectionResult::Failed,
            reason,
            output,
        });
    }

    /// Total calls recorded
    pub fn total(&self) -> u64 {
        self.written + self.skipped + self.failed
    }

    /// Whether every call produced output
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.failed == 0
    }
}
