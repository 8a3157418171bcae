//! Scaffold progress log
//!
//! One record per finished phase, kept in memory for the caller and mirrored to
//! `tracing` on the `scaffold_progress` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOutcome {
    Succeeded,
    Partial,
    Failed,
}

impl fmt::Display for PhaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Succeeded => "ok",
            Self::Partial => "partial",
            Self::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub slug: String,
    pub phase: String,
    pub outcome: PhaseOutcome,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Human-readable line, e.g. `[demo] initializing: ok (created plugins/demo)`.
    pub fn line(&self) -> String {
        if self.message.is_empty() {
            format!("[{}] {}: {}", self.slug, self.phase, self.outcome)
        } else {
            format!("[{}] {}: {} ({})", self.slug, self.phase, self.outcome, self.message)
        }
    }
}

/// Progress records of one pipeline run.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    run_id: String,
    events: Vec<ProgressEvent>,
}

impl ProgressLog {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            events: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn record(
        &mut self,
        slug: &str,
        phase: &str,
        outcome: PhaseOutcome,
        message: impl Into<String>,
    ) -> &ProgressEvent {
        let event = ProgressEvent {
            slug: slug.to_string(),
            phase: phase.to_string(),
            outcome,
            message: message.into(),
            timestamp: Utc::now(),
        };
        match outcome {
            PhaseOutcome::Succeeded => {
                info!(target: "scaffold_progress", run = %self.run_id, "{}", event.line())
            }
            PhaseOutcome::Partial | PhaseOutcome::Failed => {
                warn!(target: "scaffold_progress", run = %self.run_id, "{}", event.line())
            }
        }
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(ProgressEvent::line).collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "runId": self.run_id, "events": self.events })
    }
}
