//! # Analysis Observability Module
//!
//! Structured events for analysis runs and manifest updates.
//!
//! ## Event Flow
//!
//! ```text
//! migration-guard → tracing (target "migration_guard::events") → log pipeline
//! ```
//!
//! Each event is one JSON document prefixed with `MIGRATION_GUARD_EVENT:` so
//! log collectors can pick them out of ordinary log lines.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::domain::{MigrationReport, MergeOutcome, ReportSummary};

/// Event prefix for log collectors to identify structured events
pub const EVENT_PREFIX: &str = "MIGRATION_GUARD_EVENT:";

/// Tracing target carrying structured events
pub const EVENT_TARGET: &str = "migration_guard::events";

/// Event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum GuardEvent {
    /// Analysis finished and produced a report
    AnalysisCompleted(AnalysisCompletedEvent),
    /// Manifest was persisted
    ManifestUpdated(ManifestUpdatedEvent),
}

/// Common fields for all events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Timestamp in RFC3339 format
    pub timestamp: String,
    /// Generation target (manifest owner)
    pub target: String,
    /// Microservice name
    pub microservice: String,
}

impl EventMetadata {
    pub fn new(target: impl Into<String>, microservice: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            target: target.into(),
            microservice: microservice.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisCompletedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub is_first_generation: bool,
    pub has_dangerous_changes: bool,
    pub has_fixable_changes: bool,
    pub has_non_safe_issues: bool,
    pub summary: ReportSummary,
    pub duration_secs: f64,
}

impl AnalysisCompletedEvent {
    pub fn from_report(metadata: EventMetadata, report: &MigrationReport, duration_secs: f64) -> Self {
        Self {
            metadata,
            is_first_generation: report.is_first_generation,
            has_dangerous_changes: report.has_dangerous_changes,
            has_fixable_changes: report.has_fixable_changes,
            has_non_safe_issues: report.has_non_safe_issues,
            summary: report.summary,
            duration_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestUpdatedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub revision: u64,
    pub models_inserted: usize,
    pub models_replaced: usize,
    pub models_unchanged: usize,
    pub fixes_appended: usize,
    pub duration_secs: f64,
}

impl ManifestUpdatedEvent {
    pub fn from_outcome(
        metadata: EventMetadata,
        revision: u64,
        outcome: &MergeOutcome,
        duration_secs: f64,
    ) -> Self {
        Self {
            metadata,
            revision,
            models_inserted: outcome.inserted.len(),
            models_replaced: outcome.replaced.len(),
            models_unchanged: outcome.unchanged.len(),
            fixes_appended: outcome.fixes_appended,
            duration_secs,
        }
    }
}

/// Serialize an event into its prefixed log line
pub fn format_event(event: &GuardEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(json) => Some(format!("{}{}", EVENT_PREFIX, json)),
        Err(e) => {
            tracing::error!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// Emits a structured event through tracing
pub fn emit_event(event: GuardEvent) {
    if let Some(line) = format_event(&event) {
        tracing::info!(target: EVENT_TARGET, "{}", line);
    }
}

/// Helper to track step timing
pub struct StepTimer {
    start: Instant,
}

impl StepTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MigrationReport;

    #[test]
    fn test_event_serialization() {
        let metadata = EventMetadata::new("/srv/hr", "hr");
        let event = GuardEvent::AnalysisCompleted(AnalysisCompletedEvent::from_report(
            metadata,
            &MigrationReport::first_generation(),
            0.25,
        ));

        let line = format_event(&event).unwrap();
        assert!(line.starts_with(EVENT_PREFIX));
        let json: serde_json::Value =
            serde_json::from_str(line.trim_start_matches(EVENT_PREFIX)).unwrap();
        assert_eq!(json["event_type"], "AnalysisCompleted");
        assert_eq!(json["microservice"], "hr");
        assert_eq!(json["is_first_generation"], true);
        assert_eq!(json["summary"]["total"], 0);
    }

    #[test]
    fn test_manifest_updated_counts() {
        let outcome = MergeOutcome {
            inserted: vec!["Department".into()],
            replaced: vec!["Employee".into()],
            unchanged: vec![],
            fixes_appended: 2,
        };
        let event = ManifestUpdatedEvent::from_outcome(EventMetadata::new("t", "hr"), 3, &outcome, 0.1);
        assert_eq!(event.models_inserted, 1);
        assert_eq!(event.models_replaced, 1);
        assert_eq!(event.fixes_appended, 2);
        assert_eq!(event.revision, 3);
    }

    #[test]
    fn test_step_timer() {
        let timer = StepTimer::start();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_secs() >= 0.01);
    }
}
