//! PhaseResult: the audit record for one executed phase.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::PhaseError;

/// Outcome of one phase. Created once per executed phase and appended to
/// the orchestrator's execution log.
#[derive(Debug, Clone)]
pub struct PhaseResult {
    phase: String,
    success: bool,
    output: String,
    error: Option<PhaseError>,
    started_at: DateTime<Utc>,
    duration: Duration,
}

impl PhaseResult {
    pub fn succeeded(phase: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            success: true,
            output: output.into(),
            error: None,
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }

    pub fn failed(phase: impl Into<String>, error: PhaseError) -> Self {
        Self {
            phase: phase.into(),
            success: false,
            output: String::new(),
            error: Some(error),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }

    /// Keep observed output on a failed result.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    #[must_use]
    pub fn timed(mut self, started_at: DateTime<Utc>, duration: Duration) -> Self {
        self.started_at = started_at;
        self.duration = duration;
        self
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn error(&self) -> Option<&PhaseError> {
        self.error.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Serializable snapshot for JSON output.
    #[must_use]
    pub fn summary(&self) -> PhaseSummary {
        PhaseSummary {
            phase: self.phase.clone(),
            success: self.success,
            output: self.output.clone(),
            error_kind: self.error.as_ref().map(PhaseError::kind),
            error: self.error.as_ref().map(ToString::to_string),
            started_at: self.started_at,
            duration_ms: u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// JSON shape of a [`PhaseResult`].
#[derive(Debug, Clone, Serialize)]
pub struct PhaseSummary {
    pub phase: String,
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_carries_error_and_no_success() {
        let result = PhaseResult::failed("verify/https", PhaseError::Cancelled);
        assert!(!result.success());
        assert_eq!(result.error(), Some(&PhaseError::Cancelled));

        let summary = result.summary();
        assert_eq!(summary.error_kind, Some("cancelled"));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["phase"], "verify/https");
        assert_eq!(json["success"], false);
    }

    #[test]
    fn success_summary_omits_error_fields() {
        let json = serde_json::to_value(PhaseResult::succeeded("p", "ok").summary()).unwrap();
        assert!(json.get("error").is_none());
        assert!(json.get("error_kind").is_none());
        assert_eq!(json["output"], "ok");
    }
}
