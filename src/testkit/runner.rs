//! Step runners that record calls instead of touching the system.
//!
//! - [`RecordingRunner`] - succeeds on every phase and records call order.
//!   Best for: ordering and idempotence checks.
//!
//! - [`ScriptedRunner`] - fails chosen phases with a given error.
//!   Best for: fail-fast behavior and error reporting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::Phase;
use crate::error::PhaseError;
use crate::runner::StepRunner;

/// Shared, ordered list of executed phase names.
pub type CallLog = Arc<Mutex<Vec<String>>>;

fn record(calls: &CallLog, phase: &Phase) {
    if let Ok(mut calls) = calls.lock() {
        calls.push(phase.name().to_string());
    }
}

/// Succeeds on every phase and records the order of calls.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    calls: CallLog,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the call log; stays valid after the runner is moved.
    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl StepRunner for RecordingRunner {
    async fn execute(&self, phase: &Phase) -> Result<String, PhaseError> {
        record(&self.calls, phase);
        Ok(format!("ok: {}", phase.describe()))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Fails the phases it is told to fail, succeeds on the rest.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    failures: HashMap<String, PhaseError>,
    calls: CallLog,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the phase named `phase` fail with `error`.
    #[must_use]
    pub fn fail_on(mut self, phase: &str, error: PhaseError) -> Self {
        self.failures.insert(phase.to_string(), error);
        self
    }

    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl StepRunner for ScriptedRunner {
    async fn execute(&self, phase: &Phase) -> Result<String, PhaseError> {
        record(&self.calls, phase);
        match self.failures.get(phase.name()) {
            Some(error) => Err(error.clone()),
            None => Ok("ok".to_string()),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
