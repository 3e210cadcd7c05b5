//! Sequential, fail-fast execution of a [`DeploymentPlan`].
//!
//! The orchestrator owns the execution log and the run state. Phases run one
//! at a time in declared order; the first failure ends the run as
//! [`RunState::Failed`] and no later phase is started. Nothing is rolled
//! back. Cancellation is coarse: it is checked before each phase, never in
//! the middle of one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{DeploymentPlan, PhaseResult, RunState};
use crate::error::{Error, PhaseError, Result};
use crate::runner::StepRunner;

/// Requests that a run stop before its next phase.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final state and ordered execution log of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    run_id: Uuid,
    state: RunState,
    log: Vec<PhaseResult>,
}

impl RunReport {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn log(&self) -> &[PhaseResult] {
        &self.log
    }

    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }

    /// The result that ended a failed run.
    pub fn failed_phase(&self) -> Option<&PhaseResult> {
        self.log.last().filter(|result| !result.success())
    }

    /// `Ok` for a successful run, otherwise the failing phase as an error.
    #[allow(clippy::result_large_err)]
    pub fn into_result(self) -> Result<Self> {
        match self.failed_phase() {
            None => Ok(self),
            Some(failed) => Err(Error::Deployment {
                phase: failed.phase().to_string(),
                source: failed.error().cloned().unwrap_or(PhaseError::Cancelled),
            }),
        }
    }
}

/// Drives a plan through a [`StepRunner`].
///
/// One orchestrator executes one plan: [`Orchestrator::run`] consumes it.
pub struct Orchestrator<R> {
    runner: R,
    run_id: Uuid,
    state: RunState,
    log: Vec<PhaseResult>,
    cancel: CancelHandle,
}

impl<R: StepRunner> Orchestrator<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            run_id: Uuid::new_v4(),
            state: RunState::Pending,
            log: Vec::new(),
            cancel: CancelHandle::default(),
        }
    }

    /// Handle that can stop the run between phases.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute every phase of `plan` in order, stopping at the first failure.
    pub async fn run(mut self, plan: &DeploymentPlan) -> RunReport {
        self.transition(RunState::Running);
        info!(
            run_id = %self.run_id,
            runner = self.runner.name(),
            phases = plan.len(),
            "Deployment started"
        );

        for (index, phase) in plan.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(run_id = %self.run_id, phase = phase.name(), "Cancelled before phase");
                self.log
                    .push(PhaseResult::failed(phase.name(), PhaseError::Cancelled));
                self.transition(RunState::Failed);
                break;
            }

            info!(
                run_id = %self.run_id,
                phase = phase.name(),
                action = %phase.action(),
                step = index + 1,
                of = plan.len(),
                "Phase started"
            );

            let started_at = Utc::now();
            let clock = Instant::now();
            let outcome = self.runner.execute(phase).await;
            let elapsed = clock.elapsed();

            let result = match outcome {
                Ok(output) => {
                    info!(
                        run_id = %self.run_id,
                        phase = phase.name(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Phase succeeded"
                    );
                    PhaseResult::succeeded(phase.name(), output)
                }
                Err(err) => {
                    error!(
                        run_id = %self.run_id,
                        phase = phase.name(),
                        kind = err.kind(),
                        error = %err,
                        "Phase failed"
                    );
                    PhaseResult::failed(phase.name(), err)
                }
            }
            .timed(started_at, elapsed);

            let success = result.success();
            self.log.push(result);

            if success {
                self.transition(RunState::Running);
            } else {
                self.transition(RunState::Failed);
                break;
            }
        }

        if self.state == RunState::Running {
            self.transition(RunState::Succeeded);
        }

        info!(
            run_id = %self.run_id,
            state = %self.state,
            executed = self.log.len(),
            "Deployment finished"
        );

        RunReport {
            run_id: self.run_id,
            state: self.state,
            log: self.log,
        }
    }

    fn transition(&mut self, next: RunState) {
        if self.state.can_transition_to(next) {
            self.state = next;
        } else {
            error!(from = %self.state, to = %next, "Ignoring illegal state transition");
        }
    }
}
