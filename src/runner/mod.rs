//! Step runners: execute one [`Phase`] and report its observed output.
//!
//! [`SystemRunner`] performs the real side effects; [`DryRunRunner`] only
//! validates and logs. Both are selected behind the [`StepRunner`] trait so
//! the orchestrator never knows which one it drives.

pub mod command;
mod dry_run;
mod system;

use async_trait::async_trait;

use crate::domain::Phase;
use crate::error::PhaseError;

pub use dry_run::DryRunRunner;
pub use system::{certificate_args, SystemRunner};

/// Executes a single deployment phase.
///
/// Implementations must be idempotent: running the same phase twice leaves
/// the same end state as running it once.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Perform the phase's side effect, returning observed output.
    async fn execute(&self, phase: &Phase) -> Result<String, PhaseError>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<R: StepRunner + ?Sized> StepRunner for Box<R> {
    async fn execute(&self, phase: &Phase) -> Result<String, PhaseError> {
        (**self).execute(phase).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
