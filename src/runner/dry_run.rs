use async_trait::async_trait;
use tracing::info;

use super::StepRunner;
use crate::domain::Phase;
use crate::error::PhaseError;

/// Validates each phase and reports what would happen, touching nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

#[async_trait]
impl StepRunner for DryRunRunner {
    async fn execute(&self, phase: &Phase) -> Result<String, PhaseError> {
        phase.validate()?;
        let description = phase.describe();
        info!(phase = phase.name(), action = %phase.action(), "[dry-run] {description}");
        Ok(format!("dry-run: {description}"))
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
