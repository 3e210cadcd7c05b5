//! Deployment domain types: phases, plans, results, run state.

mod phase;
mod plan;
mod result;
mod state;

pub use phase::{Phase, PhaseAction};
pub use plan::DeploymentPlan;
pub use result::{PhaseResult, PhaseSummary};
pub use state::RunState;
