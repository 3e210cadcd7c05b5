//! DeploymentPlan: an ordered, validated list of phases.

use std::collections::HashSet;

use super::phase::Phase;
use crate::error::PlanError;

/// Phases in execution order. The order is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    phases: Vec<Phase>,
}

impl DeploymentPlan {
    /// Build a plan, rejecting empty plans, duplicate names and phases with
    /// malformed parameters.
    pub fn new(phases: Vec<Phase>) -> Result<Self, PlanError> {
        if phases.is_empty() {
            return Err(PlanError::Empty);
        }

        let mut names = HashSet::new();
        for phase in &phases {
            if !names.insert(phase.name()) {
                return Err(PlanError::DuplicatePhase(phase.name().to_string()));
            }
            phase.validate().map_err(|e| PlanError::InvalidPhase {
                phase: phase.name().to_string(),
                reason: e.to_string(),
            })?;
        }

        Ok(Self { phases })
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Phase> {
        self.phases.iter()
    }
}

impl<'a> IntoIterator for &'a DeploymentPlan {
    type Item = &'a Phase;
    type IntoIter = std::slice::Iter<'a, Phase>;

    fn into_iter(self) -> Self::IntoIter {
        self.phases.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_declared_order() {
        let plan = DeploymentPlan::new(vec![
            Phase::run_command("b", "true", &["x"]),
            Phase::run_command("a", "true", &["y"]),
        ])
        .unwrap();
        let names: Vec<_> = plan.iter().map(Phase::name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn rejects_empty_plan() {
        assert_eq!(DeploymentPlan::new(Vec::new()), Err(PlanError::Empty));
    }

    #[test]
    fn rejects_duplicate_names() {
        let result = DeploymentPlan::new(vec![
            Phase::reload_service("reload", "systemctl", "nginx"),
            Phase::reload_service("reload", "systemctl", "nginx"),
        ]);
        assert_eq!(result, Err(PlanError::DuplicatePhase("reload".into())));
    }

    #[test]
    fn rejects_invalid_phase_parameters() {
        let broken = Phase::reload_service("reload", "systemctl", "");
        assert!(matches!(
            DeploymentPlan::new(vec![broken]),
            Err(PlanError::InvalidPhase { .. })
        ));
    }
}
