//! The validated stage sequence consumed by the orchestrator.

use crate::core::{StageDefinition, StageRole};
use crate::errors::TopologyError;

/// The four mandatory stages in order, plus an optional quality stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainPlan {
    stages: Vec<StageDefinition>,
    quality: Option<StageDefinition>,
}

impl ChainPlan {
    /// Builds a plan from configured stage definitions.
    ///
    /// The definitions must list `ideas`, `outline`, `draft` and `final`
    /// exactly once and in that order, optionally followed by one `quality`
    /// stage. The quality stage is dropped when `quality_check` is false.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError`] if the definitions describe any other
    /// sequence.
    pub fn from_definitions(
        definitions: &[StageDefinition],
        quality_check: bool,
    ) -> Result<Self, TopologyError> {
        let roles: Vec<StageRole> = definitions.iter().map(|d| d.role).collect();

        let (mandatory, rest) = definitions.split_at(definitions.len().min(StageRole::MANDATORY.len()));
        let mandatory_roles: Vec<StageRole> = mandatory.iter().map(|d| d.role).collect();
        if mandatory_roles != StageRole::MANDATORY {
            return Err(TopologyError::new(
                "stages must be ideas, outline, draft and final in that order",
            )
            .with_stages(roles));
        }

        let quality = match rest {
            [] => None,
            [stage] if stage.role.is_quality() => Some(stage.clone()),
            _ => {
                return Err(TopologyError::new(
                    "only a single quality stage may follow the final stage",
                )
                .with_stages(roles));
            }
        };

        for definition in definitions {
            if definition.model.trim().is_empty() {
                return Err(TopologyError::new(format!(
                    "stage '{}' has no model",
                    definition.role
                ))
                .with_stages(vec![definition.role]));
            }
        }

        Ok(Self {
            stages: mandatory.to_vec(),
            quality: quality.filter(|_| quality_check),
        })
    }

    /// Returns the mandatory stages in execution order.
    #[must_use]
    pub fn mandatory(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Returns the quality stage, if enabled.
    #[must_use]
    pub fn quality(&self) -> Option<&StageDefinition> {
        self.quality.as_ref()
    }

    /// Iterates every stage that will run, in order.
    pub fn iter(&self) -> impl Iterator<Item = &StageDefinition> {
        self.stages.iter().chain(self.quality.iter())
    }

    /// Returns the definition for a role.
    #[must_use]
    pub fn stage(&self, role: StageRole) -> Option<&StageDefinition> {
        self.iter().find(|d| d.role == role)
    }

    /// Returns the number of stages that will run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len() + usize::from(self.quality.is_some())
    }

    /// Always false; a valid plan has at least the mandatory stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_stages;

    #[test]
    fn test_default_plan() {
        let plan = ChainPlan::from_definitions(&default_stages(), true).unwrap();
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.mandatory().len(), 4);
        assert_eq!(plan.quality().unwrap().role, StageRole::Quality);
    }

    #[test]
    fn test_quality_disabled() {
        let plan = ChainPlan::from_definitions(&default_stages(), false).unwrap();
        assert_eq!(plan.len(), 4);
        assert!(plan.quality().is_none());
        assert!(plan.stage(StageRole::Quality).is_none());
    }

    #[test]
    fn test_plan_without_quality_definition() {
        let stages = &default_stages()[..4];
        let plan = ChainPlan::from_definitions(stages, true).unwrap();
        assert!(plan.quality().is_none());
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut stages = default_stages();
        stages.swap(1, 2);

        let err = ChainPlan::from_definitions(&stages, true).unwrap_err();
        assert!(err.message.contains("in that order"));
        assert_eq!(err.stages[1], StageRole::Draft);
    }

    #[test]
    fn test_missing_stage_rejected() {
        let stages: Vec<_> = default_stages()
            .into_iter()
            .filter(|s| s.role != StageRole::Draft)
            .collect();
        assert!(ChainPlan::from_definitions(&stages, true).is_err());
    }

    #[test]
    fn test_trailing_non_quality_rejected() {
        let mut stages = default_stages();
        stages.push(stages[0].clone());
        assert!(ChainPlan::from_definitions(&stages, true).is_err());
    }

    #[test]
    fn test_blank_model_rejected() {
        let mut stages = default_stages();
        stages[2].model = "  ".to_string();

        let err = ChainPlan::from_definitions(&stages, true).unwrap_err();
        assert_eq!(err.stages, vec![StageRole::Draft]);
    }
}
