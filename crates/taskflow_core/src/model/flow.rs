//! Flow entity.
//!
//! # Invariants
//! - Every key in `steps` equals the id of its step.
//! - `default_step_id`, when set, is the step assigned to tasks newly added to
//!   a board governed by this flow.

use crate::model::collection::{self, EntityCollection};
use crate::model::entity::{Entity, EntityKind, Identified, Patch, Record};
use crate::model::flow_step::FlowStep;
use crate::model::id::Id;
use serde::{Deserialize, Serialize};

/// Ordered-by-id set of steps a task can move through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(default, with = "collection::values")]
    pub steps: EntityCollection<FlowStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_step_id: Option<Id>,
}

impl Flow {
    /// Creates an unsaved flow with no steps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an unsaved flow from creation props.
    pub fn from_props(props: FlowProps) -> Self {
        Self {
            id: None,
            steps: props.steps,
            default_step_id: props.default_step_id,
        }
    }
}

/// Creation props for a flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowProps {
    pub steps: EntityCollection<FlowStep>,
    pub default_step_id: Option<Id>,
}

/// Update props for a flow; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowUpdate {
    pub steps: Option<EntityCollection<FlowStep>>,
    /// `Some(None)` clears the default step.
    pub default_step_id: Option<Option<Id>>,
}

impl Patch<Flow> for FlowUpdate {
    fn apply_to(self, target: &mut Flow) {
        if let Some(steps) = self.steps {
            target.steps = steps;
        }
        if let Some(default_step_id) = self.default_step_id {
            target.default_step_id = default_step_id;
        }
    }
}

impl Identified for Flow {
    fn kind(&self) -> EntityKind {
        EntityKind::Flow
    }

    fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }
}

impl Record for Flow {
    const KIND: EntityKind = EntityKind::Flow;

    fn set_id(&mut self, id: Id) {
        self.id = Some(id);
    }

    fn into_entity(self) -> Entity {
        Entity::Flow(self)
    }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Flow(flow) => Some(flow),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Flow, FlowUpdate};
    use crate::model::entity::Patch;
    use crate::model::id::Id;

    #[test]
    fn update_can_clear_default_step() {
        let mut flow = Flow {
            default_step_id: Some(Id::from("todo")),
            ..Flow::new()
        };
        FlowUpdate::default().apply_to(&mut flow);
        assert_eq!(flow.default_step_id, Some(Id::from("todo")));

        FlowUpdate {
            default_step_id: Some(None),
            ..FlowUpdate::default()
        }
        .apply_to(&mut flow);
        assert!(flow.default_step_id.is_none());
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut flow = Flow::new();
        let before = flow.clone();
        ().apply_to(&mut flow);
        assert_eq!(flow, before);
    }
}
