//! Flow step entity.

use crate::model::entity::{Entity, EntityKind, Identified, Record};
use crate::model::id::Id;
use serde::{Deserialize, Serialize};

/// One stage of a flow that tasks on a board can be assigned to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
}

impl FlowStep {
    /// Creates an unsaved flow step.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<Id>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

impl Identified for FlowStep {
    fn kind(&self) -> EntityKind {
        EntityKind::FlowStep
    }

    fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }
}

impl Record for FlowStep {
    const KIND: EntityKind = EntityKind::FlowStep;

    fn set_id(&mut self, id: Id) {
        self.id = Some(id);
    }

    fn into_entity(self) -> Entity {
        Entity::FlowStep(self)
    }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::FlowStep(step) => Some(step),
            _ => None,
        }
    }
}
