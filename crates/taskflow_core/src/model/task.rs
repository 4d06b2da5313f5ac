//! Task entity.

use crate::model::entity::{Entity, EntityKind, Identified, Record};
use crate::model::id::Id;
use serde::{Deserialize, Serialize};

/// Unit of work tracked on a board.
///
/// Board membership and step assignment live on the `Board`, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
}

impl Task {
    /// Creates an unsaved task.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<Id>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

impl Identified for Task {
    fn kind(&self) -> EntityKind {
        EntityKind::Task
    }

    fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }
}

impl Record for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn set_id(&mut self, id: Id) {
        self.id = Some(id);
    }

    fn into_entity(self) -> Entity {
        Entity::Task(self)
    }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Task(task) => Some(task),
            _ => None,
        }
    }
}
