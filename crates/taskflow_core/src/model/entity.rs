//! Entity kinds and the shared entity contract.
//!
//! # Responsibility
//! - Tag every entity with its `EntityKind`.
//! - Provide the dynamic `Entity` envelope exchanged with sources.
//! - Provide `EntityRef` for APIs accepting either an id or an entity.
//!
//! # Invariants
//! - An entity is saved iff it carries an id.
//! - `Record::from_entity` returns `None` when the envelope holds another kind.

use crate::model::board::Board;
use crate::model::flow::Flow;
use crate::model::flow_step::FlowStep;
use crate::model::id::Id;
use crate::model::task::Task;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Discriminant for the four entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Task,
    Board,
    FlowStep,
    Flow,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::Board => "Board",
            Self::FlowStep => "FlowStep",
            Self::Flow => "Flow",
        }
    }

    /// All kinds, in storage order.
    pub fn all() -> [EntityKind; 4] {
        [Self::Task, Self::FlowStep, Self::Flow, Self::Board]
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything tagged with a kind and an optional id.
pub trait Identified {
    fn kind(&self) -> EntityKind;
    fn id(&self) -> Option<&Id>;

    fn is_saved(&self) -> bool {
        self.id().is_some()
    }
}

/// Concrete entity type with a fixed kind.
///
/// Implemented by `Task`, `FlowStep`, `Flow` and `Board`.
pub trait Record: Identified + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn set_id(&mut self, id: Id);
    fn into_entity(self) -> Entity;
    fn from_entity(entity: Entity) -> Option<Self>;
}

/// Partial update merged into an entity by the `update` operators.
///
/// `()` is the empty update, valid for every entity type.
pub trait Patch<T> {
    fn apply_to(self, target: &mut T);
}

impl<T> Patch<T> for () {
    fn apply_to(self, _target: &mut T) {}
}

/// Kind-tagged envelope used at the source boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Entity {
    Task(Task),
    Board(Board),
    FlowStep(FlowStep),
    Flow(Flow),
}

impl Entity {
    /// Builds a bare, unsaved entity of `kind`.
    ///
    /// A bare board governs an empty unsaved flow.
    pub fn bare(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Task => Self::Task(Task::new()),
            EntityKind::FlowStep => Self::FlowStep(FlowStep::new()),
            EntityKind::Flow => Self::Flow(Flow::new()),
            EntityKind::Board => Self::Board(Board::new(Flow::new())),
        }
    }

    pub fn set_id(&mut self, id: Id) {
        match self {
            Self::Task(task) => task.set_id(id),
            Self::Board(board) => board.set_id(id),
            Self::FlowStep(step) => step.set_id(id),
            Self::Flow(flow) => flow.set_id(id),
        }
    }

    /// Unwraps the envelope into a concrete record of kind `T::KIND`.
    pub fn into_record<T: Record>(self) -> Option<T> {
        T::from_entity(self)
    }
}

impl Identified for Entity {
    fn kind(&self) -> EntityKind {
        match self {
            Self::Task(_) => EntityKind::Task,
            Self::Board(_) => EntityKind::Board,
            Self::FlowStep(_) => EntityKind::FlowStep,
            Self::Flow(_) => EntityKind::Flow,
        }
    }

    fn id(&self) -> Option<&Id> {
        match self {
            Self::Task(task) => task.id(),
            Self::Board(board) => board.id(),
            Self::FlowStep(step) => step.id(),
            Self::Flow(flow) => flow.id(),
        }
    }
}

/// Either a literal id or a borrowed entity.
#[derive(Debug)]
pub enum EntityRef<'a, T> {
    Id(Id),
    Entity(&'a T),
}

impl<T> Clone for EntityRef<'_, T> {
    fn clone(&self) -> Self {
        match self {
            Self::Id(id) => Self::Id(id.clone()),
            Self::Entity(entity) => Self::Entity(entity),
        }
    }
}

impl<T> From<Id> for EntityRef<'_, T> {
    fn from(value: Id) -> Self {
        Self::Id(value)
    }
}

impl<'a, T: Identified> From<&'a T> for EntityRef<'a, T> {
    fn from(value: &'a T) -> Self {
        Self::Entity(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Entity, EntityKind, Identified};
    use crate::model::task::Task;

    #[test]
    fn bare_entities_are_unsaved_and_tagged() {
        for kind in EntityKind::all() {
            let entity = Entity::bare(kind);
            assert_eq!(entity.kind(), kind);
            assert!(!entity.is_saved());
        }
    }

    #[test]
    fn into_record_rejects_other_kinds() {
        let entity = Entity::bare(EntityKind::FlowStep);
        assert!(entity.clone().into_record::<Task>().is_none());
        assert!(entity
            .into_record::<crate::model::flow_step::FlowStep>()
            .is_some());
    }
}
