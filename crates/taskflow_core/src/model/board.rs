//! Board entity.
//!
//! # Invariants
//! - Board consistency: a task id is a key of `tasks` iff it is a key of
//!   `task_steps`. Violations are reported by the board operators, never
//!   repaired silently.
//! - Every value of `task_steps` is a flow-step id.

use crate::model::collection::{self, EntityCollection, TaskStepMap};
use crate::model::entity::{Entity, EntityKind, Identified, Patch, Record};
use crate::model::flow::Flow;
use crate::model::id::Id;
use crate::model::task::Task;
use serde::{Deserialize, Serialize};

/// Set of tasks, each assigned to a step of the board's flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub flow: Flow,
    #[serde(default, with = "collection::values")]
    pub tasks: EntityCollection<Task>,
    #[serde(default, with = "collection::pairs")]
    pub task_steps: TaskStepMap,
}

impl Board {
    /// Creates an unsaved, empty board governed by `flow`.
    pub fn new(flow: Flow) -> Self {
        Self {
            id: None,
            flow,
            tasks: EntityCollection::new(),
            task_steps: TaskStepMap::new(),
        }
    }

    /// Builds an unsaved board from creation props.
    pub fn from_props(props: BoardProps) -> Self {
        Self {
            id: None,
            flow: props.flow,
            tasks: props.tasks,
            task_steps: props.task_steps,
        }
    }
}

/// Creation props for a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardProps {
    pub flow: Flow,
    pub tasks: EntityCollection<Task>,
    pub task_steps: TaskStepMap,
}

impl BoardProps {
    pub fn new(flow: Flow) -> Self {
        Self {
            flow,
            tasks: EntityCollection::new(),
            task_steps: TaskStepMap::new(),
        }
    }
}

/// Update props for a board; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardUpdate {
    pub flow: Option<Flow>,
    pub tasks: Option<EntityCollection<Task>>,
    pub task_steps: Option<TaskStepMap>,
}

impl Patch<Board> for BoardUpdate {
    fn apply_to(self, target: &mut Board) {
        if let Some(flow) = self.flow {
            target.flow = flow;
        }
        if let Some(tasks) = self.tasks {
            target.tasks = tasks;
        }
        if let Some(task_steps) = self.task_steps {
            target.task_steps = task_steps;
        }
    }
}

impl Identified for Board {
    fn kind(&self) -> EntityKind {
        EntityKind::Board
    }

    fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }
}

impl Record for Board {
    const KIND: EntityKind = EntityKind::Board;

    fn set_id(&mut self, id: Id) {
        self.id = Some(id);
    }

    fn into_entity(self) -> Entity {
        Entity::Board(self)
    }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Board(board) => Some(board),
            _ => None,
        }
    }
}
