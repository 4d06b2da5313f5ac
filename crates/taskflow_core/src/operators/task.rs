//! Task operators.
//!
//! # Responsibility
//! - Typed CRUD for tasks.
//! - Board-side lookups for a task when the source guarantees a unique
//!   board per task (`R1`).
//!
//! # Invariants
//! - Step assignment is stored on the task's board, never on the task.
//! - `set_task_step` saves the board it changes.

use crate::capability::{CapabilityRegistry, TASK_UNIQUE_BOARD};
use crate::error::{OperatorError, OperatorResult};
use crate::model::board::Board;
use crate::model::collection::EntityCollection;
use crate::model::entity::{EntityRef, Patch};
use crate::model::flow_step::FlowStep;
use crate::model::id::Id;
use crate::model::task::Task;
use crate::operators::board::BoardOperators;
use crate::operators::entity::EntityOperators;
use crate::source::Source;
use log::info;

/// Task operators bound to one source.
#[derive(Clone, Copy)]
pub struct TaskOperators<'a> {
    source: &'a dyn Source,
}

impl<'a> TaskOperators<'a> {
    pub fn new(source: &'a dyn Source) -> Self {
        Self { source }
    }

    fn entity(&self) -> EntityOperators<'a> {
        EntityOperators::new(self.source)
    }

    fn registry(&self) -> CapabilityRegistry<'a> {
        CapabilityRegistry::new(self.source)
    }

    /// Returns the stored task, or `None` when nothing is stored under its id.
    pub async fn get<'r>(
        &self,
        task: impl Into<EntityRef<'r, Task>>,
    ) -> OperatorResult<Option<Task>> {
        let id = self.get_id(task)?;
        self.entity().get_record(&id).await
    }

    pub async fn get_or_fail<'r>(
        &self,
        task: impl Into<EntityRef<'r, Task>>,
    ) -> OperatorResult<Task> {
        let id = self.get_id(task)?;
        self.entity().get_record_or_fail(&id).await
    }

    /// Requires `A1`.
    pub async fn list(&self) -> OperatorResult<EntityCollection<Task>> {
        self.entity().list_records().await
    }

    /// Persists the task; unsaved ones get an id from the source.
    pub async fn save(&self, task: &Task) -> OperatorResult<Task> {
        self.entity().save_record(task).await
    }

    /// Persists a new task.
    pub async fn create(&self) -> OperatorResult<Task> {
        self.save(&Task::new()).await
    }

    /// Returns a copy with `props` merged in. Does not persist.
    pub fn update<P: Patch<Task>>(&self, props: P, task: &Task) -> Task {
        self.entity().update(props, task)
    }

    /// Deletes a saved task and returns its last known value.
    pub async fn delete(&self, task: &Task) -> OperatorResult<Task> {
        self.entity().delete_record(task).await
    }

    /// Deep copy; nested collections are not shared.
    pub fn clone(&self, task: &Task) -> Task {
        task.clone()
    }

    /// Re-fetches the task by its own id.
    pub async fn refresh(&self, task: &Task) -> OperatorResult<Option<Task>> {
        self.entity().refresh_record(task).await
    }

    pub async fn refresh_or_fail(&self, task: &Task) -> OperatorResult<Task> {
        self.entity().refresh_record_or_fail(task).await
    }

    pub fn get_id<'r>(&self, task: impl Into<EntityRef<'r, Task>>) -> OperatorResult<Id> {
        self.entity().get_id(task.into())
    }

    /// Requires `R1`. Returns the board holding the task, if any.
    pub async fn get_board<'r>(
        &self,
        task: impl Into<EntityRef<'r, Task>>,
    ) -> OperatorResult<Option<Board>> {
        self.registry().check(&TASK_UNIQUE_BOARD)?;
        let id = self.get_id(task)?;
        let lookup = self
            .source
            .task_boards()
            .ok_or_else(|| self.denied_task_board())?;
        Ok(lookup.task_board(&id).await?)
    }

    /// Requires `R1`. Returns the step the task is assigned to on its board,
    /// or `None` when the task has no board.
    pub async fn get_task_step<'r>(
        &self,
        task: impl Into<EntityRef<'r, Task>>,
    ) -> OperatorResult<Option<FlowStep>> {
        self.registry().check(&TASK_UNIQUE_BOARD)?;
        let task = task.into();
        let Some(board) = self.get_board(task.clone()).await? else {
            return Ok(None);
        };
        let step = BoardOperators::new(self.source)
            .get_task_step(task, &board)
            .await?;
        Ok(Some(step))
    }

    /// Requires `R1`. Assigns `step` to the task on its board and saves the
    /// board. Returns the task as currently stored.
    ///
    /// Fails with `InvalidBoardAssociation` when the task has no board.
    pub async fn set_task_step<'s, 't>(
        &self,
        step: impl Into<EntityRef<'s, FlowStep>>,
        task: impl Into<EntityRef<'t, Task>>,
    ) -> OperatorResult<Task> {
        self.registry().check(&TASK_UNIQUE_BOARD)?;
        let task = task.into();
        let Some(board) = self.get_board(task.clone()).await? else {
            return Err(OperatorError::InvalidBoardAssociation {
                task: self.get_id(task)?,
            });
        };
        let boards = BoardOperators::new(self.source);
        let updated = boards.set_task_step(step, task.clone(), &board).await?;
        let saved = boards.save(&updated).await?;
        info!(
            "event=task_step_assigned module=task status=ok task={} board={}",
            self.get_id(task.clone())?,
            boards.get_id(&saved)?
        );
        match task {
            EntityRef::Id(id) => self.get_or_fail(id).await,
            EntityRef::Entity(task) => Ok(task.clone()),
        }
    }

    fn denied_task_board(&self) -> OperatorError {
        OperatorError::NotImplemented {
            required: TASK_UNIQUE_BOARD,
            current: self.registry().current(),
        }
    }
}
