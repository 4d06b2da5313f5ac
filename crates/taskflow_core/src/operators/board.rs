//! Board operators.
//!
//! # Responsibility
//! - Typed CRUD for boards, deep-copying `tasks` and `task_steps`.
//! - Task membership and step assignment on a board.
//!
//! # Invariants
//! - `add_task` keeps a task on at most one board when the source
//!   guarantees it (`R1`), persisting the previous board before touching the
//!   target.
//! - `tasks` and `task_steps` must agree on every task id; `has_task` reports
//!   disagreement instead of guessing.
//! - Relationship operations return unsaved boards.

use crate::capability::{Capability, CapabilityRegistry};
use crate::error::{OperatorError, OperatorResult};
use crate::model::board::{Board, BoardProps, BoardUpdate};
use crate::model::collection::{EntityCollection, TaskStepMap};
use crate::model::entity::{EntityKind, EntityRef, Patch};
use crate::model::flow::Flow;
use crate::model::flow_step::FlowStep;
use crate::model::id::Id;
use crate::model::task::Task;
use crate::operators::entity::{not_found, EntityOperators};
use crate::operators::flow_step::FlowStepOperators;
use crate::operators::task::TaskOperators;
use crate::source::Source;
use log::{debug, info};

/// Board operators bound to one source.
#[derive(Clone, Copy)]
pub struct BoardOperators<'a> {
    source: &'a dyn Source,
}

impl<'a> BoardOperators<'a> {
    pub fn new(source: &'a dyn Source) -> Self {
        Self { source }
    }

    fn entity(&self) -> EntityOperators<'a> {
        EntityOperators::new(self.source)
    }

    fn registry(&self) -> CapabilityRegistry<'a> {
        CapabilityRegistry::new(self.source)
    }

    fn tasks_ops(&self) -> TaskOperators<'a> {
        TaskOperators::new(self.source)
    }

    /// Returns the stored board, or `None` when nothing is stored under its id.
    pub async fn get<'r>(
        &self,
        board: impl Into<EntityRef<'r, Board>>,
    ) -> OperatorResult<Option<Board>> {
        let id = self.get_id(board)?;
        self.entity().get_record(&id).await
    }

    pub async fn get_or_fail<'r>(
        &self,
        board: impl Into<EntityRef<'r, Board>>,
    ) -> OperatorResult<Board> {
        let id = self.get_id(board)?;
        self.entity().get_record_or_fail(&id).await
    }

    /// Requires `A1`.
    pub async fn list(&self) -> OperatorResult<EntityCollection<Board>> {
        self.entity().list_records().await
    }

    /// Persists the board; unsaved ones get an id from the source.
    pub async fn save(&self, board: &Board) -> OperatorResult<Board> {
        self.entity().save_record(board).await
    }

    /// Persists a new board built from `props`.
    pub async fn create(&self, props: BoardProps) -> OperatorResult<Board> {
        self.save(&Board::from_props(props)).await
    }

    /// Returns a copy with `props` merged in. Does not persist.
    pub fn update<P: Patch<Board>>(&self, props: P, board: &Board) -> Board {
        self.entity().update(props, board)
    }

    /// Deletes a saved board and returns its last known value.
    pub async fn delete(&self, board: &Board) -> OperatorResult<Board> {
        self.entity().delete_record(board).await
    }

    /// Deep copy; nested collections are not shared.
    pub fn clone(&self, board: &Board) -> Board {
        board.clone()
    }

    /// Re-fetches the board by its own id.
    pub async fn refresh(&self, board: &Board) -> OperatorResult<Option<Board>> {
        self.entity().refresh_record(board).await
    }

    pub async fn refresh_or_fail(&self, board: &Board) -> OperatorResult<Board> {
        self.entity().refresh_record_or_fail(board).await
    }

    pub fn get_id<'r>(&self, board: impl Into<EntityRef<'r, Board>>) -> OperatorResult<Id> {
        self.entity().get_id(board.into())
    }

    /// Copy of the governing flow.
    pub fn get_flow(&self, board: &Board) -> Flow {
        board.flow.clone()
    }

    pub fn get_tasks(&self, board: &Board) -> EntityCollection<Task> {
        board.tasks.clone()
    }

    pub fn get_task_steps(&self, board: &Board) -> TaskStepMap {
        board.task_steps.clone()
    }

    /// Adds `task` to `board` and returns the unsaved board.
    ///
    /// With `R1`, the task is first removed from the board currently holding
    /// it and that board is saved. When the target flow has a default step,
    /// the task is assigned to it.
    pub async fn add_task<'t, 'b>(
        &self,
        task: impl Into<EntityRef<'t, Task>>,
        board: impl Into<EntityRef<'b, Board>>,
    ) -> OperatorResult<Board> {
        let task = task.into();
        let task_id = self.tasks_ops().get_id(task.clone())?;
        let task = self.entity().resolve(task).await?;

        if self.registry().has(Capability::TaskUniqueBoard) {
            if let Some(previous) = self.tasks_ops().get_board(&task).await? {
                let detached = self.remove_task(&task, &previous).await?;
                let saved = self.save(&detached).await?;
                info!(
                    "event=task_detached module=board status=ok task={} board={}",
                    task_id,
                    self.get_id(&saved)?
                );
            }
        }

        let board = self.entity().resolve(board.into()).await?;
        let mut tasks = self.get_tasks(&board);
        tasks.insert(task_id.clone(), task);
        let mut task_steps = self.get_task_steps(&board);
        if let Some(default_step) = board.flow.default_step_id.clone() {
            task_steps.insert(task_id, default_step);
        }
        Ok(self.update(
            BoardUpdate {
                tasks: Some(tasks),
                task_steps: Some(task_steps),
                ..BoardUpdate::default()
            },
            &board,
        ))
    }

    /// Removes `task` from both `tasks` and `task_steps` and returns the
    /// unsaved board.
    pub async fn remove_task<'t, 'b>(
        &self,
        task: impl Into<EntityRef<'t, Task>>,
        board: impl Into<EntityRef<'b, Board>>,
    ) -> OperatorResult<Board> {
        let task_id = self.tasks_ops().get_id(task)?;
        let board = self.entity().resolve(board.into()).await?;
        let mut tasks = self.get_tasks(&board);
        tasks.remove(&task_id);
        let mut task_steps = self.get_task_steps(&board);
        task_steps.remove(&task_id);
        Ok(self.update(
            BoardUpdate {
                tasks: Some(tasks),
                task_steps: Some(task_steps),
                ..BoardUpdate::default()
            },
            &board,
        ))
    }

    /// Whether the board holds the task.
    ///
    /// # Errors
    /// - `BoardTaskWithoutStep` when the task is listed but has no step.
    /// - `EntityNotFound` when a step is mapped for a task the board does not
    ///   list.
    pub async fn has_task<'t, 'b>(
        &self,
        task: impl Into<EntityRef<'t, Task>>,
        board: impl Into<EntityRef<'b, Board>>,
    ) -> OperatorResult<bool> {
        let task_id = self.tasks_ops().get_id(task)?;
        let board = self.entity().resolve(board.into()).await?;
        match (
            board.tasks.contains_key(&task_id),
            board.task_steps.contains_key(&task_id),
        ) {
            (true, true) => Ok(true),
            (false, false) => Ok(false),
            (true, false) => Err(OperatorError::BoardTaskWithoutStep {
                board: board.id,
                task: task_id,
            }),
            (false, true) => {
                debug!(
                    "event=orphan_task_step module=board status=error task={}",
                    task_id
                );
                Err(not_found(EntityKind::Task, &task_id))
            }
        }
    }

    /// Fails with `BoardTaskWithoutStep` when no step is mapped.
    pub async fn get_task_step_id<'t, 'b>(
        &self,
        task: impl Into<EntityRef<'t, Task>>,
        board: impl Into<EntityRef<'b, Board>>,
    ) -> OperatorResult<Id> {
        let task_id = self.tasks_ops().get_id(task)?;
        let board = self.entity().resolve(board.into()).await?;
        match board.task_steps.get(&task_id) {
            Some(step_id) => Ok(step_id.clone()),
            None => Err(OperatorError::BoardTaskWithoutStep {
                board: board.id,
                task: task_id,
            }),
        }
    }

    pub async fn get_task_step<'t, 'b>(
        &self,
        task: impl Into<EntityRef<'t, Task>>,
        board: impl Into<EntityRef<'b, Board>>,
    ) -> OperatorResult<FlowStep> {
        let step_id = self.get_task_step_id(task, board).await?;
        FlowStepOperators::new(self.source)
            .get_or_fail(step_id)
            .await
    }

    /// Maps the task to `step` and returns the unsaved board.
    ///
    /// Membership of the task on the board and of the step in the board's
    /// flow is not checked.
    pub async fn set_task_step<'s, 't, 'b>(
        &self,
        step: impl Into<EntityRef<'s, FlowStep>>,
        task: impl Into<EntityRef<'t, Task>>,
        board: impl Into<EntityRef<'b, Board>>,
    ) -> OperatorResult<Board> {
        let step_id = FlowStepOperators::new(self.source).get_id(step)?;
        let task_id = self.tasks_ops().get_id(task)?;
        let board = self.entity().resolve(board.into()).await?;
        let mut task_steps = self.get_task_steps(&board);
        task_steps.insert(task_id, step_id);
        Ok(self.update(
            BoardUpdate {
                task_steps: Some(task_steps),
                ..BoardUpdate::default()
            },
            &board,
        ))
    }
}
