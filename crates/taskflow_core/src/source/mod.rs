//! Source contract: the pluggable persistence boundary.
//!
//! # Responsibility
//! - Define the mandatory get/set/delete operations every backend provides.
//! - Define the optional lookups a backend may expose, each behind its own
//!   probe method.
//!
//! # Invariants
//! - A probe returning `Some` means the optional operation is available for
//!   the call being made; probes may change answer between calls.
//! - `set` assigns an id to unsaved entities and is safe to repeat for saved
//!   ones.
//! - Sources own their storage; operators only reach it through this trait.

use crate::error::SourceResult;
use crate::model::board::Board;
use crate::model::entity::{Entity, EntityKind};
use crate::model::flow::Flow;
use crate::model::id::Id;
use crate::model::task::Task;
use async_trait::async_trait;

pub mod memory;

/// Mandatory operations plus probes for the optional ones.
#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the stored entity, or `None` when nothing is stored under `id`.
    async fn get(&self, kind: EntityKind, id: &Id) -> SourceResult<Option<Entity>>;

    /// Persists `entity` and returns the stored value, id included.
    async fn set(&self, entity: Entity) -> SourceResult<Entity>;

    async fn delete(&self, kind: EntityKind, id: &Id) -> SourceResult<()>;

    /// `A1` probe.
    fn lister(&self) -> Option<&dyn ListEntities> {
        None
    }

    /// `R1` probe.
    fn task_boards(&self) -> Option<&dyn TaskBoardLookup> {
        None
    }

    /// `R2` probe.
    fn step_flows(&self) -> Option<&dyn StepFlowLookup> {
        None
    }

    /// `ST1` probe.
    fn step_tasks(&self) -> Option<&dyn StepTasksLookup> {
        None
    }
}

/// Optional bulk listing.
#[async_trait]
pub trait ListEntities: Send + Sync {
    async fn list(&self, kind: EntityKind) -> SourceResult<Vec<Entity>>;
}

/// Optional task to board lookup.
#[async_trait]
pub trait TaskBoardLookup: Send + Sync {
    async fn task_board(&self, task_id: &Id) -> SourceResult<Option<Board>>;
}

/// Optional step to flow lookup.
///
/// Found-or-error: a step in no flow is reported as an error, never as `None`.
#[async_trait]
pub trait StepFlowLookup: Send + Sync {
    async fn step_flow(&self, step_id: &Id) -> SourceResult<Flow>;
}

/// Optional step to tasks lookup.
#[async_trait]
pub trait StepTasksLookup: Send + Sync {
    async fn tasks_with_step(&self, step_id: &Id) -> SourceResult<Vec<Task>>;
}
