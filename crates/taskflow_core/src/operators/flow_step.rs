//! Flow step operators.
//!
//! # Responsibility
//! - Typed CRUD for flow steps.
//! - Step-side lookups: the owning flow (`R2`) and the assigned tasks (`ST1`).
//!
//! # Invariants
//! - With `ST1`, a step still assigned to any task is never deleted.
//! - Lookups are answered by the source; nothing is cached between calls.

use crate::capability::{
    Capability, CapabilityRegistry, Requirement, STEP_TASKS, STEP_UNIQUE_FLOW,
};
use crate::error::{OperatorError, OperatorResult};
use crate::model::collection::EntityCollection;
use crate::model::entity::{EntityRef, Patch};
use crate::model::flow::Flow;
use crate::model::flow_step::FlowStep;
use crate::model::id::Id;
use crate::model::task::Task;
use crate::operators::entity::EntityOperators;
use crate::source::Source;
use log::debug;

/// Flow step operators bound to one source.
#[derive(Clone, Copy)]
pub struct FlowStepOperators<'a> {
    source: &'a dyn Source,
}

impl<'a> FlowStepOperators<'a> {
    pub fn new(source: &'a dyn Source) -> Self {
        Self { source }
    }

    fn entity(&self) -> EntityOperators<'a> {
        EntityOperators::new(self.source)
    }

    fn registry(&self) -> CapabilityRegistry<'a> {
        CapabilityRegistry::new(self.source)
    }

    /// Returns the stored step, or `None` when nothing is stored under its id.
    pub async fn get<'r>(
        &self,
        step: impl Into<EntityRef<'r, FlowStep>>,
    ) -> OperatorResult<Option<FlowStep>> {
        let id = self.get_id(step)?;
        self.entity().get_record(&id).await
    }

    pub async fn get_or_fail<'r>(
        &self,
        step: impl Into<EntityRef<'r, FlowStep>>,
    ) -> OperatorResult<FlowStep> {
        let id = self.get_id(step)?;
        self.entity().get_record_or_fail(&id).await
    }

    /// Requires `A1`.
    pub async fn list(&self) -> OperatorResult<EntityCollection<FlowStep>> {
        self.entity().list_records().await
    }

    pub async fn save(&self, step: &FlowStep) -> OperatorResult<FlowStep> {
        self.entity().save_record(step).await
    }

    /// Persists a new step.
    pub async fn create(&self) -> OperatorResult<FlowStep> {
        self.save(&FlowStep::new()).await
    }

    pub fn update<P: Patch<FlowStep>>(&self, props: P, step: &FlowStep) -> FlowStep {
        self.entity().update(props, step)
    }

    /// Deletes a saved step and returns its last known value.
    ///
    /// With `ST1`, fails with `FlowStepInUse` before any write when tasks are
    /// still assigned to the step.
    pub async fn delete(&self, step: &FlowStep) -> OperatorResult<FlowStep> {
        let id = self.get_id(step)?;
        if self.registry().has(Capability::StepTasks) {
            let tasks = self.get_tasks(step).await?;
            if !tasks.is_empty() {
                debug!(
                    "event=step_delete_refused module=flow_step status=error step={} tasks={}",
                    id,
                    tasks.len()
                );
                return Err(OperatorError::FlowStepInUse {
                    step: id,
                    tasks: tasks.len(),
                });
            }
        }
        self.entity().delete_record(step).await
    }

    pub fn clone(&self, step: &FlowStep) -> FlowStep {
        step.clone()
    }

    /// Re-fetches the step by its own id.
    pub async fn refresh(&self, step: &FlowStep) -> OperatorResult<Option<FlowStep>> {
        self.entity().refresh_record(step).await
    }

    pub async fn refresh_or_fail(&self, step: &FlowStep) -> OperatorResult<FlowStep> {
        self.entity().refresh_record_or_fail(step).await
    }

    pub fn get_id<'r>(&self, step: impl Into<EntityRef<'r, FlowStep>>) -> OperatorResult<Id> {
        self.entity().get_id(step.into())
    }

    /// Requires `R2`. Returns the flow the step belongs to.
    ///
    /// Sources report a step in no flow as an error, not as absence.
    pub async fn get_flow<'r>(
        &self,
        step: impl Into<EntityRef<'r, FlowStep>>,
    ) -> OperatorResult<Flow> {
        self.registry().check(&STEP_UNIQUE_FLOW)?;
        let id = self.get_id(step)?;
        let lookup = self
            .source
            .step_flows()
            .ok_or_else(|| self.denied(STEP_UNIQUE_FLOW))?;
        Ok(lookup.step_flow(&id).await?)
    }

    /// Requires `ST1`. Returns the tasks assigned to the step, keyed by id.
    pub async fn get_tasks<'r>(
        &self,
        step: impl Into<EntityRef<'r, FlowStep>>,
    ) -> OperatorResult<EntityCollection<Task>> {
        self.registry().check(&STEP_TASKS)?;
        let id = self.get_id(step)?;
        let lookup = self
            .source
            .step_tasks()
            .ok_or_else(|| self.denied(STEP_TASKS))?;
        let tasks = lookup.tasks_with_step(&id).await?;
        self.entity().to_collection(tasks)
    }

    fn denied(&self, required: Requirement) -> OperatorError {
        OperatorError::NotImplemented {
            required,
            current: self.registry().current(),
        }
    }
}
