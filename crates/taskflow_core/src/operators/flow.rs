//! Flow operators.
//!
//! # Responsibility
//! - Typed CRUD for flows, deep-copying `steps` on every read and write.
//! - Move steps between flows while keeping flow membership unique (`R2`)
//!   and refusing to drop steps that tasks still use (`ST1`).
//!
//! # Invariants
//! - `add_step` and `remove_step` return unsaved flows; only the detached
//!   previous parent of a moved step is saved by `add_step` itself.
//! - A failed `remove_step` leaves every flow untouched.
//! - Moves are not atomic: the previous parent is saved before the target
//!   flow is read.

use crate::capability::{Capability, CapabilityRegistry, STEP_REPARENTING, STEP_TASKS};
use crate::error::{OperatorError, OperatorResult};
use crate::model::collection::EntityCollection;
use crate::model::entity::{EntityRef, Patch};
use crate::model::flow::{Flow, FlowProps, FlowUpdate};
use crate::model::flow_step::FlowStep;
use crate::model::id::Id;
use crate::operators::entity::EntityOperators;
use crate::operators::flow_step::FlowStepOperators;
use crate::source::Source;
use log::info;

/// Flow operators bound to one source.
#[derive(Clone, Copy)]
pub struct FlowOperators<'a> {
    source: &'a dyn Source,
}

impl<'a> FlowOperators<'a> {
    pub fn new(source: &'a dyn Source) -> Self {
        Self { source }
    }

    fn entity(&self) -> EntityOperators<'a> {
        EntityOperators::new(self.source)
    }

    fn registry(&self) -> CapabilityRegistry<'a> {
        CapabilityRegistry::new(self.source)
    }

    fn steps_ops(&self) -> FlowStepOperators<'a> {
        FlowStepOperators::new(self.source)
    }

    /// Returns the stored flow, or `None` when nothing is stored under its id.
    pub async fn get<'r>(
        &self,
        flow: impl Into<EntityRef<'r, Flow>>,
    ) -> OperatorResult<Option<Flow>> {
        let id = self.get_id(flow)?;
        self.entity().get_record(&id).await
    }

    pub async fn get_or_fail<'r>(
        &self,
        flow: impl Into<EntityRef<'r, Flow>>,
    ) -> OperatorResult<Flow> {
        let id = self.get_id(flow)?;
        self.entity().get_record_or_fail(&id).await
    }

    /// Requires `A1`.
    pub async fn list(&self) -> OperatorResult<EntityCollection<Flow>> {
        self.entity().list_records().await
    }

    /// Persists the flow; unsaved ones get an id from the source.
    pub async fn save(&self, flow: &Flow) -> OperatorResult<Flow> {
        self.entity().save_record(flow).await
    }

    /// Persists a new flow built from `props`.
    pub async fn create(&self, props: FlowProps) -> OperatorResult<Flow> {
        self.save(&Flow::from_props(props)).await
    }

    /// Returns a copy with `props` merged in. Does not persist.
    pub fn update<P: Patch<Flow>>(&self, props: P, flow: &Flow) -> Flow {
        self.entity().update(props, flow)
    }

    /// Deletes a saved flow and returns its last known value.
    pub async fn delete(&self, flow: &Flow) -> OperatorResult<Flow> {
        self.entity().delete_record(flow).await
    }

    /// Deep copy; nested collections are not shared.
    pub fn clone(&self, flow: &Flow) -> Flow {
        flow.clone()
    }

    /// Re-fetches the flow by its own id.
    pub async fn refresh(&self, flow: &Flow) -> OperatorResult<Option<Flow>> {
        self.entity().refresh_record(flow).await
    }

    pub async fn refresh_or_fail(&self, flow: &Flow) -> OperatorResult<Flow> {
        self.entity().refresh_record_or_fail(flow).await
    }

    pub fn get_id<'r>(&self, flow: impl Into<EntityRef<'r, Flow>>) -> OperatorResult<Id> {
        self.entity().get_id(flow.into())
    }

    /// Copy of the flow's steps.
    pub fn get_steps(&self, flow: &Flow) -> EntityCollection<FlowStep> {
        flow.steps.clone()
    }

    pub fn get_default_step_id(&self, flow: &Flow) -> Option<Id> {
        flow.default_step_id.clone()
    }

    /// Requires `(!R2) | (ST1)`. Adds `step` to `flow` and returns the
    /// unsaved flow.
    ///
    /// With `R2`, the step is first removed from its current flow through
    /// [`FlowOperators::remove_step`] and that flow is saved.
    pub async fn add_step<'s, 'f>(
        &self,
        step: impl Into<EntityRef<'s, FlowStep>>,
        flow: impl Into<EntityRef<'f, Flow>>,
    ) -> OperatorResult<Flow> {
        self.registry().check(&STEP_REPARENTING)?;
        let step = step.into();
        let step_id = self.steps_ops().get_id(step.clone())?;

        if self.registry().has(Capability::StepUniqueFlow) {
            let current = self.steps_ops().get_flow(step.clone()).await?;
            let detached = self.remove_step(step.clone(), &current).await?;
            let saved = self.save(&detached).await?;
            info!(
                "event=step_detached module=flow status=ok step={} flow={}",
                step_id,
                self.get_id(&saved)?
            );
        }

        let flow = self.entity().resolve(flow.into()).await?;
        let step = self.entity().resolve(step).await?;
        let mut steps = self.get_steps(&flow);
        steps.insert(step_id, step);
        Ok(self.update(
            FlowUpdate {
                steps: Some(steps),
                ..FlowUpdate::default()
            },
            &flow,
        ))
    }

    /// Requires `ST1`. Removes `step` from `flow` and returns the unsaved
    /// flow.
    ///
    /// Fails with `FlowStepInUse` when any task is assigned to the step.
    pub async fn remove_step<'s, 'f>(
        &self,
        step: impl Into<EntityRef<'s, FlowStep>>,
        flow: impl Into<EntityRef<'f, Flow>>,
    ) -> OperatorResult<Flow> {
        self.registry().check(&STEP_TASKS)?;
        let step = step.into();
        let step_id = self.steps_ops().get_id(step.clone())?;

        let tasks = self.steps_ops().get_tasks(step).await?;
        if !tasks.is_empty() {
            return Err(OperatorError::FlowStepInUse {
                step: step_id,
                tasks: tasks.len(),
            });
        }

        let flow = self.entity().resolve(flow.into()).await?;
        let mut steps = self.get_steps(&flow);
        steps.remove(&step_id);
        Ok(self.update(
            FlowUpdate {
                steps: Some(steps),
                ..FlowUpdate::default()
            },
            &flow,
        ))
    }
}
