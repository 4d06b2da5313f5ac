//! In-memory reference source.
//!
//! # Responsibility
//! - Provide a complete `Source` usable in tests and embedded setups.
//! - Let callers switch each optional capability on or off at runtime.
//!
//! # Invariants
//! - Stored entities are cloned on every read and write; callers never hold
//!   a reference into storage.
//! - Generated ids are numeric and unique across all entity kinds.

use crate::capability::{Capability, CapabilitySet};
use crate::error::{SourceError, SourceResult};
use crate::model::board::Board;
use crate::model::collection::EntityCollection;
use crate::model::entity::{Entity, EntityKind, Identified};
use crate::model::flow::Flow;
use crate::model::id::Id;
use crate::model::task::Task;
use crate::source::{ListEntities, Source, StepFlowLookup, StepTasksLookup, TaskBoardLookup};
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;

type EntityStore = BTreeMap<Id, Entity>;

/// Source keeping every entity in process memory.
pub struct MemorySource {
    storage: RwLock<BTreeMap<EntityKind, EntityStore>>,
    capabilities: RwLock<CapabilitySet>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    /// Creates an empty source with every optional capability enabled.
    pub fn new() -> Self {
        Self::with_capabilities(CapabilitySet::full())
    }

    pub fn with_capabilities(capabilities: CapabilitySet) -> Self {
        Self {
            storage: RwLock::new(BTreeMap::new()),
            capabilities: RwLock::new(capabilities),
        }
    }

    /// Enables or disables one optional operation. Takes effect on the next
    /// probe.
    pub fn set_capability(&self, capability: Capability, enabled: bool) {
        let mut capabilities = self.capabilities.write();
        *capabilities = capabilities.with(capability, enabled);
        debug!(
            "event=capability_toggled module=memory_source capability={} enabled={}",
            capability.as_str(),
            enabled
        );
    }

    pub fn capabilities(&self) -> CapabilitySet {
        *self.capabilities.read()
    }

    /// Total number of stored entities across kinds.
    pub fn len(&self) -> usize {
        self.storage.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len_of(&self, kind: EntityKind) -> usize {
        self.storage.read().get(&kind).map_or(0, BTreeMap::len)
    }

    /// Clones of every stored entity of `kind`.
    pub fn entities(&self, kind: EntityKind) -> Vec<Entity> {
        self.storage
            .read()
            .get(&kind)
            .map(|store| store.values().cloned().collect())
            .unwrap_or_default()
    }

    fn enabled(&self, capability: Capability) -> bool {
        self.capabilities.read().contains(capability)
    }

    fn next_id(storage: &BTreeMap<EntityKind, EntityStore>) -> Id {
        let used = |id: &Id| storage.values().any(|store| store.contains_key(id));
        let mut candidate = 0_i64;
        loop {
            let id = Id::Number(candidate);
            if !used(&id) {
                return id;
            }
            candidate += 1;
        }
    }

    fn boards(storage: &BTreeMap<EntityKind, EntityStore>) -> impl Iterator<Item = &Board> {
        storage
            .get(&EntityKind::Board)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter_map(|entity| match entity {
                Entity::Board(board) => Some(board),
                _ => None,
            })
    }
}

#[async_trait]
impl Source for MemorySource {
    async fn get(&self, kind: EntityKind, id: &Id) -> SourceResult<Option<Entity>> {
        Ok(self
            .storage
            .read()
            .get(&kind)
            .and_then(|store| store.get(id))
            .cloned())
    }

    async fn set(&self, mut entity: Entity) -> SourceResult<Entity> {
        let mut storage = self.storage.write();
        let id = match entity.id().cloned() {
            Some(id) => id,
            None => {
                let id = Self::next_id(&storage);
                entity.set_id(id.clone());
                id
            }
        };
        let kind = entity.kind();
        storage.entry(kind).or_default().insert(id.clone(), entity.clone());
        debug!(
            "event=entity_stored module=memory_source status=ok kind={} id={}",
            kind, id
        );
        Ok(entity)
    }

    async fn delete(&self, kind: EntityKind, id: &Id) -> SourceResult<()> {
        if let Some(store) = self.storage.write().get_mut(&kind) {
            store.remove(id);
        }
        Ok(())
    }

    fn lister(&self) -> Option<&dyn ListEntities> {
        self.enabled(Capability::Listing)
            .then_some(self as &dyn ListEntities)
    }

    fn task_boards(&self) -> Option<&dyn TaskBoardLookup> {
        self.enabled(Capability::TaskUniqueBoard)
            .then_some(self as &dyn TaskBoardLookup)
    }

    fn step_flows(&self) -> Option<&dyn StepFlowLookup> {
        self.enabled(Capability::StepUniqueFlow)
            .then_some(self as &dyn StepFlowLookup)
    }

    fn step_tasks(&self) -> Option<&dyn StepTasksLookup> {
        self.enabled(Capability::StepTasks)
            .then_some(self as &dyn StepTasksLookup)
    }
}

#[async_trait]
impl ListEntities for MemorySource {
    async fn list(&self, kind: EntityKind) -> SourceResult<Vec<Entity>> {
        Ok(self.entities(kind))
    }
}

#[async_trait]
impl TaskBoardLookup for MemorySource {
    async fn task_board(&self, task_id: &Id) -> SourceResult<Option<Board>> {
        let storage = self.storage.read();
        let board = Self::boards(&storage).find(|board| board.tasks.contains_key(task_id));
        Ok(board.cloned())
    }
}

#[async_trait]
impl StepFlowLookup for MemorySource {
    async fn step_flow(&self, step_id: &Id) -> SourceResult<Flow> {
        let storage = self.storage.read();
        let flow = storage
            .get(&EntityKind::Flow)
            .into_iter()
            .flat_map(BTreeMap::values)
            .find_map(|entity| match entity {
                Entity::Flow(flow) if flow.steps.contains_key(step_id) => Some(flow.clone()),
                _ => None,
            });
        flow.ok_or_else(|| SourceError::MissingAssociation {
            kind: EntityKind::FlowStep,
            id: step_id.clone(),
        })
    }
}

#[async_trait]
impl StepTasksLookup for MemorySource {
    async fn tasks_with_step(&self, step_id: &Id) -> SourceResult<Vec<Task>> {
        let storage = self.storage.read();
        let stored_tasks = storage.get(&EntityKind::Task);
        let mut related: EntityCollection<Task> = EntityCollection::new();
        for board in Self::boards(&storage) {
            for (task_id, _) in board
                .task_steps
                .iter()
                .filter(|(_, assigned)| *assigned == step_id)
            {
                let task = stored_tasks
                    .and_then(|store| store.get(task_id))
                    .and_then(|entity| match entity {
                        Entity::Task(task) => Some(task.clone()),
                        _ => None,
                    })
                    .ok_or_else(|| {
                        SourceError::Corrupted(format!(
                            "board {} maps task {} to a step, but the task is not stored",
                            board
                                .id
                                .as_ref()
                                .map_or_else(|| "<unsaved>".to_string(), Id::to_string),
                            task_id
                        ))
                    })?;
                related.insert(task_id.clone(), task);
            }
        }
        Ok(related.into_values().collect())
    }
}
