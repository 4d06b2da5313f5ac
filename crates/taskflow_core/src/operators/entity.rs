//! Generic entity operators.
//!
//! # Responsibility
//! - CRUD entry points over any entity kind, dynamically (`Entity` plus an
//!   `EntityKind`) or typed (`T: Record`).
//! - Saved-ness guards and id extraction shared by every typed operator.
//! - Id-keyed collection helpers.
//!
//! # Invariants
//! - A source answer whose kind differs from the requested kind is treated
//!   as absent.
//! - Every returned entity is an owned value; nothing aliases source storage.
//! - `update` and `clone` never touch the source.

use crate::capability::{CapabilityRegistry, LISTING};
use crate::error::{OperatorError, OperatorResult, SourceError};
use crate::model::collection::EntityCollection;
use crate::model::entity::{Entity, EntityKind, EntityRef, Identified, Patch, Record};
use crate::model::id::Id;
use crate::source::Source;
use log::debug;

/// Entity operators bound to one source.
#[derive(Clone, Copy)]
pub struct EntityOperators<'a> {
    source: &'a dyn Source,
}

impl<'a> EntityOperators<'a> {
    pub fn new(source: &'a dyn Source) -> Self {
        Self { source }
    }

    pub fn registry(&self) -> CapabilityRegistry<'a> {
        CapabilityRegistry::new(self.source)
    }

    /// Returns the entity of `kind` stored under `id`, if any.
    pub async fn get(&self, kind: EntityKind, id: &Id) -> OperatorResult<Option<Entity>> {
        let found = self.source.get(kind, id).await?;
        Ok(found.filter(|entity| matches_kind(entity, kind, id)))
    }

    /// Like [`EntityOperators::get`], failing with `EntityNotFound` when absent.
    pub async fn get_or_fail(&self, kind: EntityKind, id: &Id) -> OperatorResult<Entity> {
        self.get(kind, id)
            .await?
            .ok_or_else(|| not_found(kind, id))
    }

    /// Requires `A1`.
    pub async fn list(&self, kind: EntityKind) -> OperatorResult<EntityCollection<Entity>> {
        self.registry().check(&LISTING)?;
        let lister = self.source.lister().ok_or_else(|| self.denied_listing())?;
        let entities = lister.list(kind).await?;
        self.to_collection(entities)
    }

    /// Persists `entity` and returns the stored value, id included.
    pub async fn save(&self, entity: &Entity) -> OperatorResult<Entity> {
        Ok(self.source.set(entity.clone()).await?)
    }

    /// Persists a bare entity of `kind`.
    pub async fn create(&self, kind: EntityKind) -> OperatorResult<Entity> {
        self.save(&Entity::bare(kind)).await
    }

    /// Returns a copy of `entity` with `props` merged in. Does not persist.
    pub fn update<T: Clone, P: Patch<T>>(&self, props: P, entity: &T) -> T {
        let mut updated = entity.clone();
        props.apply_to(&mut updated);
        updated
    }

    /// Deletes a saved entity and returns its last known value.
    pub async fn delete(&self, entity: &Entity) -> OperatorResult<Entity> {
        let id = self.require_saved(entity, Id::clone)?;
        self.source.delete(entity.kind(), &id).await?;
        debug!(
            "event=entity_deleted module=entity status=ok kind={} id={}",
            entity.kind(),
            id
        );
        Ok(entity.clone())
    }

    pub fn clone<T: Clone>(&self, entity: &T) -> T {
        entity.clone()
    }

    /// Re-fetches `entity` by its own id.
    pub async fn refresh(&self, entity: &Entity) -> OperatorResult<Option<Entity>> {
        let id = self.require_saved(entity, Id::clone)?;
        self.get(entity.kind(), &id).await
    }

    pub async fn refresh_or_fail(&self, entity: &Entity) -> OperatorResult<Entity> {
        let id = self.require_saved(entity, Id::clone)?;
        self.get_or_fail(entity.kind(), &id).await
    }

    /// Returns a literal id unchanged, or the id of a saved entity.
    pub fn get_id<T: Identified>(&self, target: EntityRef<'_, T>) -> OperatorResult<Id> {
        match target {
            EntityRef::Id(id) => Ok(id),
            EntityRef::Entity(entity) => self.require_saved(entity, Id::clone),
        }
    }

    /// Runs `f` with the entity's id; fails with `SavingRequired` when the
    /// entity has none.
    pub fn require_saved<T, R, F>(&self, entity: &T, f: F) -> OperatorResult<R>
    where
        T: Identified + ?Sized,
        F: FnOnce(&Id) -> R,
    {
        match entity.id() {
            Some(id) => Ok(f(id)),
            None => Err(OperatorError::SavingRequired {
                kind: entity.kind(),
            }),
        }
    }

    /// Keys saved entities by id; later entries win on collisions.
    pub fn to_collection<T, I>(&self, entities: I) -> OperatorResult<EntityCollection<T>>
    where
        T: Identified,
        I: IntoIterator<Item = T>,
    {
        let mut collection = EntityCollection::new();
        for entity in entities {
            let id = self.require_saved(&entity, Id::clone)?;
            collection.insert(id, entity);
        }
        Ok(collection)
    }

    /// Merges collections in order; later collections win on collisions.
    pub fn merge_collections<T, I>(&self, collections: I) -> EntityCollection<T>
    where
        I: IntoIterator<Item = EntityCollection<T>>,
    {
        let mut merged = EntityCollection::new();
        for collection in collections {
            merged.extend(collection);
        }
        merged
    }

    pub(crate) async fn get_record<T: Record>(&self, id: &Id) -> OperatorResult<Option<T>> {
        Ok(self.get(T::KIND, id).await?.and_then(T::from_entity))
    }

    pub(crate) async fn get_record_or_fail<T: Record>(&self, id: &Id) -> OperatorResult<T> {
        self.get_record(id)
            .await?
            .ok_or_else(|| not_found(T::KIND, id))
    }

    /// Fetches by id, or clones a given entity.
    pub(crate) async fn resolve<T: Record>(&self, target: EntityRef<'_, T>) -> OperatorResult<T> {
        match target {
            EntityRef::Id(id) => self.get_record_or_fail(&id).await,
            EntityRef::Entity(entity) => Ok(entity.clone()),
        }
    }

    pub(crate) async fn list_records<T: Record>(&self) -> OperatorResult<EntityCollection<T>> {
        let entities = self.list(T::KIND).await?;
        Ok(entities
            .into_iter()
            .filter_map(|(id, entity)| T::from_entity(entity).map(|record| (id, record)))
            .collect())
    }

    pub(crate) async fn save_record<T: Record>(&self, record: &T) -> OperatorResult<T> {
        let stored = self.save(&record.clone().into_entity()).await?;
        let kind = stored.kind();
        T::from_entity(stored).ok_or_else(|| {
            OperatorError::Source(SourceError::Corrupted(format!(
                "saving a {} returned a {}",
                T::KIND,
                kind
            )))
        })
    }

    pub(crate) async fn delete_record<T: Record>(&self, record: &T) -> OperatorResult<T> {
        let id = self.require_saved(record, Id::clone)?;
        self.source.delete(T::KIND, &id).await?;
        debug!(
            "event=entity_deleted module=entity status=ok kind={} id={}",
            T::KIND,
            id
        );
        Ok(record.clone())
    }

    pub(crate) async fn refresh_record<T: Record>(&self, record: &T) -> OperatorResult<Option<T>> {
        let id = self.require_saved(record, Id::clone)?;
        self.get_record(&id).await
    }

    pub(crate) async fn refresh_record_or_fail<T: Record>(&self, record: &T) -> OperatorResult<T> {
        let id = self.require_saved(record, Id::clone)?;
        self.get_record_or_fail(&id).await
    }

    fn denied_listing(&self) -> OperatorError {
        OperatorError::NotImplemented {
            required: LISTING,
            current: self.registry().current(),
        }
    }
}

fn matches_kind(entity: &Entity, kind: EntityKind, id: &Id) -> bool {
    if entity.kind() == kind {
        return true;
    }
    debug!(
        "event=kind_mismatch module=entity status=absent requested={} found={} id={}",
        kind,
        entity.kind(),
        id
    );
    false
}

pub(crate) fn not_found(kind: EntityKind, id: &Id) -> OperatorError {
    OperatorError::EntityNotFound {
        kind,
        id: id.clone(),
    }
}
