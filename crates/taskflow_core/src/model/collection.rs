//! Id-keyed entity collections.
//!
//! # Invariants
//! - Every key of an `EntityCollection` equals the id of its value.
//! - Serialized collections carry values only; keys are rebuilt from ids.

use crate::model::entity::Identified;
use crate::model::id::Id;
use std::collections::BTreeMap;

/// Mapping from entity id to entity.
pub type EntityCollection<T> = BTreeMap<Id, T>;

/// Mapping from task id to flow-step id inside a board.
pub type TaskStepMap = BTreeMap<Id, Id>;

/// Serializes a collection as the sequence of its values.
pub(crate) mod values {
    use super::{EntityCollection, Identified};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(
        collection: &EntityCollection<T>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(collection.values())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<EntityCollection<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Identified,
    {
        Vec::<T>::deserialize(deserializer)?
            .into_iter()
            .map(|value| match value.id().cloned() {
                Some(id) => Ok((id, value)),
                None => Err(D::Error::custom(format!(
                    "unsaved {} inside an entity collection",
                    value.kind()
                ))),
            })
            .collect()
    }
}

/// Serializes an id mapping as a sequence of `(key, value)` pairs.
pub(crate) mod pairs {
    use super::TaskStepMap;
    use crate::model::id::Id;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(map: &TaskStepMap, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<TaskStepMap, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Vec::<(Id, Id)>::deserialize(deserializer)?
            .into_iter()
            .collect())
    }
}
