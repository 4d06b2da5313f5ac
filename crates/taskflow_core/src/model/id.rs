//! Entity identifiers.
//!
//! # Responsibility
//! - Represent backend-assigned identifiers for every entity kind.
//!
//! # Invariants
//! - An `Id` is opaque to the operators: it is compared and hashed, never
//!   interpreted.
//! - `Token` ids are unique per construction and never collide with text or
//!   numeric ids.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identifier assigned by a source to a saved entity.
///
/// Sources are free to use textual keys, numeric keys or opaque tokens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Id {
    Text(String),
    Number(i64),
    /// Opaque token with no textual meaning.
    Token(Uuid),
}

impl Id {
    /// Generates a fresh opaque token id.
    pub fn token() -> Self {
        Self::Token(Uuid::new_v4())
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Token(value) => write!(f, "token:{value}"),
        }
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<Uuid> for Id {
    fn from(value: Uuid) -> Self {
        Self::Token(value)
    }
}
