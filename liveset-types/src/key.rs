//! Primary keys of stored entities.

use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// The `id` of an entity.
///
/// An entity type uses one key flavour consistently; the enum lets the store,
/// the registry, and the wire format handle both without generics. Serialized
/// untagged, so `42` and `"a1"` are both valid keys on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityKey {
    Int(i64),
    Str(String),
}

impl EntityKey {
    /// Reads a key out of a JSON value. Floats, booleans, and containers are
    /// not keys.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    /// Converts the key back into its JSON form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Str(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl TryFrom<&Value> for EntityKey {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or_else(|| Error::InvalidKey(value.to_string()))
    }
}

impl From<i64> for EntityKey {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for EntityKey {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u32> for EntityKey {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<String> for EntityKey {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for EntityKey {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<Uuid> for EntityKey {
    fn from(uuid: Uuid) -> Self {
        Self::Str(uuid.to_string())
    }
}

impl From<&EntityKey> for EntityKey {
    fn from(key: &EntityKey) -> Self {
        key.clone()
    }
}
