use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::class_list::ClassList;

/// Reserved attribute key holding the serialized class list.
pub const CLASS_ATTRIBUTE: &str = "className";

/// Stable, process-unique node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id, mostly useful for fixtures and tests.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for NodeId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Scalar or string attribute value.
///
/// Untagged so that `true`, `3`, `1.5`, `"text"` and `null` read naturally
/// from JSON and YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttrValue {
    /// Extract as string, returning None for non-string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

/// Insertion-ordered attribute map of a node.
pub type AttributeMap = IndexMap<String, AttrValue>;

/// Attribute update. `None` unsets the key.
pub type AttributePatch = IndexMap<String, Option<AttrValue>>;

/// A node as seen through the host tree: a read-only snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub type_name: String,
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(default)]
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn new(id: NodeId, type_name: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            attributes: AttributeMap::new(),
            parent: None,
        }
    }

    /// Class tokens parsed from the [`CLASS_ATTRIBUTE`] value.
    ///
    /// A missing or non-string value yields an empty list.
    pub fn class_list(&self) -> ClassList {
        self.attributes
            .get(CLASS_ATTRIBUTE)
            .and_then(AttrValue::as_str)
            .map(ClassList::parse)
            .unwrap_or_default()
    }

    /// Apply a patch in place: `Some` inserts or overwrites, `None` removes.
    pub fn apply_patch(&mut self, patch: &AttributePatch) {
        for (key, value) in patch {
            match value {
                Some(v) => {
                    self.attributes.insert(key.clone(), v.clone());
                }
                None => {
                    self.attributes.shift_remove(key);
                }
            }
        }
    }
}
