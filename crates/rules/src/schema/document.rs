//! Rule-set document: the unit of one YAML file.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::CommonMetadata;

/// Document kinds this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleSetKind {
    InnerDefaults,
}

impl fmt::Display for RuleSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSetKind::InnerDefaults => write!(f, "InnerDefaults"),
        }
    }
}

/// An ordered list of raw rules with a header.
///
/// Individual rules stay as untyped YAML so that one malformed entry is
/// dropped by normalization instead of failing the whole file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSetDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: RuleSetKind,
    pub metadata: CommonMetadata,
    #[serde(default)]
    pub rules: Vec<serde_yaml::Value>,
}

impl RuleSetDocument {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}
