//! Nested, serializable form of a tree or subtree.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::node::{AttributeMap, NodeId};

/// A node plus its children, as read from or written to JSON/YAML.
///
/// `id` is optional on input; the host assigns one when it is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub attributes: AttributeMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            id: None,
            type_name: type_name.into(),
            attributes: AttributeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<crate::AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: NodeSnapshot) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, root included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(NodeSnapshot::count).sum::<usize>()
    }
}

/// Read a list of root snapshots from a `.json`, `.yml` or `.yaml` file.
///
/// Any other extension is parsed as JSON.
pub fn read_snapshot_file(path: &Path) -> Result<Vec<NodeSnapshot>> {
    let contents = fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false);
    if is_yaml {
        Ok(serde_yaml::from_str(&contents)?)
    } else {
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttrValue;

    #[test]
    fn parse_nested_yaml() {
        let yaml = r#"
- type: core/group
  attributes:
    className: highlighted
  children:
    - type: core/buttons
      children:
        - type: core/button
          attributes:
            text: Go
"#;
        let roots: Vec<NodeSnapshot> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].count(), 3);
        assert!(roots[0].id.is_none());
        let button = &roots[0].children[0].children[0];
        assert_eq!(button.type_name, "core/button");
        assert_eq!(button.attributes["text"], AttrValue::from("Go"));
    }

    #[test]
    fn json_output_skips_empty_fields() {
        let snap = NodeSnapshot::new("core/paragraph").with_id(NodeId::from_u128(7));
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "00000000-0000-0000-0000-000000000007",
                "type": "core/paragraph"
            })
        );
    }
}
