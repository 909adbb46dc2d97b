//! Scripted mutation replay against a [`MemoryTree`].
//!
//! A script is a YAML or JSON list of operations tagged by `op`:
//!
//! ```yaml
//! - op: insert
//!   parent: 6f1c0e9a-1d2b-4c3e-9f40-0a1b2c3d4e5f
//!   node: { type: button }
//! - op: set_attributes
//!   id: 6f1c0e9a-1d2b-4c3e-9f40-0a1b2c3d4e5f
//!   attributes: { className: null, size: small }
//! ```
//!
//! Every operation fires the tree's change notification, so an attached
//! reconciler sees the same sequence of events an editor would produce.

use std::fs;
use std::path::Path;

use inner_defaults_core::{AttributePatch, MemoryTree, NodeId, NodeSnapshot, TreeError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("script parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("op #{index} ({op}) failed: {source}")]
    Op {
        index: usize,
        op: &'static str,
        #[source]
        source: TreeError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    /// Insert a subtree; appended when `index` is absent, a root when
    /// `parent` is absent.
    Insert {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<NodeId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
        node: NodeSnapshot,
    },
    Remove {
        id: NodeId,
    },
    Move {
        id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<NodeId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// `null` values remove the attribute.
    SetAttributes {
        id: NodeId,
        attributes: AttributePatch,
    },
}

impl ScriptOp {
    pub fn name(&self) -> &'static str {
        match self {
            ScriptOp::Insert { .. } => "insert",
            ScriptOp::Remove { .. } => "remove",
            ScriptOp::Move { .. } => "move",
            ScriptOp::SetAttributes { .. } => "set_attributes",
        }
    }

    fn apply(&self, tree: &MemoryTree) -> Result<(), TreeError> {
        match self {
            ScriptOp::Insert {
                parent,
                index,
                node,
            } => tree.insert(*parent, *index, node.clone()).map(|_| ()),
            ScriptOp::Remove { id } => tree.remove(*id).map(|_| ()),
            ScriptOp::Move { id, parent, index } => tree.move_node(*id, *parent, *index),
            ScriptOp::SetAttributes { id, attributes } => tree.set_attributes(*id, attributes),
        }
    }
}

/// Apply `ops` in order, stopping at the first failure.
///
/// Returns the number of operations applied.
pub fn replay(tree: &MemoryTree, ops: &[ScriptOp]) -> Result<usize, ReplayError> {
    for (index, op) in ops.iter().enumerate() {
        debug!(index, op = op.name(), "replaying op");
        op.apply(tree).map_err(|source| ReplayError::Op {
            index,
            op: op.name(),
            source,
        })?;
    }
    info!(ops = ops.len(), nodes = tree.len(), "script replayed");
    Ok(ops.len())
}

/// Read a script file. JSON is accepted as a subset of YAML.
pub fn read_script_file(path: &Path) -> Result<Vec<ScriptOp>, ReplayError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}
