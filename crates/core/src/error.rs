use thiserror::Error;

use crate::node::NodeId;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("Cannot move node {node} under its own descendant {parent}")]
    Cycle { node: NodeId, parent: NodeId },

    #[error("Child index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Result alias for host tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
