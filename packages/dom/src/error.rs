//! Error types for tree manipulation

use crate::tree::NodeId;
use thiserror::Error;

/// Result type for structural tree operations
pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Node {0:?} cannot have children")]
    NotAContainer(NodeId),

    #[error("Inserting {node:?} under {parent:?} would create a cycle")]
    HierarchyViolation { parent: NodeId, node: NodeId },
}
