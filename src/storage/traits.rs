//! Abstract graph sink trait.
//!
//! The exporter writes through this trait only. By using a trait, we enable:
//! - An in-memory sink for tests and JSON export
//! - Adapters for external graph databases

use thiserror::Error;

use crate::entity::{NodeId, NodeKind, PersonAttributes, Relationship};

/// Errors that can occur during sink operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Node not found.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// The operation does not apply to this kind of node.
    #[error("Node {id} is a {kind}, expected {expected}")]
    WrongKind {
        /// The node addressed.
        id: NodeId,
        /// Its actual kind.
        kind: NodeKind,
        /// The kind the operation needs.
        expected: NodeKind,
    },

    /// Canonical names must not be blank.
    #[error("Empty canonical name for {0}")]
    EmptyName(NodeKind),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Destination of an export.
///
/// # Idempotence
/// - `get_or_create_entity` returns the same handle for the same
///   `(kind, canonical_name)` no matter how often it is called
/// - `connect` records a given `(from, to, relationship)` at most once
pub trait GraphSink: Send + Sync {
    /// Looks up or creates the node `(kind, canonical_name)`.
    fn get_or_create_entity(
        &self,
        kind: NodeKind,
        canonical_name: &str,
    ) -> Result<NodeId, StorageError>;

    /// Sets the scalar attributes of a person node, replacing earlier ones.
    fn set_person_attributes(
        &self,
        node: NodeId,
        attributes: PersonAttributes,
    ) -> Result<(), StorageError>;

    /// Records a typed relationship between two existing nodes.
    fn connect(
        &self,
        from: NodeId,
        to: NodeId,
        relationship: Relationship,
    ) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_graph_sink_object_safe(_: &dyn GraphSink) {}

    #[test]
    fn test_storage_error_display() {
        let id = NodeId::derive(NodeKind::Role, "R");
        let err = StorageError::NodeNotFound(id);
        assert!(err.to_string().contains("Node not found"));

        let err = StorageError::WrongKind {
            id,
            kind: NodeKind::Role,
            expected: NodeKind::Person,
        };
        assert!(err.to_string().contains("expected Person"));

        let err = StorageError::BackendError("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
