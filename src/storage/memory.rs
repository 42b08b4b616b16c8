//! In-memory graph sink.
//!
//! Thread-safe implementation of [`GraphSink`], intended for embedded usage,
//! tests and JSON export. Snapshot nodes and edges are ordered
//! deterministically, so two runs over the same input yield the same
//! [`GraphSnapshot::digest`]. The serialized snapshot also carries its
//! `generated_at` time and so differs between runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{GraphEdge, GraphNode, NodeId, NodeKind, PersonAttributes, Relationship};
use crate::storage::traits::{GraphSink, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct GraphState {
    nodes: BTreeMap<NodeId, GraphNode>,
    edges: BTreeSet<GraphEdge>,
}

/// Thread-safe in-memory graph sink.
#[derive(Debug, Default)]
pub struct InMemoryGraphSink {
    state: RwLock<GraphState>,
}

impl InMemoryGraphSink {
    /// Create a new empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a node by kind and canonical name.
    pub fn find(&self, kind: NodeKind, name: &str) -> Result<Option<GraphNode>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("graph.find"))?;
        Ok(state.nodes.get(&NodeId::derive(kind, name)).cloned())
    }

    /// Returns all nodes of `kind`, ordered by name.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Result<Vec<GraphNode>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("graph.nodes_of_kind"))?;
        let mut nodes: Vec<GraphNode> = state
            .nodes
            .values()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(nodes)
    }

    /// Returns the outgoing edges of `from`.
    pub fn edges_from(&self, from: NodeId) -> Result<Vec<GraphEdge>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("graph.edges_from"))?;
        Ok(state.edges.iter().filter(|e| e.from == from).copied().collect())
    }

    /// Number of nodes.
    pub fn node_count(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("graph.node_count"))?;
        Ok(state.nodes.len())
    }

    /// Number of edges.
    pub fn edge_count(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("graph.edge_count"))?;
        Ok(state.edges.len())
    }

    /// Copies the current graph into a serializable snapshot.
    pub fn snapshot(&self) -> Result<GraphSnapshot, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("graph.snapshot"))?;
        let mut nodes: Vec<GraphNode> = state.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));

        let mut edges: Vec<GraphEdge> = state.edges.iter().copied().collect();
        edges.sort_by(|a, b| {
            a.relationship
                .cmp(&b.relationship)
                .then_with(|| a.from.cmp(&b.from))
                .then_with(|| a.to.cmp(&b.to))
        });

        Ok(GraphSnapshot {
            generated_at: Utc::now(),
            nodes,
            edges,
        })
    }
}

impl GraphSink for InMemoryGraphSink {
    fn get_or_create_entity(
        &self,
        kind: NodeKind,
        canonical_name: &str,
    ) -> Result<NodeId, StorageError> {
        if canonical_name.trim().is_empty() {
            return Err(StorageError::EmptyName(kind));
        }
        let id = NodeId::derive(kind, canonical_name);
        let mut state = self.state.write().map_err(|_| lock_err("graph.get_or_create"))?;
        state
            .nodes
            .entry(id)
            .or_insert_with(|| GraphNode::new(kind, canonical_name));
        Ok(id)
    }

    fn set_person_attributes(
        &self,
        node: NodeId,
        attributes: PersonAttributes,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("graph.set_attributes"))?;
        let entry = state
            .nodes
            .get_mut(&node)
            .ok_or(StorageError::NodeNotFound(node))?;
        if entry.kind != NodeKind::Person {
            return Err(StorageError::WrongKind {
                id: node,
                kind: entry.kind,
                expected: NodeKind::Person,
            });
        }
        entry.attributes = Some(attributes);
        Ok(())
    }

    fn connect(
        &self,
        from: NodeId,
        to: NodeId,
        relationship: Relationship,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("graph.connect"))?;
        for id in [from, to] {
            if !state.nodes.contains_key(&id) {
                return Err(StorageError::NodeNotFound(id));
            }
        }
        state.edges.insert(GraphEdge {
            from,
            to,
            relationship,
        });
        Ok(())
    }
}

/// Serializable copy of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// When the snapshot was taken; not part of the digest.
    pub generated_at: DateTime<Utc>,
    /// Ordered by kind, then name.
    pub nodes: Vec<GraphNode>,
    /// Ordered by relationship, then endpoints.
    pub edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
    /// Stable content hash over nodes and edges (excludes `generated_at`).
    pub fn digest(&self) -> Result<String, StorageError> {
        let mut hasher = blake3::Hasher::new();
        for node in &self.nodes {
            let bytes = serde_json::to_vec(node)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            hasher.update(&bytes);
            hasher.update(b"\n");
        }
        for edge in &self.edges {
            let bytes = serde_json::to_vec(edge)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            hasher.update(&bytes);
            hasher.update(b"\n");
        }
        Ok(hasher.finalize().to_hex().to_string())
    }
}
