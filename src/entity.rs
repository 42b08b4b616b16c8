//! Graph entity types.
//!
//! Nodes are identified by a [`NodeId`] derived from their kind and
//! canonical name, so looking up the same entity twice always yields the
//! same id, across runs and across sinks.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::merge::MergeField;
use crate::pool::Category;

/// Namespace for deterministic node ids.
const NODE_NAMESPACE: Uuid = Uuid::from_u128(0x6c1e_52d4_93a0_4f0b_9d57_0e6b_2f0a_8c31);

/// Stable node identifier.
///
/// # Examples
///
/// ```
/// use expertise_graph::{NodeId, NodeKind};
///
/// let a = NodeId::derive(NodeKind::Institute, "TU X");
/// let b = NodeId::derive(NodeKind::Institute, "TU X");
/// assert_eq!(a, b);
/// assert_ne!(a, NodeId::derive(NodeKind::Faculty, "TU X"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Derives the id of the node `(kind, canonical_name)`.
    #[must_use]
    pub fn derive(kind: NodeKind, canonical_name: &str) -> Self {
        let key = format!("{}:{canonical_name}", kind.label());
        Self(Uuid::new_v5(&NODE_NAMESPACE, key.as_bytes()))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node labels of the expertise graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// An entrant or advisor stub.
    Person,
    /// A research interest.
    ResearchInterest,
    /// Top level of an affiliation.
    Institute,
    /// Middle level of an affiliation.
    Faculty,
    /// Bottom level of an affiliation.
    Department,
    /// A role such as "Professor".
    Role,
    /// Shared by offered and wanted expertise.
    Expertise,
}

impl NodeKind {
    /// Graph label of this kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::ResearchInterest => "ResearchInterest",
            Self::Institute => "Institute",
            Self::Faculty => "Faculty",
            Self::Department => "Department",
            Self::Role => "Role",
            Self::Expertise => "Expertise",
        }
    }
}

impl From<Category> for NodeKind {
    fn from(category: Category) -> Self {
        match category {
            Category::Interest => Self::ResearchInterest,
            Category::Institute => Self::Institute,
            Category::Faculty => Self::Faculty,
            Category::Department => Self::Department,
            Category::Role => Self::Role,
            Category::Expertise => Self::Expertise,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Typed relationship from a person to another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    /// Person → interest, person → role.
    Has,
    /// Person → institute, faculty or department.
    MemberOf,
    /// Person → offered expertise.
    Offers,
    /// Person → wanted expertise.
    Wants,
    /// Person → advisor (person).
    AdvisedBy,
}

impl Relationship {
    /// Relationship type used for the references of `field`.
    #[must_use]
    pub const fn for_field(field: MergeField) -> Self {
        match field {
            MergeField::Interests | MergeField::Roles => Self::Has,
            MergeField::Institutes | MergeField::Faculties | MergeField::Departments => {
                Self::MemberOf
            }
            MergeField::OfferedExpertise => Self::Offers,
            MergeField::WantedExpertise => Self::Wants,
        }
    }

    /// Graph relationship type name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Has => "HAS",
            Self::MemberOf => "MEMBER_OF",
            Self::Offers => "OFFERS",
            Self::Wants => "WANTS",
            Self::AdvisedBy => "ADVISED_BY",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scalar attributes of a person node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonAttributes {
    /// Title tokens, space separated; may be empty.
    pub title: String,
    /// Absent for stubs and blank cells.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Free text from the source row.
    pub comment: String,
}

/// A node as held by a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Derived from `kind` and `name`.
    pub id: NodeId,
    /// Node label.
    pub kind: NodeKind,
    /// Canonical name.
    pub name: String,
    /// Set for person nodes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<PersonAttributes>,
}

impl GraphNode {
    /// Creates a node with a derived id.
    #[must_use]
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: NodeId::derive(kind, &name),
            kind,
            name,
            attributes: None,
        }
    }
}

/// A typed, directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node.
    pub from: NodeId,
    /// Target node.
    pub to: NodeId,
    /// Edge type.
    pub relationship: Relationship,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_is_deterministic() {
        let a = NodeId::derive(NodeKind::Role, "Professor");
        let b = NodeId::derive(NodeKind::Role, "Professor");
        assert_eq!(a, b);
    }

    #[test]
    fn test_node_id_depends_on_kind_and_name() {
        let role = NodeId::derive(NodeKind::Role, "Professor");
        assert_ne!(role, NodeId::derive(NodeKind::Person, "Professor"));
        assert_ne!(role, NodeId::derive(NodeKind::Role, "professor"));
    }

    #[test]
    fn test_node_id_display() {
        let id = NodeId::derive(NodeKind::Faculty, "CS");
        assert!(id.to_string().contains('-'));
        assert_eq!(id.as_uuid().get_version_num(), 5);
    }

    #[test]
    fn test_node_kind_from_category() {
        assert_eq!(NodeKind::from(Category::Interest), NodeKind::ResearchInterest);
        assert_eq!(NodeKind::from(Category::Expertise), NodeKind::Expertise);
    }

    #[test]
    fn test_relationship_for_field() {
        assert_eq!(Relationship::for_field(MergeField::Interests), Relationship::Has);
        assert_eq!(Relationship::for_field(MergeField::Roles), Relationship::Has);
        assert_eq!(Relationship::for_field(MergeField::Faculties), Relationship::MemberOf);
        assert_eq!(Relationship::for_field(MergeField::OfferedExpertise), Relationship::Offers);
        assert_eq!(Relationship::for_field(MergeField::WantedExpertise), Relationship::Wants);
        assert_eq!(Relationship::AdvisedBy.label(), "ADVISED_BY");
    }

    #[test]
    fn test_relationship_serialization() {
        let json = serde_json::to_string(&Relationship::MemberOf).unwrap();
        assert_eq!(json, "\"MEMBER_OF\"");
    }

    #[test]
    fn test_node_serialization() {
        let node = GraphNode::new(NodeKind::Department, "ZIH");
        let json = serde_json::to_string(&node).unwrap();
        let back: GraphNode = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
        assert!(!json.contains("attributes"));
    }
}
