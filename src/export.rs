//! Graph export.
//!
//! Writes resolved persons and their references into a [`GraphSink`]. Person
//! nodes are keyed by name without title; every other node by the exact
//! canonical pool value. Persons sharing a name share a node, which keeps
//! the attributes of the first of them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::Phase;
use crate::entity::{NodeId, NodeKind, PersonAttributes, Relationship};
use crate::error::ExecutionError;
use crate::merge::MergeField;
use crate::person::{AdvisorRef, Person};
use crate::pool::Pools;
use crate::storage::GraphSink;

/// Counters of one export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Persons exported, including those that folded into an existing node.
    pub persons: usize,
    /// `connect` calls issued. A sink may hold fewer edges if some repeat.
    pub relationships: usize,
}

/// Exports `persons` into `sink`.
///
/// All person nodes are created before any relationship, so advisor edges
/// can point at persons later in the collection.
///
/// # Errors
/// - [`ExecutionError::PhaseViolation`] if an advisor mention is unresolved
/// - [`ExecutionError::IndexOutOfRange`] if a reference points outside its pool
///   or the person collection
/// - [`ExecutionError::Sink`] if the sink fails
pub fn export(
    persons: &[Person],
    pools: &Pools,
    sink: &dyn GraphSink,
) -> Result<ExportSummary, ExecutionError> {
    let mut nodes = Vec::with_capacity(persons.len());
    let mut seen = HashSet::with_capacity(persons.len());
    for person in persons {
        let node = sink.get_or_create_entity(NodeKind::Person, person.name())?;
        nodes.push(node);
        if !seen.insert(node) {
            warn!(
                person = %person,
                email = person.email.as_deref().unwrap_or(""),
                "duplicate person name, keeping attributes of the first"
            );
            continue;
        }
        sink.set_person_attributes(
            node,
            PersonAttributes {
                title: person.title.clone(),
                email: person.email.clone(),
                comment: person.comment.clone(),
            },
        )?;
    }

    let mut summary = ExportSummary {
        persons: persons.len(),
        relationships: 0,
    };

    for (person, &from) in persons.iter().zip(&nodes) {
        for field in MergeField::ALL {
            let category = field.category();
            let kind = NodeKind::from(category);
            let relationship = Relationship::for_field(field);
            for &index in field.indices(person) {
                let value = pools.try_get(category, index)?;
                let to = sink.get_or_create_entity(kind, value)?;
                sink.connect(from, to, relationship)?;
                summary.relationships += 1;
            }
        }

        for advisor in &person.advisors {
            let to = advisor_node(*advisor, &nodes)?;
            sink.connect(from, to, Relationship::AdvisedBy)?;
            summary.relationships += 1;
        }
        debug!(person = %person, "exported person");
    }

    info!(
        persons = summary.persons,
        relationships = summary.relationships,
        "export complete"
    );
    Ok(summary)
}

fn advisor_node(advisor: AdvisorRef, nodes: &[NodeId]) -> Result<NodeId, ExecutionError> {
    match advisor {
        AdvisorRef::Person(target) => {
            nodes
                .get(target.get())
                .copied()
                .ok_or_else(|| ExecutionError::IndexOutOfRange {
                    target: "persons".to_string(),
                    index: target.get(),
                    len: nodes.len(),
                })
        }
        AdvisorRef::Mention(_) => Err(ExecutionError::PhaseViolation {
            operation: "export",
            phase: Phase::Ingesting,
        }),
    }
}
