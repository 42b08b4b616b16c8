//! # expertise-graph
//!
//! Turns flat researcher records into a deduplicated graph of persons and the
//! things they are related to: research interests, affiliations, roles,
//! offered and wanted expertise, and advisors.
//!
//! ## Core Concepts
//!
//! - **Pool**: append-only, index-addressed store of values for one category
//! - **Person**: a researcher holding index lists into the pools
//! - **Mention**: an advisor's (title, name) as entered, before resolution
//! - **Canonical index**: the pool position all equivalent references point
//!   to after merging
//!
//! ## Usage
//!
//! ```rust
//! use expertise_graph::{EngineConfig, ExpertiseEngine, InMemoryGraphSink, SourceRow};
//!
//! let mut engine = ExpertiseEngine::new(EngineConfig::default())?;
//! let row = SourceRow::from_fields([
//!     "Dr. A B", "a@b.de", "x, y", "I / F / D", "Prof. C D",
//!     "Researcher, Professor", "p1,p2", "--", "",
//! ])?;
//! engine.ingest(&row)?;
//!
//! let sink = InMemoryGraphSink::new();
//! engine.finish(&sink)?;
//! assert_eq!(engine.persons().len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod config;
pub mod entity;
pub mod error;
pub mod person;
pub mod pool;
pub mod similarity;
pub mod split;

// Pipeline phases
pub mod advisor;
pub mod engine;
pub mod export;
pub mod ingest;
pub mod merge;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use advisor::{resolve_advisors, AdvisorResolution};
pub use config::{ColumnDelimiters, EngineConfig, TitlePolicy};
pub use engine::{ExpertiseEngine, Phase, RunSummary};
pub use entity::{GraphEdge, GraphNode, NodeId, NodeKind, PersonAttributes, Relationship};
pub use error::{ExecutionError, ExpertiseError, ExpertiseResult, ValidationError};
pub use export::{export, ExportSummary};
pub use ingest::{
    IngestReport, IngestWarning, Ingested, RecordIngestor, RowRejection, SourceColumn, SourceRow,
    WarningKind,
};
pub use merge::{merge_category, CanonicalMap, MergeField, MergeOutcome};
pub use person::{AdvisorMention, AdvisorRef, Person, PersonIndex, PersonOrigin};
pub use pool::{Category, MentionIndex, PoolIndex, Pools, TextIndex, ValuePool};
pub use similarity::{
    ExactMatch, JaroWinkler, NormalizedLevenshtein, SimilarityError, SimilarityMetric,
    SimilarityScorer, TextNormalizer, WhitespaceNormalizer,
};
pub use split::{split, split_title, Affiliation, FieldSplitter, TitleSplitter};
pub use storage::{GraphSink, GraphSnapshot, InMemoryGraphSink, StorageError};
