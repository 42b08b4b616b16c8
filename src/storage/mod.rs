//! Graph sinks.
//!
//! The trait in [`traits`] is the export boundary; [`memory`] provides a
//! thread-safe in-memory implementation.

mod memory;
mod traits;

pub use memory::{GraphSnapshot, InMemoryGraphSink};
pub use traits::{GraphSink, StorageError};
