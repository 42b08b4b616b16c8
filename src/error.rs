//! Error types for the expertise graph pipeline.
//!
//! All errors are strongly typed using thiserror. Row-level validation
//! failures are recoverable per row; execution errors abort the run.

use thiserror::Error;

use crate::engine::Phase;
use crate::similarity::SimilarityError;
use crate::storage::StorageError;

/// Validation errors that occur while checking input rows or configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A record without a name cannot become a Person.
    #[error("Record has no name")]
    MissingName,

    /// A row must have exactly one cell per source column.
    #[error("Row has {actual} columns, expected {expected}")]
    ColumnCount {
        /// Required number of cells.
        expected: usize,
        /// Cells found.
        actual: usize,
    },

    /// The merge threshold must lie in [0.0, 1.0].
    #[error("Similarity threshold {value} is out of range [0.0, 1.0]")]
    ThresholdOutOfRange {
        /// The rejected threshold.
        value: f64,
    },

    /// A configuration value is unusable.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with it.
        reason: String,
    },
}

/// Execution errors raised by the resolution, merge and export phases.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Operations run in a fixed order.
    #[error("Operation '{operation}' is not allowed in phase {phase}")]
    PhaseViolation {
        /// The operation attempted.
        operation: &'static str,
        /// The phase the engine was in.
        phase: Phase,
    },

    /// A person referenced a pool or person slot that does not exist.
    #[error("Index {index} is out of range for {target} (len {len})")]
    IndexOutOfRange {
        /// The pool or list indexed.
        target: String,
        /// The bad index.
        index: usize,
        /// Its length.
        len: usize,
    },

    /// A scorer failed during a merge.
    #[error("Similarity scoring failed: {0}")]
    Similarity(#[from] SimilarityError),

    /// The graph sink rejected a write.
    #[error("Sink error: {0}")]
    Sink(#[from] StorageError),
}

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum ExpertiseError {
    /// Bad input or configuration.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A pipeline phase failed.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

impl ExpertiseError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if the caller may skip the offending row and continue
    /// the batch. Everything else aborts the run.
    #[must_use]
    pub const fn is_row_recoverable(&self) -> bool {
        matches!(self, Self::Validation(ValidationError::MissingName))
    }
}

impl From<StorageError> for ExpertiseError {
    fn from(err: StorageError) -> Self {
        Self::Execution(ExecutionError::Sink(err))
    }
}

impl From<SimilarityError> for ExpertiseError {
    fn from(err: SimilarityError) -> Self {
        Self::Execution(ExecutionError::Similarity(err))
    }
}

/// Result type alias for pipeline operations.
pub type ExpertiseResult<T> = Result<T, ExpertiseError>;
