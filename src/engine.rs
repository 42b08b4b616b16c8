//! Pipeline engine.
//!
//! [`ExpertiseEngine`] owns the pools and the person collection for a whole
//! run and enforces the phase order: ingest every row, resolve advisors
//! once, merge, export.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::advisor::{self, AdvisorResolution};
use crate::config::EngineConfig;
use crate::error::{ExecutionError, ExpertiseError, ExpertiseResult};
use crate::export::{self, ExportSummary};
use crate::ingest::{IngestReport, IngestWarning, Ingested, RecordIngestor, RowRejection, SourceRow};
use crate::merge::{self, MergeField, MergeOutcome};
use crate::person::{Person, PersonIndex};
use crate::pool::Pools;
use crate::similarity::{SimilarityScorer, TextNormalizer, WhitespaceNormalizer};
use crate::storage::GraphSink;

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Rows may be ingested.
    Ingesting,
    /// Advisor mentions have been rewritten into person references.
    AdvisorsResolved,
    /// Every mergeable field has been merged at least once.
    Merged,
}

impl Phase {
    /// Returns a short stable identifier suitable for logging.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ingesting => "ingesting",
            Self::AdvisorsResolved => "advisors_resolved",
            Self::Merged => "merged",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Owns one run of the pipeline.
pub struct ExpertiseEngine {
    config: EngineConfig,
    ingestor: RecordIngestor,
    normalizer: Box<dyn TextNormalizer>,
    scorer: Box<dyn SimilarityScorer>,
    pools: Pools,
    persons: Vec<Person>,
    merged: HashSet<MergeField>,
    phase: Phase,
    rows_seen: usize,
}

impl fmt::Debug for ExpertiseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpertiseEngine")
            .field("phase", &self.phase)
            .field("persons", &self.persons.len())
            .field("rows_seen", &self.rows_seen)
            .field("scorer", &self.scorer.name())
            .finish_non_exhaustive()
    }
}

impl ExpertiseEngine {
    /// Creates an engine with the normalizer and scorer named by `config`.
    ///
    /// # Errors
    /// Returns a validation error if `config` is invalid.
    pub fn new(config: EngineConfig) -> ExpertiseResult<Self> {
        let scorer = config.similarity_metric.scorer();
        Self::with_capabilities(config, Box::new(WhitespaceNormalizer), scorer)
    }

    /// Creates an engine with injected text capabilities.
    ///
    /// # Errors
    /// Returns a validation error if `config` is invalid.
    pub fn with_capabilities(
        config: EngineConfig,
        normalizer: Box<dyn TextNormalizer>,
        scorer: Box<dyn SimilarityScorer>,
    ) -> ExpertiseResult<Self> {
        config.validate()?;
        let ingestor = RecordIngestor::new(&config)?;
        Ok(Self {
            config,
            ingestor,
            normalizer,
            scorer,
            pools: Pools::new(),
            persons: Vec::new(),
            merged: HashSet::new(),
            phase: Phase::Ingesting,
            rows_seen: 0,
        })
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// All persons, in ingestion order followed by synthesized advisors.
    #[must_use]
    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    /// Looks up a person.
    #[must_use]
    pub fn person(&self, index: PersonIndex) -> Option<&Person> {
        self.persons.get(index.get())
    }

    /// The value pools.
    #[must_use]
    pub const fn pools(&self) -> &Pools {
        &self.pools
    }

    fn require(&self, operation: &'static str, allowed: &[Phase]) -> Result<(), ExecutionError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(ExecutionError::PhaseViolation {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Ingests one row.
    ///
    /// # Errors
    /// - [`ExecutionError::PhaseViolation`] after advisor resolution
    /// - [`crate::ValidationError::MissingName`] if the row has no name; the
    ///   engine is left unchanged and the caller may continue
    pub fn ingest(&mut self, row: &SourceRow) -> ExpertiseResult<Ingested> {
        self.require("ingest", &[Phase::Ingesting])?;
        self.rows_seen += 1;
        let ingested = self.ingestor.ingest(
            row,
            self.normalizer.as_ref(),
            &mut self.pools,
            &mut self.persons,
        )?;
        for warning in &ingested.warnings {
            warn!(row = self.rows_seen, warning = %warning, "ingest warning");
        }
        Ok(ingested)
    }

    /// Ingests a batch, collecting rejected rows instead of aborting.
    ///
    /// Row numbers are 1-based and continue across batches.
    ///
    /// # Errors
    /// Aborts on any error that is not row-recoverable.
    pub fn ingest_batch<I>(&mut self, rows: I) -> ExpertiseResult<IngestReport>
    where
        I: IntoIterator<Item = SourceRow>,
    {
        self.require("ingest_batch", &[Phase::Ingesting])?;
        let mut report = IngestReport::default();
        for row in rows {
            match self.ingest(&row) {
                Ok(ingested) => {
                    report.accepted.push(ingested.person);
                    report
                        .warnings
                        .extend(ingested.warnings.into_iter().map(|kind| IngestWarning {
                            row: self.rows_seen,
                            kind,
                        }));
                }
                Err(err) if err.is_row_recoverable() => {
                    warn!(row = self.rows_seen, error = %err, "rejected row");
                    report.rejected.push(RowRejection {
                        row: self.rows_seen,
                        reason: rejection_reason(&err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        info!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            warnings = report.warnings.len(),
            "ingestion batch complete"
        );
        Ok(report)
    }

    /// Rewrites every advisor mention into a person reference.
    ///
    /// # Errors
    /// Returns [`ExecutionError::PhaseViolation`] unless called exactly once,
    /// after ingestion.
    pub fn resolve_advisors(&mut self) -> ExpertiseResult<AdvisorResolution> {
        self.require("resolve_advisors", &[Phase::Ingesting])?;
        let resolution = advisor::resolve_advisors(
            &mut self.persons,
            self.pools.mentions(),
            self.config.title_policy,
        )?;
        self.phase = Phase::AdvisorsResolved;
        Ok(resolution)
    }

    /// Merges near-duplicate values of one field.
    ///
    /// The engine reaches [`Phase::Merged`] once every field in
    /// [`MergeField::ALL`] has been merged.
    ///
    /// # Errors
    /// - [`ExecutionError::PhaseViolation`] before advisor resolution
    /// - [`ExecutionError::Similarity`] if the scorer fails; no reference is
    ///   rewritten in that case
    pub fn merge_category(&mut self, field: MergeField) -> ExpertiseResult<MergeOutcome> {
        self.require("merge_category", &[Phase::AdvisorsResolved, Phase::Merged])?;
        let outcome = merge::merge_category(
            &mut self.persons,
            &self.pools,
            field,
            self.scorer.as_ref(),
            self.config.similarity_threshold,
        )?;
        self.merged.insert(field);
        if self.pending_merges().is_empty() {
            self.phase = Phase::Merged;
        }
        Ok(outcome)
    }

    /// Fields not merged yet, in [`MergeField::ALL`] order.
    #[must_use]
    pub fn pending_merges(&self) -> Vec<MergeField> {
        MergeField::ALL
            .into_iter()
            .filter(|field| !self.merged.contains(field))
            .collect()
    }

    /// Merges every field, in [`MergeField::ALL`] order.
    ///
    /// # Errors
    /// As [`Self::merge_category`]; fields merged before a failure keep
    /// their rewrites.
    pub fn merge_all(&mut self) -> ExpertiseResult<Vec<MergeOutcome>> {
        MergeField::ALL
            .into_iter()
            .map(|field| self.merge_category(field))
            .collect()
    }

    /// Writes the graph into `sink`.
    ///
    /// # Errors
    /// - [`ExecutionError::PhaseViolation`] until every field is merged
    /// - any export error
    pub fn export(&self, sink: &dyn GraphSink) -> ExpertiseResult<ExportSummary> {
        self.require("export", &[Phase::Merged])?;
        Ok(export::export(&self.persons, &self.pools, sink)?)
    }

    /// Runs resolution, all merges and the export in order.
    ///
    /// # Errors
    /// Any error of the individual phases.
    pub fn finish(&mut self, sink: &dyn GraphSink) -> ExpertiseResult<RunSummary> {
        let resolution = self.resolve_advisors()?;
        let merges = self.merge_all()?;
        let export = self.export(sink)?;
        Ok(RunSummary {
            resolution,
            merges,
            export,
        })
    }
}

/// Outcome of [`ExpertiseEngine::finish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Advisor resolution counts and synthesized stubs.
    pub resolution: AdvisorResolution,
    /// One outcome per merged field, in merge order.
    pub merges: Vec<MergeOutcome>,
    /// Nodes and edges written.
    pub export: ExportSummary,
}

fn rejection_reason(err: &ExpertiseError) -> String {
    match err {
        ExpertiseError::Validation(inner) => inner.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::NodeKind;
    use crate::error::ValidationError;
    use crate::person::PersonOrigin;
    use crate::ingest::WarningKind;
    use crate::pool::Category;
    use crate::similarity::{ExactMatch, SimilarityError};
    use crate::storage::InMemoryGraphSink;

    fn row(name: &str, email: &str, advisor: &str) -> SourceRow {
        SourceRow::from_fields([name, email, "", "", advisor, "", "", "", ""]).unwrap()
    }

    fn engine() -> ExpertiseEngine {
        ExpertiseEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::AdvisorsResolved.to_string(), "advisors_resolved");
        let json = serde_json::to_string(&Phase::Merged).unwrap();
        assert_eq!(json, "\"merged\"");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            similarity_threshold: 1.5,
            ..EngineConfig::default()
        };
        let err = ExpertiseEngine::new(config).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_ingest_after_resolution_is_rejected() {
        let mut engine = engine();
        engine.ingest(&row("A B", "a@b.de", "")).unwrap();
        engine.resolve_advisors().unwrap();

        let err = engine.ingest(&row("C D", "c@d.de", "")).unwrap_err();
        assert!(matches!(
            err,
            ExpertiseError::Execution(ExecutionError::PhaseViolation {
                operation: "ingest",
                phase: Phase::AdvisorsResolved,
            })
        ));
        assert_eq!(engine.persons().len(), 1);
    }

    #[test]
    fn test_resolve_runs_once() {
        let mut engine = engine();
        engine.resolve_advisors().unwrap();
        assert!(engine.resolve_advisors().is_err());
    }

    #[test]
    fn test_merge_before_resolution_is_rejected() {
        let mut engine = engine();
        let err = engine.merge_category(MergeField::Interests).unwrap_err();
        assert!(err.is_execution());
        assert_eq!(engine.phase(), Phase::Ingesting);
    }

    #[test]
    fn test_export_before_resolution_is_rejected() {
        let engine = engine();
        let sink = InMemoryGraphSink::new();
        assert!(engine.export(&sink).is_err());
    }

    #[test]
    fn test_export_before_merge_is_rejected() {
        let mut engine = engine();
        let mut cells = ["A B", "a@b.de", "Data Science", "", "", "", "", "", ""];
        engine.ingest(&SourceRow::from_fields(cells).unwrap()).unwrap();
        cells[0] = "C D";
        cells[2] = "data science";
        engine.ingest(&SourceRow::from_fields(cells).unwrap()).unwrap();
        engine.resolve_advisors().unwrap();
        let sink = InMemoryGraphSink::new();

        let err = engine.export(&sink).unwrap_err();
        assert!(matches!(
            err,
            ExpertiseError::Execution(ExecutionError::PhaseViolation {
                operation: "export",
                phase: Phase::AdvisorsResolved,
            })
        ));

        engine.merge_category(MergeField::Interests).unwrap();
        assert_eq!(engine.phase(), Phase::AdvisorsResolved);
        assert_eq!(engine.pending_merges().len(), MergeField::ALL.len() - 1);
        assert!(engine.export(&sink).is_err());
        assert_eq!(sink.node_count().unwrap(), 0);

        engine.merge_all().unwrap();
        assert_eq!(engine.phase(), Phase::Merged);
        assert!(engine.pending_merges().is_empty());
        engine.export(&sink).unwrap();
        assert_eq!(sink.nodes_of_kind(NodeKind::ResearchInterest).unwrap().len(), 1);
    }

    #[test]
    fn test_entrant_without_email_is_not_stub() {
        let mut engine = engine();
        engine.ingest(&row("Jane Doe", "", "Prof. C D")).unwrap();
        engine.resolve_advisors().unwrap();

        let persons = engine.persons();
        assert_eq!(persons[0].email, None);
        assert_eq!(persons[0].origin(), PersonOrigin::Entrant);
        assert!(!persons[0].is_stub());
        assert!(persons[1].is_stub());
    }

    #[test]
    fn test_ingest_batch_collects_rejections() {
        let mut engine = engine();
        let report = engine
            .ingest_batch(vec![
                row("A B", "a@b.de", ""),
                row("Dr.", "x@y.de", ""),
                row("C D", "", ""),
            ])
            .unwrap();

        assert_eq!(report.accepted, vec![PersonIndex::new(0), PersonIndex::new(1)]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].row, 2);
        assert!(report.rejected[0].reason.contains("no name"));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].row, 3);
        assert_eq!(report.warnings[0].kind, WarningKind::MissingEmail);
        assert_eq!(report.rows(), 3);
    }

    #[test]
    fn test_row_numbers_continue_across_batches() {
        let mut engine = engine();
        engine.ingest_batch(vec![row("A B", "a@b.de", "")]).unwrap();
        let report = engine.ingest_batch(vec![row("", "", "")]).unwrap();
        assert_eq!(report.rejected[0].row, 2);
    }

    #[test]
    fn test_missing_name_leaves_engine_unchanged() {
        let mut engine = engine();
        let err = engine.ingest(&row("", "a@b.de", "Prof. C D")).unwrap_err();
        assert!(matches!(
            err,
            ExpertiseError::Validation(ValidationError::MissingName)
        ));
        assert!(engine.persons().is_empty());
        assert!(engine.pools().mentions().is_empty());
    }

    #[test]
    fn test_finish_runs_all_phases() {
        let mut engine = engine();
        engine.ingest(&row("Dr. A B", "a@b.de", "Prof. C D")).unwrap();
        let sink = InMemoryGraphSink::new();

        let summary = engine.finish(&sink).unwrap();

        assert_eq!(summary.resolution.synthesized, vec![PersonIndex::new(1)]);
        assert_eq!(summary.merges.len(), MergeField::ALL.len());
        assert_eq!(summary.export.persons, 2);
        assert_eq!(engine.phase(), Phase::Merged);
        assert_eq!(sink.edge_count().unwrap(), 1);
    }

    struct Failing;

    impl SimilarityScorer for Failing {
        fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
            Err(SimilarityError::Unscorable {
                left: a.to_string(),
                right: b.to_string(),
                reason: "offline".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_scorer_failure_aborts_merge() {
        let mut engine = ExpertiseEngine::with_capabilities(
            EngineConfig::default(),
            Box::new(WhitespaceNormalizer),
            Box::new(Failing),
        )
        .unwrap();
        let mut cells = ["A B", "a@b.de", "x, x", "", "", "", "", "", ""];
        engine.ingest(&SourceRow::from_fields(cells).unwrap()).unwrap();
        cells[0] = "C D";
        engine.ingest(&SourceRow::from_fields(cells).unwrap()).unwrap();
        engine.resolve_advisors().unwrap();

        let err = engine.merge_category(MergeField::Interests).unwrap_err();
        assert!(err.is_execution());
        assert_eq!(engine.phase(), Phase::AdvisorsResolved);
    }

    #[test]
    fn test_exact_scorer_merges_case_variants() {
        let mut engine = ExpertiseEngine::with_capabilities(
            EngineConfig::default(),
            Box::new(WhitespaceNormalizer),
            Box::new(ExactMatch),
        )
        .unwrap();
        let mut cells = ["A B", "a@b.de", "Robotics", "", "", "", "", "", ""];
        engine.ingest(&SourceRow::from_fields(cells).unwrap()).unwrap();
        cells[0] = "C D";
        cells[2] = "robotics";
        engine.ingest(&SourceRow::from_fields(cells).unwrap()).unwrap();
        engine.resolve_advisors().unwrap();

        let outcome = engine.merge_category(MergeField::Interests).unwrap();

        assert_eq!(outcome.rewritten, 1);
        assert_eq!(engine.persons()[1].interests, engine.persons()[0].interests);
        assert_eq!(engine.pools().pool(Category::Interest).len(), 2);
    }
}
