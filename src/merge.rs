//! Similarity merging.
//!
//! Collapses near-duplicate pool entries of one field by rewriting the
//! indices persons hold. The first occurrence (in person order, then list
//! order) of a concept becomes canonical. Each later entry is compared with
//! the canonical keys in insertion order and takes the first key whose score
//! is strictly above the threshold. There is no best-match search.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ExecutionError;
use crate::person::Person;
use crate::pool::{Category, Pools, TextIndex};
use crate::similarity::{checked_score, SimilarityError, SimilarityScorer};

/// A mergeable per-person index list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeField {
    /// `Person::interests`.
    Interests,
    /// `Person::institutes`.
    Institutes,
    /// `Person::faculties`.
    Faculties,
    /// `Person::departments`.
    Departments,
    /// `Person::roles`.
    Roles,
    /// `Person::offered_expertise`.
    OfferedExpertise,
    /// `Person::wanted_expertise`; merged apart from offered expertise.
    WantedExpertise,
}

impl MergeField {
    /// Every mergeable field, in merge order.
    pub const ALL: [Self; 7] = [
        Self::Interests,
        Self::Institutes,
        Self::Faculties,
        Self::Departments,
        Self::Roles,
        Self::OfferedExpertise,
        Self::WantedExpertise,
    ];

    /// Pool the field's indices point into.
    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::Interests => Category::Interest,
            Self::Institutes => Category::Institute,
            Self::Faculties => Category::Faculty,
            Self::Departments => Category::Department,
            Self::Roles => Category::Role,
            Self::OfferedExpertise | Self::WantedExpertise => Category::Expertise,
        }
    }

    /// The field's list on `person`.
    #[must_use]
    pub fn indices(self, person: &Person) -> &[TextIndex] {
        match self {
            Self::Interests => &person.interests,
            Self::Institutes => &person.institutes,
            Self::Faculties => &person.faculties,
            Self::Departments => &person.departments,
            Self::Roles => &person.roles,
            Self::OfferedExpertise => &person.offered_expertise,
            Self::WantedExpertise => &person.wanted_expertise,
        }
    }

    fn indices_mut(self, person: &mut Person) -> &mut Vec<TextIndex> {
        match self {
            Self::Interests => &mut person.interests,
            Self::Institutes => &mut person.institutes,
            Self::Faculties => &mut person.faculties,
            Self::Departments => &mut person.departments,
            Self::Roles => &mut person.roles,
            Self::OfferedExpertise => &mut person.offered_expertise,
            Self::WantedExpertise => &mut person.wanted_expertise,
        }
    }

    /// Returns a short stable identifier suitable for logging.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Interests => "interests",
            Self::Institutes => "institutes",
            Self::Faculties => "faculties",
            Self::Departments => "departments",
            Self::Roles => "roles",
            Self::OfferedExpertise => "offered_expertise",
            Self::WantedExpertise => "wanted_expertise",
        }
    }
}

impl fmt::Display for MergeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered mapping from comparison text to canonical index.
///
/// Scoped to a single merge call; a fresh map gives an independent pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalMap {
    entries: Vec<(String, TextIndex)>,
}

impl CanonicalMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical index of the first key scoring above `threshold`.
    ///
    /// # Errors
    /// Propagates scorer failures.
    pub fn find(
        &self,
        text: &str,
        scorer: &dyn SimilarityScorer,
        threshold: f64,
    ) -> Result<Option<TextIndex>, SimilarityError> {
        for (key, canonical) in &self.entries {
            if checked_score(scorer, key, text)? > threshold {
                return Ok(Some(*canonical));
            }
        }
        Ok(None)
    }

    /// Records `text` as a new canonical key.
    pub fn insert(&mut self, text: String, index: TextIndex) {
        self.entries.push((text, index));
    }

    /// Canonical indices in insertion order.
    pub fn canonical(&self) -> impl Iterator<Item = TextIndex> + '_ {
        self.entries.iter().map(|(_, idx)| *idx)
    }

    /// Number of canonical entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no key was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of merging one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Field that was merged.
    pub field: MergeField,
    /// References visited.
    pub references: usize,
    /// Canonical indices in first-seen order.
    pub canonical: Vec<TextIndex>,
    /// References that now point at a different index than before.
    pub rewritten: usize,
}

/// Comparison form of a pool value.
#[must_use]
pub fn comparison_text(value: &str) -> String {
    value.to_lowercase()
}

/// Merges `field` across all `persons`, accumulating keys into `map`.
///
/// Rewrites are applied only once every score has been computed, so a
/// failing scorer leaves all persons untouched.
///
/// # Errors
/// Returns [`ExecutionError::Similarity`] if the scorer fails.
pub fn merge_with_map(
    persons: &mut [Person],
    pools: &Pools,
    field: MergeField,
    scorer: &dyn SimilarityScorer,
    threshold: f64,
    map: &mut CanonicalMap,
) -> Result<MergeOutcome, ExecutionError> {
    let category = field.category();
    let mut rewrites: Vec<(usize, usize, TextIndex)> = Vec::new();
    let mut references = 0;

    for (p, person) in persons.iter().enumerate() {
        for (slot, &index) in field.indices(person).iter().enumerate() {
            references += 1;
            let text = comparison_text(pools.get(category, index));
            match map.find(&text, scorer, threshold)? {
                Some(canonical) => {
                    if canonical != index {
                        rewrites.push((p, slot, canonical));
                    }
                }
                None => map.insert(text, index),
            }
        }
    }

    for &(p, slot, canonical) in &rewrites {
        field.indices_mut(&mut persons[p])[slot] = canonical;
    }

    let outcome = MergeOutcome {
        field,
        references,
        canonical: map.canonical().collect(),
        rewritten: rewrites.len(),
    };
    info!(
        field = %field,
        scorer = scorer.name(),
        references = outcome.references,
        canonical = outcome.canonical.len(),
        rewritten = outcome.rewritten,
        "merge complete"
    );
    Ok(outcome)
}

/// Merges `field` across all `persons` with a fresh [`CanonicalMap`].
///
/// # Errors
/// Returns [`ExecutionError::Similarity`] if the scorer fails.
pub fn merge_category(
    persons: &mut [Person],
    pools: &Pools,
    field: MergeField,
    scorer: &dyn SimilarityScorer,
    threshold: f64,
) -> Result<MergeOutcome, ExecutionError> {
    let mut map = CanonicalMap::new();
    merge_with_map(persons, pools, field, scorer, threshold, &mut map)
}
