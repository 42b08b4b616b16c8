//! Record ingestion.
//!
//! Turns one source row into a [`Person`] and appends every cell value to its
//! pool. Nothing is deduplicated here; equal values get separate slots and are
//! unified later by the merge pass.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::person::{AdvisorMention, AdvisorRef, Person, PersonIndex};
use crate::pool::{Category, Pools, TextIndex};
use crate::similarity::TextNormalizer;
use crate::split::{FieldSplitter, TitleSplitter};

/// Columns of a source row, in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceColumn {
    /// Full name, possibly prefixed by titles.
    Name,
    /// Contact email.
    Email,
    /// Research interests.
    Interests,
    /// `institute / faculty / department` groups.
    Affiliation,
    /// Advisors as `title name` entries.
    Advisor,
    /// Roles held.
    Role,
    /// Expertise the person offers.
    OfferedExpertise,
    /// Expertise the person is looking for.
    WantedExpertise,
    /// Free text, kept verbatim.
    Comment,
}

impl SourceColumn {
    /// Number of columns a row must have.
    pub const COUNT: usize = 9;

    /// Position of this column in a row.
    #[must_use]
    pub const fn position(self) -> usize {
        match self {
            Self::Name => 0,
            Self::Email => 1,
            Self::Interests => 2,
            Self::Affiliation => 3,
            Self::Advisor => 4,
            Self::Role => 5,
            Self::OfferedExpertise => 6,
            Self::WantedExpertise => 7,
            Self::Comment => 8,
        }
    }
}

/// One row of raw cell text with a validated column count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    fields: Vec<String>,
}

impl SourceRow {
    /// Builds a row from its cells.
    ///
    /// # Errors
    /// Returns [`ValidationError::ColumnCount`] unless exactly
    /// [`SourceColumn::COUNT`] cells are given.
    pub fn from_fields<I, S>(fields: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.len() != SourceColumn::COUNT {
            return Err(ValidationError::ColumnCount {
                expected: SourceColumn::COUNT,
                actual: fields.len(),
            });
        }
        Ok(Self { fields })
    }

    /// Returns the raw cell of `column`.
    #[must_use]
    pub fn get(&self, column: SourceColumn) -> &str {
        &self.fields[column.position()]
    }
}

/// Non-fatal observation made while ingesting a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum WarningKind {
    /// The row has no email address.
    MissingEmail,
    /// The email cell does not look like an address.
    MalformedEmail {
        /// The cell content.
        email: String,
    },
    /// An advisor entry held only title tokens and was dropped.
    TitleOnlyAdvisor {
        /// The dropped entry.
        entry: String,
    },
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEmail => write!(f, "missing email"),
            Self::MalformedEmail { email } => write!(f, "malformed email '{email}'"),
            Self::TitleOnlyAdvisor { entry } => write!(f, "advisor '{entry}' has no name"),
        }
    }
}

/// A warning tied to its row number (1-based, counted across batches).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestWarning {
    /// Row number.
    pub row: usize,
    /// What was wrong.
    pub kind: WarningKind,
}

/// A row that could not be ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRejection {
    /// Row number.
    pub row: usize,
    /// Rendered error.
    pub reason: String,
}

/// Audit trail of a batch ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Persons created, in row order.
    pub accepted: Vec<PersonIndex>,
    /// Rows that were skipped.
    pub rejected: Vec<RowRejection>,
    /// Warnings from accepted rows.
    pub warnings: Vec<IngestWarning>,
}

impl IngestReport {
    /// Total rows seen.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }

    /// Returns true if every row was accepted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Result of ingesting one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    /// The new person.
    pub person: PersonIndex,
    /// Warnings raised while reading the row.
    pub warnings: Vec<WarningKind>,
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex is valid")
    })
}

/// Returns true if `email` has the shape `local@domain.tld`.
#[must_use]
pub fn looks_like_email(email: &str) -> bool {
    email_re().is_match(email)
}

/// Splits rows and wires persons to pool indices.
#[derive(Debug, Clone)]
pub struct RecordIngestor {
    interests: FieldSplitter,
    affiliation: FieldSplitter,
    advisors: FieldSplitter,
    roles: FieldSplitter,
    expertise: FieldSplitter,
    titles: TitleSplitter,
}

impl RecordIngestor {
    /// Compiles the splitters described by `config`.
    ///
    /// # Errors
    /// Returns an error if a delimiter set is invalid.
    pub fn new(config: &EngineConfig) -> Result<Self, ValidationError> {
        let d = &config.delimiters;
        Ok(Self {
            interests: FieldSplitter::new(&d.interests)?,
            affiliation: FieldSplitter::new(&d.affiliation)?,
            advisors: FieldSplitter::new(&d.advisors)?,
            roles: FieldSplitter::new(&d.roles)?,
            expertise: FieldSplitter::new(&d.expertise)?,
            titles: TitleSplitter::new(&config.title_tokens),
        })
    }

    /// Ingests `row`, appending to `pools` and `persons`.
    ///
    /// Nothing is appended anywhere if the row is rejected.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingName`] if the name cell has no name tokens.
    pub fn ingest(
        &self,
        row: &SourceRow,
        normalizer: &dyn TextNormalizer,
        pools: &mut Pools,
        persons: &mut Vec<Person>,
    ) -> Result<Ingested, ValidationError> {
        let mut warnings = Vec::new();

        let (title, name) = self.titles.split_title(row.get(SourceColumn::Name));
        let email = normalizer.normalize(row.get(SourceColumn::Email));
        if email.is_empty() {
            warnings.push(WarningKind::MissingEmail);
        } else if !looks_like_email(&email) {
            warnings.push(WarningKind::MalformedEmail {
                email: email.clone(),
            });
        }
        let comment = row.get(SourceColumn::Comment).to_string();

        let mut person = Person::new(title, name, Some(email), comment)?;

        person.interests = insert_all(
            pools,
            Category::Interest,
            normalizer,
            self.interests.split(row.get(SourceColumn::Interests)),
        );

        let affiliation = self
            .affiliation
            .split_affiliation(row.get(SourceColumn::Affiliation));
        person.institutes = insert_all(
            pools,
            Category::Institute,
            normalizer,
            affiliation.institute,
        );
        person.faculties = insert_all(pools, Category::Faculty, normalizer, affiliation.faculty);
        person.departments = insert_all(
            pools,
            Category::Department,
            normalizer,
            affiliation.departments,
        );

        for entry in self.advisors.split(row.get(SourceColumn::Advisor)) {
            let (title, name) = self.titles.split_title(&normalizer.normalize(&entry));
            if name.is_empty() {
                warnings.push(WarningKind::TitleOnlyAdvisor { entry });
                continue;
            }
            let idx = pools.insert_mention(AdvisorMention::new(title, name));
            person.advisors.push(AdvisorRef::Mention(idx));
        }

        person.roles = insert_all(
            pools,
            Category::Role,
            normalizer,
            self.roles.split(row.get(SourceColumn::Role)),
        );
        person.offered_expertise = insert_all(
            pools,
            Category::Expertise,
            normalizer,
            self.expertise.split(row.get(SourceColumn::OfferedExpertise)),
        );
        person.wanted_expertise = insert_all(
            pools,
            Category::Expertise,
            normalizer,
            self.expertise.split(row.get(SourceColumn::WantedExpertise)),
        );

        debug!(
            person = %person,
            interests = person.interests.len(),
            advisors = person.advisors.len(),
            roles = person.roles.len(),
            "ingested row"
        );

        persons.push(person);
        Ok(Ingested {
            person: PersonIndex::new(persons.len() - 1),
            warnings,
        })
    }
}

fn insert_all(
    pools: &mut Pools,
    category: Category,
    normalizer: &dyn TextNormalizer,
    pieces: impl IntoIterator<Item = String>,
) -> Vec<TextIndex> {
    pieces
        .into_iter()
        .map(|piece| normalizer.normalize(&piece))
        .filter(|value| !value.is_empty())
        .map(|value| pools.insert(category, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::WhitespaceNormalizer;

    fn row(cells: [&str; 9]) -> SourceRow {
        SourceRow::from_fields(cells).unwrap()
    }

    fn ingest(cells: [&str; 9]) -> (Result<Ingested, ValidationError>, Pools, Vec<Person>) {
        let ingestor = RecordIngestor::new(&EngineConfig::default()).unwrap();
        let mut pools = Pools::new();
        let mut persons = Vec::new();
        let result = ingestor.ingest(&row(cells), &WhitespaceNormalizer, &mut pools, &mut persons);
        (result, pools, persons)
    }

    #[test]
    fn test_row_column_count() {
        let err = SourceRow::from_fields(["a", "b"]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ColumnCount {
                expected: 9,
                actual: 2
            }
        );
    }

    #[test]
    fn test_affiliation_goes_to_three_pools() {
        let (result, pools, persons) =
            ingest(["Jane Doe", "j@x.org", "", "TU X / CS / ZIH", "", "", "", "", ""]);
        result.unwrap();
        let person = &persons[0];

        assert_eq!(pools.pool(Category::Institute).len(), 1);
        assert_eq!(pools.pool(Category::Faculty).len(), 1);
        assert_eq!(pools.pool(Category::Department).len(), 1);
        assert_eq!(person.institutes.len(), 1);
        assert_eq!(person.faculties.len(), 1);
        assert_eq!(person.departments.len(), 1);
        assert_eq!(pools.get(Category::Institute, person.institutes[0]), "TU X");
        assert_eq!(pools.get(Category::Faculty, person.faculties[0]), "CS");
        assert_eq!(pools.get(Category::Department, person.departments[0]), "ZIH");
    }

    #[test]
    fn test_missing_name_rejected_without_side_effects() {
        let (result, pools, persons) =
            ingest(["Dr. rer. nat.", "j@x.org", "ML", "I / F", "Prof. C D", "R", "p", "w", ""]);
        assert_eq!(result.unwrap_err(), ValidationError::MissingName);
        assert!(persons.is_empty());
        assert!(pools.pool(Category::Interest).is_empty());
        assert!(pools.mentions().is_empty());
    }

    #[test]
    fn test_expertise_shares_pool() {
        let (result, pools, persons) =
            ingest(["A B", "a@b.de", "", "", "", "", "p1, p2", "w1", ""]);
        result.unwrap();
        assert_eq!(pools.pool(Category::Expertise).len(), 3);
        assert_eq!(persons[0].offered_expertise.len(), 2);
        assert_eq!(persons[0].wanted_expertise.len(), 1);
        assert_eq!(persons[0].wanted_expertise[0].get(), 2);
    }

    #[test]
    fn test_pieces_are_normalized() {
        let (result, pools, persons) =
            ingest(["A B", "a@b.de", "  data   science ;x", "", "", "", "", "", ""]);
        result.unwrap();
        assert_eq!(
            pools.get(Category::Interest, persons[0].interests[0]),
            "data science"
        );
    }

    #[test]
    fn test_advisor_mentions() {
        let (result, pools, persons) = ingest([
            "A B",
            "a@b.de",
            "",
            "",
            "Prof. C D / Dr. E F",
            "",
            "",
            "",
            "",
        ]);
        result.unwrap();
        assert_eq!(persons[0].advisors.len(), 2);
        assert!(persons[0].advisors.iter().all(|a| a.is_unresolved()));
        let AdvisorRef::Mention(first) = persons[0].advisors[0] else {
            panic!("expected mention");
        };
        assert_eq!(pools.mentions().get(first), &AdvisorMention::new("Prof.", "C D"));
    }

    #[test]
    fn test_title_only_advisor_dropped_with_warning() {
        let (result, pools, persons) = ingest(["A B", "a@b.de", "", "", "Prof.", "", "", "", ""]);
        let ingested = result.unwrap();
        assert!(persons[0].advisors.is_empty());
        assert!(pools.mentions().is_empty());
        assert_eq!(
            ingested.warnings,
            vec![WarningKind::TitleOnlyAdvisor {
                entry: "Prof.".to_string()
            }]
        );
    }

    #[test]
    fn test_email_warnings() {
        let (result, _, persons) = ingest(["A B", "", "", "", "", "", "", "", ""]);
        assert_eq!(result.unwrap().warnings, vec![WarningKind::MissingEmail]);
        assert_eq!(persons[0].email, None);

        let (result, _, persons) = ingest(["A B", "not-an-email", "", "", "", "", "", "", ""]);
        assert_eq!(
            result.unwrap().warnings,
            vec![WarningKind::MalformedEmail {
                email: "not-an-email".to_string()
            }]
        );
        assert_eq!(persons[0].email.as_deref(), Some("not-an-email"));
    }

    #[test]
    fn test_comment_kept_verbatim() {
        let (result, _, persons) =
            ingest(["A B", "a@b.de", "", "", "", "", "", "", "  see notes, p. 3 "]);
        result.unwrap();
        assert_eq!(persons[0].comment, "  see notes, p. 3 ");
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("jane.doe@tu-x.de"));
        assert!(!looks_like_email("jane.doe"));
        assert!(!looks_like_email("jane@doe"));
        assert!(!looks_like_email("a b@c.de"));
    }
}
