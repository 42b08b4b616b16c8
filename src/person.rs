//! Person records and advisor references.
//!
//! A [`Person`] owns one ordered index list per category. Indices point into
//! the [`crate::pool::Pools`] of the same engine run. Advisor entries carry
//! their phase in the type: an [`AdvisorRef::Mention`] before resolution and
//! an [`AdvisorRef::Person`] afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::pool::{MentionIndex, TextIndex};

/// Position of a person in the engine's master collection.
///
/// Persons are only ever appended, so a `PersonIndex` never goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonIndex(usize);

impl PersonIndex {
    /// Wraps a raw position.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw position.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for PersonIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An advisor as it was written in a row, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorMention {
    /// Title tokens of the mention; may be empty.
    pub title: String,
    /// Name tokens of the mention.
    pub name: String,
}

impl AdvisorMention {
    /// Creates a mention from an already split title and name.
    #[must_use]
    pub fn new(title: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            name: name.into(),
        }
    }

    /// Lower-cased last name token, if the mention has a name.
    #[must_use]
    pub fn surname(&self) -> Option<String> {
        surname_of(&self.name)
    }
}

/// An entry of a person's advisor list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum AdvisorRef {
    /// Points into the advisor-mentions pool (before resolution).
    Mention(MentionIndex),
    /// Points into the person collection (after resolution).
    Person(PersonIndex),
}

impl AdvisorRef {
    /// Returns the resolved person, if this reference has been resolved.
    #[must_use]
    pub const fn as_person(self) -> Option<PersonIndex> {
        match self {
            Self::Person(idx) => Some(idx),
            Self::Mention(_) => None,
        }
    }

    /// Returns true if this reference still points at a mention.
    #[must_use]
    pub const fn is_unresolved(self) -> bool {
        matches!(self, Self::Mention(_))
    }
}

/// How a person entered the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonOrigin {
    /// Ingested from a source row.
    #[default]
    Entrant,
    /// Synthesized from an advisor mention that matched nobody.
    Stub,
}

/// A researcher, either entered directly or synthesized from an advisor mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Academic title tokens, space separated; may be empty.
    pub title: String,
    name: String,
    /// Absent for stubs and for entrants whose email cell was blank.
    pub email: Option<String>,
    /// Free-text comment cell.
    pub comment: String,
    origin: PersonOrigin,

    /// Research interests.
    pub interests: Vec<TextIndex>,
    /// Institutes (first affiliation piece).
    pub institutes: Vec<TextIndex>,
    /// Faculties (second affiliation piece).
    pub faculties: Vec<TextIndex>,
    /// Departments (remaining affiliation pieces).
    pub departments: Vec<TextIndex>,
    /// Advisors, mentions until resolution.
    pub advisors: Vec<AdvisorRef>,
    /// Roles.
    pub roles: Vec<TextIndex>,
    /// Expertise the person offers.
    pub offered_expertise: Vec<TextIndex>,
    /// Expertise the person is looking for.
    pub wanted_expertise: Vec<TextIndex>,
}

impl Person {
    /// Creates a person with empty reference lists.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingName`] if `name` is empty or blank.
    pub fn new(
        title: impl Into<String>,
        name: impl Into<String>,
        email: Option<String>,
        comment: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        Ok(Self {
            title: title.into(),
            name,
            email: email.filter(|e| !e.trim().is_empty()),
            comment: comment.into(),
            origin: PersonOrigin::Entrant,
            interests: Vec::new(),
            institutes: Vec::new(),
            faculties: Vec::new(),
            departments: Vec::new(),
            advisors: Vec::new(),
            roles: Vec::new(),
            offered_expertise: Vec::new(),
            wanted_expertise: Vec::new(),
        })
    }

    /// Creates a stub person from an unmatched advisor mention.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingName`] for a title-only mention.
    pub fn from_mention(mention: &AdvisorMention) -> Result<Self, ValidationError> {
        let mut stub = Self::new(mention.title.clone(), mention.name.clone(), None, String::new())?;
        stub.origin = PersonOrigin::Stub;
        Ok(stub)
    }

    /// The person's name without title.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased last token of the name.
    #[must_use]
    pub fn surname(&self) -> Option<String> {
        surname_of(&self.name)
    }

    /// How this person entered the collection.
    #[must_use]
    pub const fn origin(&self) -> PersonOrigin {
        self.origin
    }

    /// Returns true if this person was synthesized from an advisor mention.
    #[must_use]
    pub fn is_stub(&self) -> bool {
        self.origin == PersonOrigin::Stub
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} {}", self.title, self.name)
        }
    }
}

fn surname_of(name: &str) -> Option<String> {
    name.split_whitespace().last().map(str::to_lowercase)
}
