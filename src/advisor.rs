//! Advisor resolution.
//!
//! Rewrites every advisor mention into a reference to a person. A mention
//! matches the first person (in collection order) whose surname equals the
//! mention's surname, case-insensitively. Unmatched mentions become stub
//! persons, which are match candidates for every later mention in the pass.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TitlePolicy;
use crate::error::ValidationError;
use crate::person::{AdvisorMention, AdvisorRef, Person, PersonIndex};
use crate::pool::ValuePool;

/// Counters of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorResolution {
    /// Mentions rewritten to an already known person.
    pub matched: usize,
    /// Stub persons created, in creation order.
    pub synthesized: Vec<PersonIndex>,
    /// Persons whose title was replaced by a mention's title.
    pub titles_upgraded: usize,
}

impl AdvisorResolution {
    /// Total mentions resolved.
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.matched + self.synthesized.len()
    }
}

/// Surname lookup that keeps the first person seen per surname.
#[derive(Debug, Default)]
struct SurnameIndex {
    first_by_surname: HashMap<String, PersonIndex>,
}

impl SurnameIndex {
    fn build(persons: &[Person]) -> Self {
        let mut index = Self::default();
        for (i, person) in persons.iter().enumerate() {
            index.add(person, PersonIndex::new(i));
        }
        index
    }

    fn add(&mut self, person: &Person, at: PersonIndex) {
        if let Some(surname) = person.surname() {
            self.first_by_surname.entry(surname).or_insert(at);
        }
    }

    fn find(&self, mention: &AdvisorMention) -> Option<PersonIndex> {
        mention
            .surname()
            .and_then(|s| self.first_by_surname.get(&s).copied())
    }
}

/// Resolves all advisor mentions of all persons in place.
///
/// Persons are visited in collection order and each advisor list in its own
/// order; entries already resolved are left alone.
///
/// # Errors
/// Returns [`ValidationError::MissingName`] if an unmatched mention has no
/// name and so cannot become a person. Ingestion never stores such mentions.
pub fn resolve_advisors(
    persons: &mut Vec<Person>,
    mentions: &ValuePool<AdvisorMention>,
    policy: TitlePolicy,
) -> Result<AdvisorResolution, ValidationError> {
    let mut index = SurnameIndex::build(persons);
    let mut outcome = AdvisorResolution::default();

    // Stubs are appended past this bound and carry no advisors of their own.
    let entrants = persons.len();
    for owner in 0..entrants {
        for slot in 0..persons[owner].advisors.len() {
            let AdvisorRef::Mention(mention_idx) = persons[owner].advisors[slot] else {
                continue;
            };
            let mention = mentions.get(mention_idx);

            let target = if let Some(found) = index.find(mention) {
                let matched = &mut persons[found.get()];
                if policy.prefers(&matched.title, &mention.title) {
                    debug!(
                        person = %matched,
                        title = %mention.title,
                        "upgrading title from advisor mention"
                    );
                    matched.title.clone_from(&mention.title);
                    outcome.titles_upgraded += 1;
                }
                outcome.matched += 1;
                found
            } else {
                let stub = Person::from_mention(mention)?;
                persons.push(stub);
                let at = PersonIndex::new(persons.len() - 1);
                index.add(&persons[at.get()], at);
                debug!(stub = %persons[at.get()], at = %at, "synthesized advisor");
                outcome.synthesized.push(at);
                at
            };

            persons[owner].advisors[slot] = AdvisorRef::Person(target);
        }
    }

    info!(
        matched = outcome.matched,
        synthesized = outcome.synthesized.len(),
        titles_upgraded = outcome.titles_upgraded,
        "advisor resolution complete"
    );
    Ok(outcome)
}
