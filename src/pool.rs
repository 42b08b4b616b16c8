//! Append-only value pools.
//!
//! Every distinct cell value is interned into a pool and referenced by a
//! [`PoolIndex`]. Pools never shrink and never overwrite a slot, so an index
//! is a stable identity for the whole run. Merging only rewrites the indices
//! held by persons; the pool contents stay untouched.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;
use crate::person::AdvisorMention;

/// Semantic category of a value pool.
///
/// Offered and wanted expertise share the [`Category::Expertise`] pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Research interests
    Interest,
    /// Institutes (first affiliation piece)
    Institute,
    /// Faculties (second affiliation piece)
    Faculty,
    /// Departments (remaining affiliation pieces)
    Department,
    /// Roles
    Role,
    /// Offered and wanted expertise
    Expertise,
}

impl Category {
    /// All text categories in a stable order.
    pub const ALL: [Self; 6] = [
        Self::Interest,
        Self::Institute,
        Self::Faculty,
        Self::Department,
        Self::Role,
        Self::Expertise,
    ];

    /// Returns a short stable identifier suitable for logging.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Interest => "interest",
            Self::Institute => "institute",
            Self::Faculty => "faculty",
            Self::Department => "department",
            Self::Role => "role",
            Self::Expertise => "expertise",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable position in a [`ValuePool`].
///
/// The type parameter ties the handle to the kind of value it addresses, so
/// an index into the advisor-mentions pool cannot be handed to a text pool.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolIndex<T> {
    index: usize,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> PoolIndex<T> {
    /// Wraps a raw position.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Returns the raw position.
    #[must_use]
    pub const fn get(self) -> usize {
        self.index
    }
}

impl<T> Clone for PoolIndex<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PoolIndex<T> {}

impl<T> PartialEq for PoolIndex<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for PoolIndex<T> {}

impl<T> std::hash::Hash for PoolIndex<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for PoolIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

impl<T> fmt::Display for PoolIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)
    }
}

/// Index into a text pool.
pub type TextIndex = PoolIndex<String>;

/// Index into the advisor-mentions pool.
pub type MentionIndex = PoolIndex<AdvisorMention>;

/// An append-only, index-addressed arena.
#[derive(Debug, Clone)]
pub struct ValuePool<T> {
    label: String,
    values: Vec<T>,
}

impl<T> ValuePool<T> {
    /// Creates an empty pool. The label is used in diagnostics only.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            values: Vec::new(),
        }
    }

    /// Appends a value and returns its permanent position.
    pub fn insert(&mut self, value: T) -> PoolIndex<T> {
        self.values.push(value);
        PoolIndex::new(self.values.len() - 1)
    }

    /// Returns the value at `index`.
    ///
    /// # Panics
    /// Panics if `index` was not produced by this pool. Every index handed out
    /// by [`ValuePool::insert`] stays valid, so this is always a defect.
    #[must_use]
    pub fn get(&self, index: PoolIndex<T>) -> &T {
        match self.values.get(index.get()) {
            Some(value) => value,
            None => panic!(
                "{} index {} out of range (len {})",
                self.label,
                index,
                self.values.len()
            ),
        }
    }

    /// Checked variant of [`ValuePool::get`].
    pub fn try_get(&self, index: PoolIndex<T>) -> Result<&T, ExecutionError> {
        self.values
            .get(index.get())
            .ok_or_else(|| ExecutionError::IndexOutOfRange {
                target: self.label.clone(),
                index: index.get(),
                len: self.values.len(),
            })
    }

    /// Number of slots ever appended.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing was ever appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Diagnostic label of this pool.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Iterates over `(index, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolIndex<T>, &T)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (PoolIndex::new(i), v))
    }
}

/// The full set of pools owned by one engine run.
#[derive(Debug, Clone)]
pub struct Pools {
    interests: ValuePool<String>,
    institutes: ValuePool<String>,
    faculties: ValuePool<String>,
    departments: ValuePool<String>,
    roles: ValuePool<String>,
    expertise: ValuePool<String>,
    mentions: ValuePool<AdvisorMention>,
}

impl Default for Pools {
    fn default() -> Self {
        Self {
            interests: ValuePool::new("interests pool"),
            institutes: ValuePool::new("institutes pool"),
            faculties: ValuePool::new("faculties pool"),
            departments: ValuePool::new("departments pool"),
            roles: ValuePool::new("roles pool"),
            expertise: ValuePool::new("expertise pool"),
            mentions: ValuePool::new("advisor mentions pool"),
        }
    }
}

impl Pools {
    /// Creates empty pools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the text pool for a category.
    #[must_use]
    pub fn pool(&self, category: Category) -> &ValuePool<String> {
        match category {
            Category::Interest => &self.interests,
            Category::Institute => &self.institutes,
            Category::Faculty => &self.faculties,
            Category::Department => &self.departments,
            Category::Role => &self.roles,
            Category::Expertise => &self.expertise,
        }
    }

    fn pool_mut(&mut self, category: Category) -> &mut ValuePool<String> {
        match category {
            Category::Interest => &mut self.interests,
            Category::Institute => &mut self.institutes,
            Category::Faculty => &mut self.faculties,
            Category::Department => &mut self.departments,
            Category::Role => &mut self.roles,
            Category::Expertise => &mut self.expertise,
        }
    }

    /// Appends `value` to the pool of `category`.
    pub fn insert(&mut self, category: Category, value: impl Into<String>) -> TextIndex {
        self.pool_mut(category).insert(value.into())
    }

    /// Returns the value at `index` in the pool of `category`.
    ///
    /// # Panics
    /// Panics on an index this pool never handed out.
    #[must_use]
    pub fn get(&self, category: Category, index: TextIndex) -> &str {
        self.pool(category).get(index)
    }

    /// Checked lookup used at the export boundary.
    pub fn try_get(&self, category: Category, index: TextIndex) -> Result<&str, ExecutionError> {
        self.pool(category).try_get(index).map(String::as_str)
    }

    /// Appends an advisor mention.
    pub fn insert_mention(&mut self, mention: AdvisorMention) -> MentionIndex {
        self.mentions.insert(mention)
    }

    /// Returns the advisor-mentions pool.
    #[must_use]
    pub fn mentions(&self) -> &ValuePool<AdvisorMention> {
        &self.mentions
    }
}
