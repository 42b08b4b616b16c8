//! Cell splitting.
//!
//! A spreadsheet cell may hold several values separated by any of a set of
//! delimiter characters. Cells made only of hyphens and whitespace count as
//! empty and yield nothing.

use std::collections::HashSet;

use regex::Regex;

use crate::config::DEFAULT_TITLE_TOKENS;
use crate::error::ValidationError;

/// Returns true if `cell` holds no value once hyphens are removed.
#[must_use]
pub fn is_empty_cell(cell: &str) -> bool {
    cell.chars().all(|c| c == '-' || c.is_whitespace())
}

/// Builds an alternation pattern that matches any of `delimiters` literally.
#[must_use]
pub fn delimiter_pattern<S: AsRef<str>>(delimiters: &[S]) -> String {
    delimiters
        .iter()
        .map(|d| regex::escape(d.as_ref()))
        .collect::<Vec<_>>()
        .join("|")
}

/// Splits cells on a fixed delimiter set.
#[derive(Debug, Clone)]
pub struct FieldSplitter {
    pattern: Regex,
}

impl FieldSplitter {
    /// Compiles a splitter for `delimiters`.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidConfig`] if the delimiter set is empty
    /// or contains an empty delimiter.
    pub fn new<S: AsRef<str>>(delimiters: &[S]) -> Result<Self, ValidationError> {
        if delimiters.is_empty() || delimiters.iter().any(|d| d.as_ref().is_empty()) {
            return Err(ValidationError::InvalidConfig {
                reason: "delimiter set must be non-empty and hold non-empty delimiters"
                    .to_string(),
            });
        }
        let pattern = Regex::new(&delimiter_pattern(delimiters)).map_err(|e| {
            ValidationError::InvalidConfig {
                reason: format!("invalid delimiter pattern: {e}"),
            }
        })?;
        Ok(Self { pattern })
    }

    /// Splits `cell` into trimmed pieces, keeping blank pieces so positions
    /// stay meaningful. An empty cell yields no pieces at all.
    #[must_use]
    pub fn split_positional(&self, cell: &str) -> Vec<String> {
        if is_empty_cell(cell) {
            return Vec::new();
        }
        self.pattern
            .split(cell)
            .map(|piece| piece.trim().to_string())
            .collect()
    }

    /// Splits `cell` into trimmed, non-blank pieces in order.
    #[must_use]
    pub fn split(&self, cell: &str) -> Vec<String> {
        self.split_positional(cell)
            .into_iter()
            .filter(|piece| !is_empty_cell(piece))
            .collect()
    }

    /// Splits an "Institute / Faculty / Department..." cell.
    #[must_use]
    pub fn split_affiliation(&self, cell: &str) -> Affiliation {
        let keep = |piece: String| (!is_empty_cell(&piece)).then_some(piece);

        let mut pieces = self.split_positional(cell).into_iter();
        let institute = pieces.next().and_then(keep);
        let faculty = pieces.next().and_then(keep);
        let departments = pieces.filter_map(keep).collect();
        Affiliation {
            institute,
            faculty,
            departments,
        }
    }
}

/// Splits `cell` on `delimiters`.
///
/// # Errors
/// Returns an error if the delimiter set is invalid.
pub fn split<S: AsRef<str>>(cell: &str, delimiters: &[S]) -> Result<Vec<String>, ValidationError> {
    Ok(FieldSplitter::new(delimiters)?.split(cell))
}

/// The positional pieces of an affiliation cell.
///
/// A blank piece leaves its slot empty without shifting later pieces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Affiliation {
    /// First piece.
    pub institute: Option<String>,
    /// Second piece.
    pub faculty: Option<String>,
    /// Every later non-blank piece.
    pub departments: Vec<String>,
}

/// Separates academic title tokens from name tokens.
///
/// Every whitespace token is classified on its own against a closed,
/// case-insensitive token set. A name token that happens to equal a title
/// token is classified as title.
#[derive(Debug, Clone)]
pub struct TitleSplitter {
    tokens: HashSet<String>,
}

impl Default for TitleSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE_TOKENS.iter().copied())
    }
}

impl TitleSplitter {
    /// Creates a splitter recognising `tokens`.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Splits `full_name` into `(title, name)`.
    ///
    /// Anything from the first `" ("` onwards is dropped.
    #[must_use]
    pub fn split_title(&self, full_name: &str) -> (String, String) {
        let head = full_name
            .find(" (")
            .map_or(full_name, |cut| &full_name[..cut]);

        let mut title = Vec::new();
        let mut name = Vec::new();
        for token in head.split_whitespace() {
            if self.tokens.contains(&token.to_lowercase()) {
                title.push(token);
            } else {
                name.push(token);
            }
        }
        (title.join(" "), name.join(" "))
    }
}

/// Splits `full_name` with the default title tokens.
#[must_use]
pub fn split_title(full_name: &str) -> (String, String) {
    TitleSplitter::default().split_title(full_name)
}
