//! Text normalization and similarity scoring.
//!
//! The pipeline only needs two capabilities from text processing:
//! `normalize(text)` and `similarity(a, b)`. Both are traits so callers can
//! plug in their own scorer. The defaults here are deterministic and offline.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a similarity scorer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimilarityError {
    /// The scorer could not produce a score for this pair.
    #[error("cannot score '{left}' against '{right}': {reason}")]
    Unscorable {
        /// Left operand.
        left: String,
        /// Right operand.
        right: String,
        /// Backend-specific reason.
        reason: String,
    },

    /// The scorer produced a value outside `[0.0, 1.0]`.
    #[error("score {score} is outside [0.0, 1.0]")]
    OutOfRange {
        /// The offending score.
        score: f64,
    },
}

/// Normalizes a raw piece of text before it is stored in a pool.
pub trait TextNormalizer: Send + Sync {
    /// Returns the normalized form of `text`.
    fn normalize(&self, text: &str) -> String;
}

/// Scores how similar two strings are.
///
/// Implementations must be reflexive (`similarity(x, x) == 1.0`) and
/// symmetric. Scores are in `[0.0, 1.0]`.
pub trait SimilarityScorer: Send + Sync {
    /// Scores `a` against `b`.
    fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError>;

    /// Short stable name for logs.
    fn name(&self) -> &'static str;
}

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"))
}

/// Collapses whitespace runs to one space and trims. Case is preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceNormalizer;

impl TextNormalizer for WhitespaceNormalizer {
    fn normalize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        whitespace_re().replace_all(text, " ").trim().to_string()
    }
}

/// `1 - levenshtein(a, b) / max(len(a), len(b))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLevenshtein;

impl SimilarityScorer for NormalizedLevenshtein {
    fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
        Ok(strsim::normalized_levenshtein(a, b))
    }

    fn name(&self) -> &'static str {
        "levenshtein"
    }
}

/// Jaro-Winkler similarity; favours shared prefixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl SimilarityScorer for JaroWinkler {
    fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
        // strsim scores two empty strings as 0.0; keep the scorer reflexive.
        if a == b {
            return Ok(1.0);
        }
        Ok(strsim::jaro_winkler(a, b))
    }

    fn name(&self) -> &'static str {
        "jaro_winkler"
    }
}

/// 1.0 for identical strings, 0.0 otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl SimilarityScorer for ExactMatch {
    fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
        Ok(if a == b { 1.0 } else { 0.0 })
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

/// Built-in scorer selection, used by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// [`NormalizedLevenshtein`]
    #[default]
    Levenshtein,
    /// [`JaroWinkler`]
    JaroWinkler,
    /// [`ExactMatch`]
    Exact,
}

impl SimilarityMetric {
    /// Instantiates the scorer for this metric.
    #[must_use]
    pub fn scorer(self) -> Box<dyn SimilarityScorer> {
        match self {
            Self::Levenshtein => Box::new(NormalizedLevenshtein),
            Self::JaroWinkler => Box::new(JaroWinkler),
            Self::Exact => Box::new(ExactMatch),
        }
    }

    /// Parses a metric name as written in env vars.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "levenshtein" => Some(Self::Levenshtein),
            "jaro_winkler" | "jarowinkler" => Some(Self::JaroWinkler),
            "exact" => Some(Self::Exact),
            _ => None,
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Levenshtein => write!(f, "levenshtein"),
            Self::JaroWinkler => write!(f, "jaro_winkler"),
            Self::Exact => write!(f, "exact"),
        }
    }
}

/// Scores `a` against `b` and rejects out-of-range results.
pub(crate) fn checked_score(
    scorer: &dyn SimilarityScorer,
    a: &str,
    b: &str,
) -> Result<f64, SimilarityError> {
    let score = scorer.similarity(a, b)?;
    if !(0.0..=1.0).contains(&score) {
        return Err(SimilarityError::OutOfRange { score });
    }
    Ok(score)
}
