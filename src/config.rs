//! Engine configuration.
//!
//! Defaults reproduce the conventions of the competence-matrix spreadsheet.
//! A config can be loaded from JSON and selectively overridden by env vars.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::similarity::SimilarityMetric;

/// Default similarity threshold; a pair merges only if its score is strictly greater.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Env var overriding [`EngineConfig::similarity_threshold`].
pub const ENV_SIMILARITY_THRESHOLD: &str = "EXPERTISE_SIMILARITY_THRESHOLD";
/// Env var overriding [`EngineConfig::similarity_metric`].
pub const ENV_SIMILARITY_METRIC: &str = "EXPERTISE_SIMILARITY_METRIC";
/// Env var overriding [`EngineConfig::title_policy`].
pub const ENV_TITLE_POLICY: &str = "EXPERTISE_TITLE_POLICY";

/// Academic title tokens recognised by the name/title splitter.
pub const DEFAULT_TITLE_TOKENS: &[&str] = &[
    "dr.", "prof.", "rer.", "nat.", "med.", "phil.", "ing.", "habil.", "dipl.", "dipl.-ing.",
    "jun.", "apl.", "pd", "mult.", "h.c.",
];

/// What to do with a matched person's title when an advisor mention carries another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitlePolicy {
    /// Overwrite if the mention's title string has more characters.
    #[default]
    LongestString,
    /// Never touch the matched person's title.
    KeepExisting,
}

impl TitlePolicy {
    /// Parses a policy name as written in env vars.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "longest_string" => Some(Self::LongestString),
            "keep_existing" => Some(Self::KeepExisting),
            _ => None,
        }
    }

    /// Returns true if `candidate` should replace `current` under this policy.
    #[must_use]
    pub fn prefers(self, current: &str, candidate: &str) -> bool {
        match self {
            Self::LongestString => candidate.chars().count() > current.chars().count(),
            Self::KeepExisting => false,
        }
    }
}

/// Delimiter characters per column group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnDelimiters {
    /// Research interests column.
    pub interests: Vec<String>,
    /// Splits "Institute / Faculty / Department".
    pub affiliation: Vec<String>,
    /// Advisor column.
    pub advisors: Vec<String>,
    /// Role column.
    pub roles: Vec<String>,
    /// Offered and wanted expertise columns.
    pub expertise: Vec<String>,
}

impl Default for ColumnDelimiters {
    fn default() -> Self {
        let strings = |d: &[&str]| d.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        Self {
            interests: strings(&[",", ";"]),
            affiliation: strings(&["/", ","]),
            advisors: strings(&[",", "/"]),
            roles: strings(&[",", "/"]),
            expertise: strings(&[",", ";"]),
        }
    }
}

impl ColumnDelimiters {
    fn groups(&self) -> [(&'static str, &[String]); 5] {
        [
            ("interests", &self.interests),
            ("affiliation", &self.affiliation),
            ("advisors", &self.advisors),
            ("roles", &self.roles),
            ("expertise", &self.expertise),
        ]
    }
}

/// Configuration for an [`crate::engine::ExpertiseEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scores strictly above this value merge two entries.
    pub similarity_threshold: f64,
    /// Scorer used by every merge pass.
    pub similarity_metric: SimilarityMetric,
    /// Per-column split delimiters.
    pub delimiters: ColumnDelimiters,
    /// Compared case-insensitively.
    pub title_tokens: Vec<String>,
    /// How a later advisor mention may change a person's title.
    pub title_policy: TitlePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            similarity_metric: SimilarityMetric::default(),
            delimiters: ColumnDelimiters::default(),
            title_tokens: DEFAULT_TITLE_TOKENS.iter().map(|s| (*s).to_string()).collect(),
            title_policy: TitlePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidConfig`] on malformed JSON or
    /// on values rejected by [`EngineConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
            reason: format!("malformed config JSON: {e}"),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults with env overrides applied.
    ///
    /// # Errors
    /// Returns an error if an override is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::default().with_env_overrides()
    }

    /// Applies env overrides on top of `self`.
    ///
    /// # Errors
    /// Returns an error if an override is set but cannot be parsed.
    pub fn with_env_overrides(self) -> Result<Self, ValidationError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ValidationError> {
        if let Some(raw) = lookup(ENV_SIMILARITY_THRESHOLD) {
            self.similarity_threshold =
                raw.trim()
                    .parse::<f64>()
                    .map_err(|e| ValidationError::InvalidConfig {
                        reason: format!("invalid {ENV_SIMILARITY_THRESHOLD} '{raw}': {e}"),
                    })?;
        }
        if let Some(raw) = lookup(ENV_SIMILARITY_METRIC) {
            self.similarity_metric =
                SimilarityMetric::parse(&raw).ok_or_else(|| ValidationError::InvalidConfig {
                    reason: format!("unknown {ENV_SIMILARITY_METRIC} '{raw}'"),
                })?;
        }
        if let Some(raw) = lookup(ENV_TITLE_POLICY) {
            self.title_policy =
                TitlePolicy::parse(&raw).ok_or_else(|| ValidationError::InvalidConfig {
                    reason: format!("unknown {ENV_TITLE_POLICY} '{raw}'"),
                })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// - [`ValidationError::ThresholdOutOfRange`] if the threshold is not in `[0, 1]`.
    /// - [`ValidationError::InvalidConfig`] if a delimiter group is empty or holds an empty delimiter.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ValidationError::ThresholdOutOfRange {
                value: self.similarity_threshold,
            });
        }
        for (group, delimiters) in self.delimiters.groups() {
            if delimiters.is_empty() {
                return Err(ValidationError::InvalidConfig {
                    reason: format!("delimiter group '{group}' is empty"),
                });
            }
            if delimiters.iter().any(String::is_empty) {
                return Err(ValidationError::InvalidConfig {
                    reason: format!("delimiter group '{group}' contains an empty delimiter"),
                });
            }
        }
        Ok(())
    }
}
