use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid ratio for {field}: {value} (must be in (0, 1])")]
    Ratio { field: &'static str, value: f64 },
    #[error("Invalid {tier} tier: min_count={min_count}, fallback_count={fallback_count}")]
    Tier {
        tier: &'static str,
        min_count: usize,
        fallback_count: usize,
    },
    #[error("Strict tier must not be looser than the relaxed tier")]
    StrictLooserThanRelaxed,
}

/// Which lines are pooled before one consensus decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// All passes over a single source image.
    #[default]
    PerImage,
    /// Every line of a whole batch of images.
    Batch,
}

impl From<bool> for Scope {
    /// `true` selects per-image scope.
    fn from(per_image: bool) -> Self {
        if per_image {
            Scope::PerImage
        } else {
            Scope::Batch
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::PerImage => write!(f, "per-image"),
            Scope::Batch => write!(f, "batch"),
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per-image" | "per_image" | "image" => Ok(Scope::PerImage),
            "batch" | "global" => Ok(Scope::Batch),
            other => Err(format!("Unknown scope: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    #[default]
    Relaxed,
    Strict,
}

impl From<bool> for Strictness {
    fn from(strict: bool) -> Self {
        if strict {
            Strictness::Strict
        } else {
            Strictness::Relaxed
        }
    }
}

/// Observation counts a candidate needs before it is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tier {
    /// Needed when the candidate belongs to the dominant prefix.
    pub min_count: usize,
    /// Needed when no dominant prefix emerged.
    pub fallback_count: usize,
}

impl Tier {
    fn validate(&self, name: &'static str) -> Result<(), PolicyError> {
        if self.min_count == 0 || self.fallback_count < self.min_count {
            return Err(PolicyError::Tier {
                tier: name,
                min_count: self.min_count,
                fallback_count: self.fallback_count,
            });
        }
        Ok(())
    }
}

/// Thresholds driving the consensus decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PolicyTable")]
pub struct ConsensusPolicy {
    /// Share of distinct candidates a prefix needs to dominate a per-image pool.
    pub per_image_ratio: f64,
    /// Same, for a batch-wide pool.
    pub batch_ratio: f64,
    pub relaxed: Tier,
    pub strict: Tier,
}

impl Default for ConsensusPolicy {
    fn default() -> Self {
        Self {
            per_image_ratio: 0.5,
            batch_ratio: 0.6,
            relaxed: Tier { min_count: 2, fallback_count: 4 },
            strict: Tier { min_count: 3, fallback_count: 5 },
        }
    }
}

/// `[policy]` as written in a config file: every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PolicyTable {
    per_image_ratio: Option<f64>,
    batch_ratio: Option<f64>,
    relaxed: TierTable,
    strict: TierTable,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TierTable {
    min_count: Option<usize>,
    fallback_count: Option<usize>,
}

impl TierTable {
    fn or(self, default: Tier) -> Tier {
        Tier {
            min_count: self.min_count.unwrap_or(default.min_count),
            fallback_count: self.fallback_count.unwrap_or(default.fallback_count),
        }
    }
}

impl From<PolicyTable> for ConsensusPolicy {
    fn from(table: PolicyTable) -> Self {
        let defaults = ConsensusPolicy::default();
        Self {
            per_image_ratio: table.per_image_ratio.unwrap_or(defaults.per_image_ratio),
            batch_ratio: table.batch_ratio.unwrap_or(defaults.batch_ratio),
            relaxed: table.relaxed.or(defaults.relaxed),
            strict: table.strict.or(defaults.strict),
        }
    }
}

impl ConsensusPolicy {
    pub fn dominance_ratio(&self, scope: Scope) -> f64 {
        match scope {
            Scope::PerImage => self.per_image_ratio,
            Scope::Batch => self.batch_ratio,
        }
    }

    pub fn tier(&self, strictness: Strictness) -> Tier {
        match strictness {
            Strictness::Relaxed => self.relaxed,
            Strictness::Strict => self.strict,
        }
    }

    /// Reject values that would make the decision meaningless, or let strict
    /// mode accept something relaxed mode would not.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (field, value) in [
            ("per_image_ratio", self.per_image_ratio),
            ("batch_ratio", self.batch_ratio),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(PolicyError::Ratio { field, value });
            }
        }
        self.relaxed.validate("relaxed")?;
        self.strict.validate("strict")?;
        if self.strict.min_count < self.relaxed.min_count
            || self.strict.fallback_count < self.relaxed.fallback_count
        {
            return Err(PolicyError::StrictLooserThanRelaxed);
        }
        Ok(())
    }
}

/// File-level settings: default flags plus the policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub strict: bool,
    pub scope: Scope,
    pub policy: ConsensusPolicy,
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, PolicyError> {
        let settings: Settings = toml::from_str(content)?;
        settings.policy.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn strictness(&self) -> Strictness {
        Strictness::from(self.strict)
    }
}
