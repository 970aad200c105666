//! Planner configuration loaded from TOML.
//!
//! Every table and field is optional; omitted values take the library
//! defaults. Unknown keys are rejected so typos surface instead of being
//! silently ignored.
//!
//! ```toml
//! parallelism = 4
//!
//! [tree]
//! expansion_width = 10
//!
//! [policy]
//! max_steps = 200
//! early_stop = 5
//! consistency_check = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use synthplan_search::error::SearchError;
use synthplan_search::policy::{SearchPolicy, TreeConfig};

/// Error loading or validating a [`PlannerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] SearchError),
    #[error("parallelism must be at least 1")]
    ZeroParallelism,
}

/// Complete planner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// Per-tree proposer settings.
    pub tree: TreeConfig,
    /// Driver budgets and filter thresholds.
    pub policy: SearchPolicy,
    /// Maximum number of targets searched concurrently in a batch.
    pub parallelism: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            tree: TreeConfig::default(),
            policy: SearchPolicy::default(),
            parallelism: 1,
        }
    }
}

impl PlannerConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys, and
    /// a validation error for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise as
    /// [`PlannerConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first failing section's error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tree.validate()?;
        self.policy.validate()?;
        if self.parallelism == 0 {
            return Err(ConfigError::ZeroParallelism);
        }
        Ok(())
    }
}
