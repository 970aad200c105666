//! Tree configuration and search policy types.
//!
//! Both structs deserialize with every field defaulted so a partial TOML
//! table (or none at all) yields a usable configuration. Validation is a
//! separate pre-flight step returning [`SearchError`].

use serde::{Deserialize, Serialize};
use serde_json::json;
use synthplan_kernel::digest::canon::{canonical_json_bytes, to_micros, CanonError};
use synthplan_kernel::digest::hash::{canonical_hash, ContentHash, HashDomain};

use crate::error::SearchError;

/// Immutable per-tree configuration forwarded to the reaction proposer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    /// Candidate reactions requested per retro expansion.
    pub expansion_width: usize,
    /// Candidate products requested per forward consistency check.
    pub check_width: usize,
    /// Maximum single-step decode length.
    pub max_decode_steps: usize,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            expansion_width: 20,
            check_width: 20,
            max_decode_steps: 150,
            temperature: 1.0,
        }
    }
}

impl TreeConfig {
    /// Validate field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidTreeConfig`] for a zero width, zero
    /// decode length, or a temperature that is not finite and positive.
    pub fn validate(&self) -> Result<(), SearchError> {
        let fail = |detail: &str| {
            Err(SearchError::InvalidTreeConfig {
                detail: detail.into(),
            })
        };
        if self.expansion_width == 0 {
            return fail("expansion_width must be at least 1");
        }
        if self.check_width == 0 {
            return fail("check_width must be at least 1");
        }
        if self.max_decode_steps == 0 {
            return fail("max_decode_steps must be at least 1");
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return fail("temperature must be finite and positive");
        }
        Ok(())
    }

    /// Integer-only JSON echo for audit artifacts.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        json!({
            "expansion_width": self.expansion_width,
            "check_width": self.check_width,
            "max_decode_steps": self.max_decode_steps,
            "temperature_micros": to_micros(self.temperature),
        })
    }

    /// Content hash of the canonical JSON echo.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = canonical_json_bytes(&self.to_json_value())?;
        Ok(canonical_hash(HashDomain::TreeConfig, &bytes))
    }
}

/// Driver budgets and candidate filter thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchPolicy {
    /// Hard cap on expansion steps.
    pub max_steps: u64,
    /// Stop once solved and more than `n` steps have run.
    ///
    /// `Some(0)` stops on the first solution. `None` spends the whole budget.
    pub early_stop: Option<u64>,
    /// Candidates with a raw probability below this are discarded.
    pub lower_bound: f64,
    /// Run the forward consistency check on retained candidates.
    pub consistency_check: bool,
    /// Minimum forward probability of the expanding molecule.
    pub check_lower_bound: f64,
    /// Number of top candidates passed to `SearchObserver::on_step`.
    pub top_k_report: usize,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            max_steps: 100,
            early_stop: Some(0),
            lower_bound: 0.1,
            consistency_check: true,
            check_lower_bound: 0.01,
            top_k_report: 5,
        }
    }
}

impl SearchPolicy {
    /// Validate field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] if either probability threshold
    /// lies outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), SearchError> {
        for (name, value) in [
            ("lower_bound", self.lower_bound),
            ("check_lower_bound", self.check_lower_bound),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SearchError::InvalidPolicy {
                    detail: format!("{name} must lie in [0, 1], got {value}"),
                });
            }
        }
        Ok(())
    }

    /// The filter thresholds carried by this policy.
    #[must_use]
    pub fn filter(&self) -> FilterPolicy {
        FilterPolicy {
            lower_bound: self.lower_bound,
            consistency_check: self.consistency_check,
            check_lower_bound: self.check_lower_bound,
        }
    }

    /// Whether the driver should stop after `steps_done` expansions given the
    /// current solved state.
    #[must_use]
    pub fn should_stop_early(&self, solved: bool, steps_done: u64) -> bool {
        match self.early_stop {
            Some(n) => solved && steps_done > n,
            None => false,
        }
    }

    /// Integer-only JSON echo for audit artifacts.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        json!({
            "max_steps": self.max_steps,
            "early_stop": self.early_stop,
            "lower_bound_micros": to_micros(self.lower_bound),
            "consistency_check": self.consistency_check,
            "check_lower_bound_micros": to_micros(self.check_lower_bound),
            "top_k_report": self.top_k_report,
        })
    }

    /// Content hash of the canonical JSON echo.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = canonical_json_bytes(&self.to_json_value())?;
        Ok(canonical_hash(HashDomain::SearchPolicy, &bytes))
    }
}

/// Thresholds consumed by [`crate::filter::filter_candidates`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterPolicy {
    /// Primary lower bound on raw proposal probability.
    pub lower_bound: f64,
    /// Whether the forward consistency check runs.
    pub consistency_check: bool,
    /// Consistency threshold on the forward probability.
    pub check_lower_bound: f64,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        SearchPolicy::default().filter()
    }
}
