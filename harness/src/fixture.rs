//! Scenario fixtures: table-driven collaborators and targets in one JSON file.
//!
//! ```json
//! {
//!   "terminals": ["O=C=O", "Oc1ccccc1"],
//!   "default_value": 1.0,
//!   "values": { "O=C(O)c1ccccc1O": 0.5 },
//!   "retro": { "O=C(O)c1ccccc1O": [{ "smiles": "O=C=O.Oc1ccccc1", "probability": 0.8 }] },
//!   "forward": { "O=C=O.Oc1ccccc1": [{ "smiles": "O=C(O)c1ccccc1O", "probability": 0.9 }] },
//!   "targets": [{ "name": "salicylic", "smiles": "O=C(O)c1ccccc1O" }]
//! }
//! ```
//!
//! Every SMILES key and terminal is canonicalized on load, so fixtures may
//! list fragments in any order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use synthplan_kernel::digest::canon::{canonical_json_bytes, to_micros, CanonError};
use synthplan_kernel::digest::hash::{canonical_hash, ContentHash, HashDomain};
use synthplan_kernel::molecule::canonical::Canonicalizer;
use synthplan_kernel::molecule::terminal::TerminalSet;

/// Error loading a [`ScenarioFixture`].
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("read fixture {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse fixture: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid fixture: {detail}")]
    Invalid { detail: String },
}

/// One proposal row in a retro or forward table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableEntry {
    pub smiles: String,
    pub probability: f64,
}

/// A named molecule to plan for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    pub name: String,
    pub smiles: String,
}

impl TargetSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, smiles: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            smiles: smiles.into(),
        }
    }
}

fn default_value() -> f64 {
    1.0
}

/// Table-driven scenario: terminals, cost estimates, proposal tables, targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFixture {
    #[serde(default)]
    pub terminals: Vec<String>,
    /// Estimated cost for molecules absent from `values`.
    #[serde(default = "default_value")]
    pub default_value: f64,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
    /// Product SMILES to ranked reactant-set proposals.
    #[serde(default)]
    pub retro: BTreeMap<String, Vec<TableEntry>>,
    /// Reactant-set SMILES to ranked product proposals.
    #[serde(default)]
    pub forward: BTreeMap<String, Vec<TableEntry>>,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

impl ScenarioFixture {
    /// Parse a fixture from JSON text, canonicalize its keys and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Parse`] for malformed JSON and
    /// [`FixtureError::Invalid`] for invalid SMILES or out-of-range numbers.
    pub fn from_json_str(text: &str, canonicalizer: &dyn Canonicalizer) -> Result<Self, FixtureError> {
        let raw: Self = serde_json::from_str(text)?;
        raw.canonicalized(canonicalizer)
    }

    /// Read a fixture file.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Read`] if the file cannot be read, otherwise as
    /// [`ScenarioFixture::from_json_str`].
    pub fn load(path: &Path, canonicalizer: &dyn Canonicalizer) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, canonicalizer)
    }

    fn canonicalized(self, canonicalizer: &dyn Canonicalizer) -> Result<Self, FixtureError> {
        let canon = |smiles: &str| -> Result<String, FixtureError> {
            let c = canonicalizer.canonicalize(smiles);
            if c.is_valid {
                Ok(c.smiles)
            } else {
                Err(FixtureError::Invalid {
                    detail: format!("invalid SMILES {smiles:?}"),
                })
            }
        };
        check_cost("default_value", self.default_value)?;

        let terminals = self
            .terminals
            .iter()
            .map(|s| canon(s))
            .collect::<Result<Vec<_>, _>>()?;
        let mut values = BTreeMap::new();
        for (smiles, value) in &self.values {
            check_cost(smiles, *value)?;
            values.insert(canon(smiles)?, *value);
        }
        let mut tables = [BTreeMap::new(), BTreeMap::new()];
        for (table, raw) in tables.iter_mut().zip([&self.retro, &self.forward]) {
            for (key, entries) in raw {
                for entry in entries {
                    if !entry.probability.is_finite() || entry.probability < 0.0 {
                        return Err(FixtureError::Invalid {
                            detail: format!(
                                "probability {} for {key:?} -> {:?} is not a finite non-negative number",
                                entry.probability, entry.smiles
                            ),
                        });
                    }
                }
                table.insert(canon(key)?, entries.clone());
            }
        }
        let [retro, forward] = tables;

        let mut seen = std::collections::BTreeSet::new();
        for target in &self.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(FixtureError::Invalid {
                    detail: format!("duplicate target name {:?}", target.name),
                });
            }
        }

        Ok(Self {
            terminals,
            default_value: self.default_value,
            values,
            retro,
            forward,
            targets: self.targets,
        })
    }

    /// The terminal molecules as a lookup set.
    #[must_use]
    pub fn terminal_set(&self) -> TerminalSet {
        self.terminals.iter().cloned().collect()
    }

    /// Look up a target by name.
    #[must_use]
    pub fn target(&self, name: &str) -> Option<&TargetSpec> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// JSON form with probabilities and costs as micro-units.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        let table = |t: &BTreeMap<String, Vec<TableEntry>>| -> Value {
            t.iter()
                .map(|(k, entries)| {
                    let rows: Vec<Value> = entries
                        .iter()
                        .map(|e| json!({"probability_micros": to_micros(e.probability), "smiles": e.smiles}))
                        .collect();
                    (k.clone(), Value::Array(rows))
                })
                .collect::<serde_json::Map<_, _>>()
                .into()
        };
        json!({
            "default_value_micros": to_micros(self.default_value),
            "forward": table(&self.forward),
            "retro": table(&self.retro),
            "targets": self.targets.iter().map(|t| json!({"name": t.name, "smiles": t.smiles})).collect::<Vec<_>>(),
            "terminals": self.terminals,
            "values": self.values.iter().map(|(k, v)| (k.clone(), json!(to_micros(*v)))).collect::<serde_json::Map<_, _>>(),
        })
    }

    /// Content hash binding a search outcome to the fixture it ran against.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = canonical_json_bytes(&self.to_json_value())?;
        Ok(canonical_hash(HashDomain::ScenarioFixture, &bytes))
    }
}

fn check_cost(what: &str, value: f64) -> Result<(), FixtureError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FixtureError::Invalid {
            detail: format!("value {value} for {what:?} is not a finite non-negative cost"),
        })
    }
}
