//! Dot-encoded reactant sets.
//!
//! A proposal for one molecule is a single string in which the reactants are
//! joined with `.` (e.g. `"CC(=O)O.OCC"`). Empty segments produced by leading,
//! trailing or doubled separators are dropped.

/// Separator between reactants in a reaction string.
pub const REACTANT_SEPARATOR: char = '.';

/// Split a reaction string into its reactant SMILES, preserving order.
///
/// Empty segments are skipped, so `"A..B."` yields `["A", "B"]` and `""`
/// yields an empty list.
#[must_use]
pub fn split_reactants(reaction: &str) -> Vec<String> {
    reaction
        .split(REACTANT_SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join reactant SMILES back into a reaction string.
#[must_use]
pub fn join_reactants<S: AsRef<str>>(reactants: &[S]) -> String {
    let mut out = String::new();
    for (i, r) in reactants.iter().enumerate() {
        if i > 0 {
            out.push(REACTANT_SEPARATOR);
        }
        out.push_str(r.as_ref());
    }
    out
}
