//! SMILES canonicalization contract.
//!
//! Chemistry-aware canonicalization (aromaticity perception, atom ranking)
//! lives outside this workspace. The search only depends on the
//! [`Canonicalizer`] trait; [`SyntaxCanonicalizer`] is a syntax-level default
//! that is sufficient for table-driven fixtures and boundary validation.

/// Model outputs that never count as a proposal.
///
/// `"CC"` is the placeholder the sequence model emits when decoding fails
/// to produce a parseable molecule.
pub const EXCLUDED_OUTPUTS: [&str; 2] = ["", "CC"];

/// Result of canonicalizing one SMILES string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonicalized {
    /// Canonical form (or the trimmed input when invalid).
    pub smiles: String,
    /// Whether the input parsed.
    pub is_valid: bool,
}

impl Canonicalized {
    fn invalid(smiles: &str) -> Self {
        Self {
            smiles: smiles.to_string(),
            is_valid: false,
        }
    }
}

/// Trait for SMILES canonicalizers.
///
/// Implementations must be deterministic: the same input always maps to the
/// same output, and canonicalizing a canonical string returns it unchanged.
pub trait Canonicalizer: Send + Sync {
    /// Canonicalize a (possibly multi-fragment) SMILES string.
    fn canonicalize(&self, smiles: &str) -> Canonicalized;
}

/// Syntax-level canonicalizer.
///
/// Accepts a string when every dot-separated fragment is non-empty, uses only
/// SMILES characters, starts with an atom, and has balanced `()` and `[]`
/// (brackets do not nest). Fragments are sorted so that reactant order does
/// not affect identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxCanonicalizer;

impl Canonicalizer for SyntaxCanonicalizer {
    fn canonicalize(&self, smiles: &str) -> Canonicalized {
        let trimmed = smiles.trim();
        if trimmed.is_empty() {
            return Canonicalized::invalid(trimmed);
        }

        let mut fragments: Vec<&str> = trimmed.split('.').collect();
        if !fragments.iter().all(|f| fragment_is_valid(f)) {
            return Canonicalized::invalid(trimmed);
        }
        fragments.sort_unstable();

        Canonicalized {
            smiles: fragments.join("."),
            is_valid: true,
        }
    }
}

fn is_smiles_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '(' | ')' | '[' | ']' | '=' | '#' | '$' | ':' | '/' | '\\' | '@' | '+' | '-' | '%'
                | '*' | '~'
        )
}

fn fragment_is_valid(fragment: &str) -> bool {
    let Some(first) = fragment.chars().next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '[' || first == '*') {
        return false;
    }

    let mut paren_depth = 0usize;
    let mut in_bracket = false;
    for c in fragment.chars() {
        if !is_smiles_char(c) {
            return false;
        }
        match c {
            '[' if in_bracket => return false,
            '[' => in_bracket = true,
            ']' if !in_bracket => return false,
            ']' => in_bracket = false,
            '(' if !in_bracket => paren_depth += 1,
            ')' if !in_bracket => {
                if paren_depth == 0 {
                    return false;
                }
                paren_depth -= 1;
            }
            _ => {}
        }
    }
    paren_depth == 0 && !in_bracket
}
