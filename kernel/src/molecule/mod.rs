//! Molecule-level primitives: reactant strings, canonicalization, terminal sets.

pub mod canonical;
pub mod reactants;
pub mod terminal;
