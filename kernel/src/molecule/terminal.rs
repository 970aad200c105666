//! Read-only set of purchasable (terminal) molecules.
//!
//! The set is loaded once before search begins and shared by reference across
//! every search tree; nothing mutates it afterwards.

use std::collections::HashSet;
use std::io::BufRead;

/// Error parsing a terminal-molecule list.
#[derive(Debug, thiserror::Error)]
pub enum TerminalSetError {
    /// Underlying reader failed.
    #[error("I/O error reading terminal molecules: {0}")]
    Io(#[from] std::io::Error),
    /// CSV header has no `mol` column.
    #[error("CSV header has no `mol` column: {header}")]
    MissingMolColumn { header: String },
    /// A CSV row has fewer columns than the header's `mol` index.
    #[error("line {line_number}: row is missing the `mol` column")]
    ShortRow { line_number: usize },
}

/// Membership set of canonical SMILES deemed purchasable.
#[derive(Debug, Clone, Default)]
pub struct TerminalSet {
    molecules: HashSet<String>,
}

impl TerminalSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `smiles` is a terminal molecule.
    #[must_use]
    pub fn contains(&self, smiles: &str) -> bool {
        self.molecules.contains(smiles)
    }

    /// Number of terminal molecules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    /// Parse a terminal list from a reader.
    ///
    /// Two layouts are accepted:
    /// - CSV with a header row containing a `mol` column (other columns ignored,
    ///   surrounding double quotes stripped);
    /// - one SMILES per line, optionally preceded by a bare `mol` header.
    ///
    /// Blank lines are skipped in both layouts.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalSetError`] on I/O failure, a CSV header without a
    /// `mol` column, or a row too short to contain it.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, TerminalSetError> {
        let mut lines = reader.lines();
        let mut molecules = HashSet::new();

        let Some(header) = lines.next().transpose()? else {
            return Ok(Self { molecules });
        };
        let header = header.trim().to_string();

        let mol_column = if header.contains(',') {
            let idx = header
                .split(',')
                .position(|col| unquote(col) == "mol")
                .ok_or_else(|| TerminalSetError::MissingMolColumn {
                    header: header.clone(),
                })?;
            Some(idx)
        } else {
            if !header.is_empty() && header != "mol" {
                molecules.insert(header);
            }
            None
        };

        for (offset, line) in lines.enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match mol_column {
                Some(idx) => {
                    let cell = line.split(',').nth(idx).ok_or(TerminalSetError::ShortRow {
                        line_number: offset + 2,
                    })?;
                    let smiles = unquote(cell);
                    if !smiles.is_empty() {
                        molecules.insert(smiles.to_string());
                    }
                }
                None => {
                    molecules.insert(line.to_string());
                }
            }
        }

        Ok(Self { molecules })
    }
}

impl<S: Into<String>> FromIterator<S> for TerminalSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            molecules: iter.into_iter().map(Into::into).collect(),
        }
    }
}

fn unquote(cell: &str) -> &str {
    let cell = cell.trim();
    cell.strip_prefix('"')
        .and_then(|c| c.strip_suffix('"'))
        .unwrap_or(cell)
}
