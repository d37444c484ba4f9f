//! Mutation records expressed in reference-residue coordinates.
//!
//! A [`Mutation`] serializes as `<from><position><to>`, e.g. `N501Y`
//! (substitution), `K417+` (insertion) or `S371-` (deletion). A sample's
//! mutation summary is these tokens space-joined in position order; this text
//! form is what gets persisted and exchanged, so parsing and printing must
//! round-trip exactly.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Residue character used for an untranslatable codon or a missing residue.
pub const UNKNOWN_RESIDUE: u8 = b' ';

/// What happened at a reference position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Change {
    /// Residue replaced by the contained residue letter.
    Substitution(u8),
    /// Residue present in the sample but not in the reference.
    Insertion,
    /// Reference residue missing from the sample.
    Deletion,
    /// N-glycosylation sequon gained (derived, not primary).
    GlycanGained,
    /// N-glycosylation sequon lost (derived, not primary).
    GlycanLost,
}

impl Change {
    /// Trailing character of the token form.
    pub fn to_char(self) -> char {
        match self {
            Change::Substitution(residue) => residue as char,
            Change::Insertion => '+',
            Change::Deletion => '-',
            Change::GlycanGained => '>',
            Change::GlycanLost => '<',
        }
    }

    /// Inverse of [`Change::to_char`].
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Change::Insertion),
            '-' => Some(Change::Deletion),
            '>' => Some(Change::GlycanGained),
            '<' => Some(Change::GlycanLost),
            c if c.is_ascii_alphabetic() || c == '*' => {
                Some(Change::Substitution(c.to_ascii_uppercase() as u8))
            }
            _ => None,
        }
    }

    /// Whether the change is a primary call rather than a derived annotation.
    pub fn is_primary(self) -> bool {
        !matches!(self, Change::GlycanGained | Change::GlycanLost)
    }
}

/// Single mutation relative to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mutation {
    /// Residue the change starts from (reference residue, or the inserted
    /// sample residue for insertions).
    pub from: u8,
    /// Reference residue number.
    pub position: i32,
    /// Kind of change.
    pub change: Change,
}

impl Mutation {
    /// Construct a mutation from its three components.
    pub fn new(from: u8, position: i32, change: Change) -> Self {
        Self {
            from: from.to_ascii_uppercase(),
            position,
            change,
        }
    }

    /// Substitution `from` → `to` at `position`.
    pub fn substitution(from: u8, position: i32, to: u8) -> Self {
        Self::new(from, position, Change::Substitution(to.to_ascii_uppercase()))
    }

    /// Insertion of `residue` before reference `position`.
    pub fn insertion(residue: u8, position: i32) -> Self {
        Self::new(residue, position, Change::Insertion)
    }

    /// Deletion of reference `residue` at `position`.
    pub fn deletion(residue: u8, position: i32) -> Self {
        Self::new(residue, position, Change::Deletion)
    }

    /// Reference residue number.
    pub fn residue(&self) -> i32 {
        self.position
    }

    /// Whether this mutation is an insertion.
    pub fn is_addition(&self) -> bool {
        self.change == Change::Insertion
    }

    /// Whether this mutation is a deletion.
    pub fn is_deletion(&self) -> bool {
        self.change == Change::Deletion
    }

    /// Token text without the leading `from` residue (`"501Y"` for `N501Y`).
    pub fn suffix(&self) -> String {
        format!("{}{}", self.position, self.change.to_char())
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.from as char,
            self.position,
            self.change.to_char()
        )
    }
}

/// Errors raised when parsing a mutation token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MutationParseError {
    /// Token shorter than `<from><digit><to>`.
    #[error("mutation token '{0}' is too short")]
    TooShort(String),

    /// Position between the first and last characters is not an integer.
    #[error("mutation token '{0}' has no valid residue number")]
    BadPosition(String),

    /// Trailing character is not a residue or change marker.
    #[error("mutation token '{0}' ends in an unknown change marker")]
    BadChange(String),
}

impl FromStr for Mutation {
    type Err = MutationParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() < 3 {
            return Err(MutationParseError::TooShort(token.to_string()));
        }
        let from = chars[0];
        let to = chars[chars.len() - 1];
        let digits: String = chars[1..chars.len() - 1].iter().collect();
        let position: i32 = digits
            .parse()
            .map_err(|_| MutationParseError::BadPosition(token.to_string()))?;
        let change =
            Change::from_char(to).ok_or_else(|| MutationParseError::BadChange(token.to_string()))?;
        if !from.is_ascii() {
            return Err(MutationParseError::BadChange(token.to_string()));
        }

        Ok(Mutation::new(from as u8, position, change))
    }
}

/// Stable sort by reference position; ties keep their current order.
pub fn sort_mutations(mutations: &mut [Mutation]) {
    mutations.sort_by_key(|m| m.position);
}

/// Drop repeated tokens, keeping the first occurrence of each.
///
/// A multi-residue insertion at one site yields one token per inserted
/// column; the list keeps a single copy.
pub fn dedup_mutations(mutations: &mut Vec<Mutation>) {
    let mut seen = HashSet::with_capacity(mutations.len());
    mutations.retain(|m| seen.insert(*m));
}

/// Space-joined token summary in list order.
pub fn mutation_summary(mutations: &[Mutation]) -> String {
    mutations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a space-separated summary. Empty fields are ignored; malformed
/// tokens are returned separately so callers decide whether to log or fail.
pub fn parse_summary(summary: &str) -> (Vec<Mutation>, Vec<MutationParseError>) {
    let mut mutations = Vec::new();
    let mut errors = Vec::new();
    for token in summary.split(' ').filter(|t| !t.is_empty()) {
        match token.parse::<Mutation>() {
            Ok(mutation) => mutations.push(mutation),
            Err(err) => errors.push(err),
        }
    }
    (mutations, errors)
}
