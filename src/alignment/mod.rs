//! Alignment tracks and their conversion into canonical mutation lists.
//!
//! The pairwise alignment itself sits behind [`AlignmentPrimitive`]; this
//! module only relies on the three-row contract of [`AlignmentTrack`]:
//!
//! ```text
//! left     MFV-FLVAL      sample row
//! symbols  ..*+..-..
//! right    MFLQFL-AL      reference row
//! ```
//!
//! `.` match, `*` substitution, `+` insertion in the sample, `-` deletion
//! from the sample.

mod canonical;
mod extractor;
mod global;

pub use canonical::{left_justify_deletions, CanonicalizationReport};
pub use extractor::{extract_mutations, ExtractionReport};
pub use global::{GlobalAligner, ScoringScheme};

use std::fmt::Write as _;

use thiserror::Error;

use crate::sample::Reference;

/// Gap character used in the `left` and `right` rows.
pub const GAP: u8 = b'-';

/// Column classification from the symbol row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `.` identical residues.
    Match,
    /// `*` differing residues.
    Substitution,
    /// `+` sample residue against a reference gap.
    Insertion,
    /// `-` reference residue against a sample gap.
    Deletion,
}

impl ColumnKind {
    /// Parse a symbol-row character.
    pub fn from_symbol(symbol: u8) -> Option<Self> {
        match symbol {
            b'.' => Some(ColumnKind::Match),
            b'*' => Some(ColumnKind::Substitution),
            b'+' => Some(ColumnKind::Insertion),
            b'-' => Some(ColumnKind::Deletion),
            _ => None,
        }
    }

    /// Symbol-row character for this kind.
    pub fn symbol(self) -> u8 {
        match self {
            ColumnKind::Match => b'.',
            ColumnKind::Substitution => b'*',
            ColumnKind::Insertion => b'+',
            ColumnKind::Deletion => b'-',
        }
    }
}

/// One column of an [`AlignmentTrack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Sample residue (or [`GAP`]).
    pub left: u8,
    /// Column classification.
    pub kind: ColumnKind,
    /// Reference residue (or [`GAP`]).
    pub right: u8,
    /// Reference coordinate of the column.
    pub ref_index: i32,
}

/// Three parallel rows plus the reference coordinate of every column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlignmentTrack {
    /// Sample row.
    pub left: String,
    /// Symbol row.
    pub symbols: String,
    /// Reference row.
    pub right: String,
    /// Reference coordinate per column. Insertion columns carry the
    /// coordinate of the next reference residue.
    pub ref_index: Vec<i32>,
}

impl AlignmentTrack {
    /// Number of columns.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the track has no columns.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Check the row lengths and the symbol alphabet.
    pub fn validate(&self) -> Result<(), AlignmentError> {
        let len = self.symbols.len();
        if self.left.len() != len || self.right.len() != len || self.ref_index.len() != len {
            return Err(AlignmentError::MalformedTrack {
                left: self.left.len(),
                symbols: len,
                right: self.right.len(),
                indices: self.ref_index.len(),
            });
        }
        if let Some((column, &symbol)) = self
            .symbols
            .as_bytes()
            .iter()
            .enumerate()
            .find(|(_, s)| ColumnKind::from_symbol(**s).is_none())
        {
            return Err(AlignmentError::UnknownSymbol {
                column,
                symbol: symbol as char,
            });
        }
        Ok(())
    }

    /// Iterate over columns left to right. Call [`validate`](Self::validate)
    /// first; unknown symbols are skipped.
    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        let left = self.left.as_bytes();
        let right = self.right.as_bytes();
        self.symbols
            .as_bytes()
            .iter()
            .enumerate()
            .filter_map(move |(i, &symbol)| {
                Some(Column {
                    left: *left.get(i)?,
                    kind: ColumnKind::from_symbol(symbol)?,
                    right: *right.get(i)?,
                    ref_index: *self.ref_index.get(i)?,
                })
            })
    }

    /// Human-readable dump: a name line followed by the three rows.
    pub fn render(&self, name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, ">{name}");
        let _ = writeln!(out, "{}", self.left);
        let _ = writeln!(out, "{}", self.symbols);
        let _ = writeln!(out, "{}", self.right);
        out
    }
}

/// Errors surfaced at the alignment boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlignmentError {
    /// Rows of the track disagree in length.
    #[error(
        "malformed alignment track: left={left}, symbols={symbols}, right={right}, indices={indices}"
    )]
    MalformedTrack {
        /// Length of the sample row.
        left: usize,
        /// Length of the symbol row.
        symbols: usize,
        /// Length of the reference row.
        right: usize,
        /// Length of the reference-index array.
        indices: usize,
    },

    /// Symbol row contains a character outside `.*+-`.
    #[error("unknown alignment symbol '{symbol}' at column {column}")]
    UnknownSymbol {
        /// Column index.
        column: usize,
        /// Offending character.
        symbol: char,
    },

    /// One of the sequences handed to the primitive was empty.
    #[error("cannot align an empty sequence")]
    EmptyInput,

    /// Failure reported by an external alignment implementation.
    #[error("alignment primitive failed: {0}")]
    Primitive(String),
}

/// Pairwise alignment primitive producing an [`AlignmentTrack`].
///
/// Implementations only have to honour the track contract; placement of
/// indels inside repeats may be arbitrary; the canonicalizer removes that
/// freedom afterwards.
pub trait AlignmentPrimitive {
    /// Align `sample` (left row) against `reference` (right row).
    fn align(&self, sample: &[u8], reference: &Reference) -> Result<AlignmentTrack, AlignmentError>;
}

impl<T: AlignmentPrimitive + ?Sized> AlignmentPrimitive for &T {
    fn align(&self, sample: &[u8], reference: &Reference) -> Result<AlignmentTrack, AlignmentError> {
        (**self).align(sample, reference)
    }
}
