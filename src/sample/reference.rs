use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::mutation::UNKNOWN_RESIDUE;

/// Immutable snapshot of the baseline sequence shared by every comparison in
/// a batch. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    name: Arc<str>,
    sequence: Arc<str>,
    first_residue: i32,
}

impl Reference {
    /// Reference whose first residue is numbered `first_residue`.
    pub fn new(name: impl Into<Arc<str>>, sequence: impl Into<Arc<str>>, first_residue: i32) -> Self {
        Self {
            name: name.into(),
            sequence: sequence.into(),
            first_residue,
        }
    }

    /// Reference name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Protein sequence.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Number given to the first residue.
    pub fn first_residue(&self) -> i32 {
        self.first_residue
    }

    /// Number given to the last residue.
    pub fn last_residue(&self) -> i32 {
        self.first_residue + self.sequence.len() as i32 - 1
    }

    /// Inclusive residue-number span.
    pub fn span(&self) -> RangeInclusive<i32> {
        self.first_residue..=self.last_residue()
    }

    /// Residue count.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the reference has no residues.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Residue at reference number `position`. `None` outside the sequence
    /// or where the residue is unknown.
    pub fn residue_at(&self, position: i32) -> Option<u8> {
        let index = usize::try_from(position - self.first_residue).ok()?;
        let residue = *self.sequence.as_bytes().get(index)?;
        match residue {
            UNKNOWN_RESIDUE | b'-' => None,
            other => Some(other.to_ascii_uppercase()),
        }
    }
}
