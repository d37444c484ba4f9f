use std::collections::BTreeMap;

use crate::mutation::Mutation;

/// Correspondence between a sample's result indices and reference numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinateMap {
    ref_to_me: BTreeMap<i32, usize>,
    me_to_ref: BTreeMap<usize, i32>,
}

impl CoordinateMap {
    /// Index into the sample's result for reference number `position`.
    pub fn sample_index(&self, position: i32) -> Option<usize> {
        self.ref_to_me.get(&position).copied()
    }

    /// Reference number for sample result index `index`.
    pub fn reference_position(&self, index: usize) -> Option<i32> {
        self.me_to_ref.get(&index).copied()
    }

    /// Reference numbers with a sample residue, ascending.
    pub fn positions(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.ref_to_me.iter().map(|(&r, &m)| (r, m))
    }

    /// Number of mapped reference positions.
    pub fn len(&self) -> usize {
        self.ref_to_me.len()
    }

    /// Whether nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.ref_to_me.is_empty()
    }
}

/// Build the map for a result of `len` residues whose index 0 sits at
/// reference number `offset`, given the sample's mutation list.
///
/// Every insertion shifts the sample index of all reference positions at or
/// after it by +1; every deletion by -1. Positions that land outside the
/// result are dropped. The inverse keeps the first reference number seen
/// for each sample index.
pub fn organise_map(len: usize, offset: i32, mutations: &[Mutation]) -> CoordinateMap {
    let deletions = mutations.iter().filter(|m| m.is_deletion()).count();
    let mut nudged: BTreeMap<i32, i64> = (0..len + deletions)
        .map(|i| (offset + i as i32, i as i64))
        .collect();

    for mutation in mutations {
        let dir = if mutation.is_addition() {
            1
        } else if mutation.is_deletion() {
            -1
        } else {
            continue;
        };
        for (_, index) in nudged.range_mut(mutation.position..) {
            *index += dir;
        }
    }

    let ref_to_me: BTreeMap<i32, usize> = nudged
        .into_iter()
        .filter_map(|(r, m)| {
            let m = usize::try_from(m).ok()?;
            (m < len).then_some((r, m))
        })
        .collect();

    let mut me_to_ref = BTreeMap::new();
    for (&r, &m) in &ref_to_me {
        me_to_ref.entry(m).or_insert(r);
    }

    CoordinateMap {
        ref_to_me,
        me_to_ref,
    }
}
