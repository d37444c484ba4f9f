use std::collections::BTreeSet;

use crate::mutation::{Change, Mutation};
use crate::sample::{CoordinateMap, Reference};

fn is_sequon(window: &[u8]) -> bool {
    matches!(
        window,
        [n, x, st]
            if n.eq_ignore_ascii_case(&b'N')
                && x.is_ascii_alphabetic()
                && !x.eq_ignore_ascii_case(&b'P')
                && (st.eq_ignore_ascii_case(&b'S') || st.eq_ignore_ascii_case(&b'T'))
    )
}

/// Indices of every N-X-S/T (X not P) sequon's asparagine.
pub fn find_sequons(sequence: &str) -> Vec<usize> {
    sequence
        .as_bytes()
        .windows(3)
        .enumerate()
        .filter(|(_, w)| is_sequon(w))
        .map(|(i, _)| i)
        .collect()
}

/// Derived glycosylation mutations for a sample.
///
/// A reference sequon whose asparagine maps into the sample without a
/// sample sequon at that index is lost (`N<pos><`). A sample sequon whose
/// asparagine maps to a reference position without one is gained
/// (`<ref residue><pos>>`). Positions the sample does not cover produce
/// nothing. Output is position-ordered.
pub fn glycosylation_changes(result: &str, map: &CoordinateMap, reference: &Reference) -> Vec<Mutation> {
    let first = reference.first_residue();
    let reference_sites: BTreeSet<i32> = find_sequons(reference.sequence())
        .into_iter()
        .map(|i| first + i as i32)
        .collect();
    let sample_sites: BTreeSet<i32> = find_sequons(result)
        .into_iter()
        .filter_map(|i| map.reference_position(i))
        .collect();

    let mut changes: Vec<Mutation> = reference_sites
        .iter()
        .filter(|&&p| map.sample_index(p).is_some() && !sample_sites.contains(&p))
        .map(|&p| Mutation::new(b'N', p, Change::GlycanLost))
        .collect();

    changes.extend(
        sample_sites
            .iter()
            .filter(|&&p| !reference_sites.contains(&p))
            .map(|&p| Mutation::new(reference.residue_at(p).unwrap_or(b'X'), p, Change::GlycanGained)),
    );

    changes.sort_by_key(|m| m.position);
    changes
}
