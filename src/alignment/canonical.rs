use std::ops::{AddAssign, RangeInclusive};

use tracing::debug;

use crate::mutation::{sort_mutations, Mutation};
use crate::sample::Reference;

/// Residues of flanking context kept on either side of a deletion run.
const FLANK: i32 = 2;

/// Counters describing what the canonicalizer did with each deletion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalizationReport {
    /// Maximal deletion runs seen.
    pub runs_examined: usize,
    /// Runs moved to a more leftward placement.
    pub runs_shifted: usize,
    /// Runs already at their leftmost placement.
    pub runs_unchanged: usize,
    /// Runs whose flanking window could not be resolved against the reference.
    pub runs_unresolved: usize,
    /// Runs touching either end of the covered range, left alone.
    pub runs_terminal: usize,
}

impl AddAssign for CanonicalizationReport {
    fn add_assign(&mut self, rhs: Self) {
        self.runs_examined += rhs.runs_examined;
        self.runs_shifted += rhs.runs_shifted;
        self.runs_unchanged += rhs.runs_unchanged;
        self.runs_unresolved += rhs.runs_unresolved;
        self.runs_terminal += rhs.runs_terminal;
    }
}

/// Reference residues from `start - FLANK - reach` to `end + FLANK` with the
/// run shifted left by `go_back` cut out. `None` marks unresolvable residues.
fn deletion_window(
    reference: &Reference,
    start: i32,
    end: i32,
    go_back: i32,
    reach: i32,
) -> Vec<Option<u8>> {
    let cut = (start - go_back)..=(end - go_back);
    (start - FLANK - reach..=end + FLANK)
        .filter(|pos| !cut.contains(pos))
        .map(|pos| reference.residue_at(pos))
        .collect()
}

fn is_resolved(window: &[Option<u8>]) -> bool {
    window.iter().all(Option::is_some)
}

enum Placement {
    Unresolved,
    Shift(i32),
}

/// How far the run `[start, end]` can slide left while deleting the same
/// residues from the reference. `floor` is the position of the previous
/// mutation; the run never moves onto or past it.
///
/// The comparison window widens by one residue per step, so inside a repeat
/// the shift is bounded only by the repeat itself, the floor or the
/// reference start.
fn leftmost_placement(reference: &Reference, start: i32, end: i32, floor: Option<i32>) -> Placement {
    if !is_resolved(&deletion_window(reference, start, end, 0, 0)) {
        return Placement::Unresolved;
    }

    let mut go_back = 0;
    loop {
        go_back += 1;
        if floor.is_some_and(|f| start - go_back <= f) {
            break;
        }

        let comparison = deletion_window(reference, start, end, 0, go_back);
        let shifted = deletion_window(reference, start, end, go_back, go_back);
        if !is_resolved(&comparison) || !is_resolved(&shifted) || comparison != shifted {
            break;
        }
    }

    Placement::Shift(go_back - 1)
}

/// Move every internal deletion run to its leftmost equivalent placement.
///
/// The list is sorted by position first. Runs are maximal blocks of
/// deletions at consecutive positions, processed in ascending order. A run
/// starting at `covered.start()` or ending at `covered.end()` is a terminal
/// truncation and is left alone. Shifted deletions take their `from` residue
/// from the reference at the new position.
pub fn left_justify_deletions(
    mutations: &mut Vec<Mutation>,
    reference: &Reference,
    covered: RangeInclusive<i32>,
) -> CanonicalizationReport {
    sort_mutations(mutations);
    let mut report = CanonicalizationReport::default();

    let mut i = 0;
    while i < mutations.len() {
        if !mutations[i].is_deletion() {
            i += 1;
            continue;
        }

        let start = mutations[i].position;
        let mut count = 1usize;
        while i + count < mutations.len()
            && mutations[i + count].is_deletion()
            && mutations[i + count].position == start + count as i32
        {
            count += 1;
        }
        let end = start + count as i32 - 1;
        report.runs_examined += 1;

        if start == *covered.start() || end == *covered.end() {
            report.runs_terminal += 1;
            i += count;
            continue;
        }

        let floor = i.checked_sub(1).map(|prev| mutations[prev].position);
        match leftmost_placement(reference, start, end, floor) {
            Placement::Unresolved => {
                debug!(start, end, "deletion run window unresolved");
                report.runs_unresolved += 1;
            }
            Placement::Shift(0) => report.runs_unchanged += 1,
            Placement::Shift(go_back) => {
                debug!(start, end, go_back, "left-justifying deletion run");
                for mutation in &mut mutations[i..i + count] {
                    mutation.position -= go_back;
                    if let Some(residue) = reference.residue_at(mutation.position) {
                        mutation.from = residue;
                    }
                }
                report.runs_shifted += 1;
            }
        }

        i += count;
    }

    report
}
