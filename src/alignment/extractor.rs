use tracing::debug;

use crate::alignment::{AlignmentError, AlignmentTrack, ColumnKind};
use crate::mutation::{Mutation, UNKNOWN_RESIDUE};
use crate::EngineConfig;

/// Residue letter recorded when the track shows an unknown residue.
const UNKNOWN_LETTER: u8 = b'X';

/// Counters gathered while walking a track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Substitution columns emitted.
    pub substitutions: usize,
    /// Insertion columns emitted.
    pub insertions: usize,
    /// Deletion columns emitted.
    pub deletions: usize,
    /// Substitution columns whose sample residue was unknown (not emitted).
    pub unknown_residues: usize,
    /// Longest insertion run seen outside the terminal window.
    pub longest_insertion_run: usize,
    /// Whether the insertion-run heuristic tripped.
    pub problematic: bool,
}

fn is_unknown(residue: u8) -> bool {
    residue == UNKNOWN_RESIDUE || residue.eq_ignore_ascii_case(&UNKNOWN_LETTER)
}

fn letter(residue: u8) -> u8 {
    if residue == UNKNOWN_RESIDUE {
        UNKNOWN_LETTER
    } else {
        residue
    }
}

/// Walk `track` left to right and emit the raw mutation list.
///
/// Positions come straight from the track's reference coordinates. An
/// insertion run is broken only by a matching column, so insertions
/// interleaved with substitutions or deletions keep counting. A run longer
/// than `max_insertion_run` flags the sample unless it sits in the last
/// `terminal_leniency` columns.
pub fn extract_mutations(
    track: &AlignmentTrack,
    config: &EngineConfig,
) -> Result<(Vec<Mutation>, ExtractionReport), AlignmentError> {
    track.validate()?;

    let len = track.len();
    let mut mutations = Vec::new();
    let mut report = ExtractionReport::default();
    let mut run = 0usize;

    for (i, column) in track.columns().enumerate() {
        match column.kind {
            ColumnKind::Match => run = 0,
            ColumnKind::Substitution => {
                if is_unknown(column.left) {
                    report.unknown_residues += 1;
                    continue;
                }
                mutations.push(Mutation::substitution(
                    letter(column.right),
                    column.ref_index,
                    column.left,
                ));
                report.substitutions += 1;
            }
            ColumnKind::Insertion => {
                mutations.push(Mutation::insertion(letter(column.left), column.ref_index));
                report.insertions += 1;
                run += 1;

                if i + config.terminal_leniency < len {
                    report.longest_insertion_run = report.longest_insertion_run.max(run);
                    if run > config.max_insertion_run && !report.problematic {
                        debug!(column = i, run, "insertion run exceeds threshold");
                        report.problematic = true;
                    }
                }
            }
            ColumnKind::Deletion => {
                mutations.push(Mutation::deletion(letter(column.right), column.ref_index));
                report.deletions += 1;
            }
        }
    }

    Ok((mutations, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::mutation_summary;

    fn track(left: &str, symbols: &str, right: &str, ref_index: Vec<i32>) -> AlignmentTrack {
        AlignmentTrack {
            left: left.into(),
            symbols: symbols.into(),
            right: right.into(),
            ref_index,
        }
    }

    #[test]
    fn emits_each_column_kind() {
        let t = track("AYW-E", ".*+-.", "AN-SE", vec![500, 501, 502, 502, 503]);
        let (list, report) = extract_mutations(&t, &EngineConfig::default()).unwrap();
        assert_eq!(mutation_summary(&list), "N501Y W502+ S502-");
        assert_eq!(report.substitutions, 1);
        assert_eq!(report.insertions, 1);
        assert_eq!(report.deletions, 1);
        assert!(!report.problematic);
    }

    #[test]
    fn unknown_sample_residues_are_not_mutations() {
        let t = track("A C", ".*.", "ABC", vec![1, 2, 3]);
        let (list, report) = extract_mutations(&t, &EngineConfig::default()).unwrap();
        assert!(list.is_empty());
        assert_eq!(report.unknown_residues, 1);
    }

    #[test]
    fn long_internal_insertion_run_is_problematic() {
        let inserted = "W".repeat(12);
        let left = format!("A{inserted}{}", "C".repeat(12));
        let symbols = format!(".{}{}", "+".repeat(12), ".".repeat(12));
        let right = format!("A{}{}", "-".repeat(12), "C".repeat(12));
        let mut ref_index = vec![1];
        ref_index.extend(std::iter::repeat(2).take(12));
        ref_index.extend(2..14);

        let (list, report) =
            extract_mutations(&track(&left, &symbols, &right, ref_index), &EngineConfig::default())
                .unwrap();
        assert_eq!(list.len(), 12);
        assert_eq!(report.longest_insertion_run, 12);
        assert!(report.problematic);
    }

    #[test]
    fn terminal_insertions_are_tolerated() {
        let left = format!("{}{}", "C".repeat(5), "W".repeat(12));
        let symbols = format!("{}{}", ".".repeat(5), "+".repeat(12));
        let right = format!("{}{}", "C".repeat(5), "-".repeat(12));
        let mut ref_index: Vec<i32> = (1..6).collect();
        ref_index.extend(std::iter::repeat(6).take(12));

        let (_, report) =
            extract_mutations(&track(&left, &symbols, &right, ref_index), &EngineConfig::default())
                .unwrap();
        assert!(!report.problematic);
    }

    #[test]
    fn matches_reset_the_run() {
        let left = "WWWWWWAWWWWWWACCCCCCCCCCCC";
        let symbols = "++++++.++++++.............";
        let right = "------A------ACCCCCCCCCCCC";
        let ref_index = (0..left.len() as i32).collect();
        let (_, report) =
            extract_mutations(&track(left, symbols, right, ref_index), &EngineConfig::default())
                .unwrap();
        assert_eq!(report.longest_insertion_run, 6);
        assert!(!report.problematic);
    }
}
