use tracing::debug;

use crate::mutation::UNKNOWN_RESIDUE;

/// Probe length used when no configuration is supplied.
pub const DEFAULT_PROBE_LENGTH: usize = 10;

/// Rough placement of a candidate sequence against the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Candidate residues covering the reference, starting
    /// `min_residues_before` residues ahead of the anchored start.
    pub sequence: String,
    /// Effective offset: `min_residues_before` plus whatever had to be
    /// refunded when the start was clamped to the candidate's first residue.
    pub offset: i32,
    /// `match index in candidate - probe index in reference`.
    pub diff: i64,
    /// Index in the reference of the probe that matched.
    pub probe_index: usize,
    /// Candidate index where `sequence` begins.
    pub start: usize,
}

impl Anchor {
    /// Reference index facing the first residue of `sequence`; negative
    /// when residues ahead of the reference start were kept.
    pub fn reference_index(&self) -> i64 {
        self.start as i64 - self.diff
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn is_gap(residue: &u8) -> bool {
    *residue == UNKNOWN_RESIDUE || *residue == b'-'
}

/// Establish a coordinate offset between `candidate` and `reference` with
/// exact-match probes, without running the full alignment.
///
/// Probes of `probe_length` residues are taken from the reference every
/// `probe_length / 2` residues; probes containing a gap are skipped. The
/// first probe (left to right) found anywhere in the candidate decides the
/// anchor. Returns `None` when no probe matches.
pub fn roughly_align(
    candidate: &str,
    reference: &str,
    min_residues_before: usize,
    probe_length: usize,
) -> Option<Anchor> {
    if probe_length == 0 {
        return None;
    }
    let cand = candidate.as_bytes();
    let reference = reference.as_bytes();
    let step = (probe_length / 2).max(1);

    let mut probe_index = 0usize;
    while probe_index + probe_length <= reference.len() {
        let probe = &reference[probe_index..probe_index + probe_length];
        if probe.iter().any(is_gap) {
            probe_index += step;
            continue;
        }

        if let Some(loc) = find_subslice(cand, probe) {
            let diff = loc as i64 - probe_index as i64;
            let mut beginning = diff - min_residues_before as i64;
            let mut effective = min_residues_before as i64;
            if beginning < 0 {
                effective -= beginning;
                beginning = 0;
            }

            let begin = beginning as usize;
            let end = (begin + reference.len()).min(cand.len());
            debug!(probe_index, loc, diff, offset = effective, "anchor probe matched");

            return Some(Anchor {
                sequence: String::from_utf8_lossy(&cand[begin..end]).into_owned(),
                offset: effective as i32,
                diff,
                probe_index,
                start: begin,
            });
        }

        probe_index += step;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "MFVFLVLLPLVSSQCVNLTTRTQLPPAYTNSFTRGVYYPDKVFRSS";

    #[test]
    fn trims_candidate_to_reference_span() {
        let candidate = format!("XXXXX{}YYYY", REFERENCE);
        let anchor = roughly_align(&candidate, REFERENCE, 0, 10).unwrap();
        assert_eq!(anchor.diff, 5);
        assert_eq!(anchor.offset, 0);
        assert_eq!(anchor.start, 5);
        assert_eq!(anchor.reference_index(), 0);
        assert_eq!(anchor.sequence, REFERENCE);
    }

    #[test]
    fn clamped_start_refunds_offset() {
        let candidate = &REFERENCE[3..];
        let anchor = roughly_align(candidate, REFERENCE, 0, 10).unwrap();
        assert_eq!(anchor.diff, -3);
        assert_eq!(anchor.offset, 3);
        assert_eq!(anchor.reference_index(), 3);
        assert_eq!(anchor.sequence, candidate);
    }

    #[test]
    fn residues_before_are_kept_when_available() {
        let candidate = format!("ABCDEFGH{}", REFERENCE);
        let anchor = roughly_align(&candidate, REFERENCE, 3, 10).unwrap();
        assert_eq!(anchor.offset, 3);
        assert_eq!(anchor.reference_index(), -3);
        assert!(anchor.sequence.starts_with("FGHMFV"));
        assert_eq!(anchor.sequence.len(), REFERENCE.len());
    }

    #[test]
    fn probes_with_gaps_are_skipped() {
        let reference = "MFVFL LLPLVSSQCVNLTTRT";
        let candidate = "QQLLPLVSSQCVNLTTRT";
        let anchor = roughly_align(candidate, reference, 0, 10).unwrap();
        assert_eq!(anchor.probe_index, 10);
    }

    #[test]
    fn no_probe_match_yields_none() {
        assert!(roughly_align("WWWWWWWWWWWWWWW", REFERENCE, 0, 10).is_none());
        assert!(roughly_align(REFERENCE, REFERENCE, 0, 0).is_none());
    }
}
