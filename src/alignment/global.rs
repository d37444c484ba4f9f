use crate::alignment::{AlignmentError, AlignmentPrimitive, AlignmentTrack, ColumnKind, GAP};
use crate::mutation::UNKNOWN_RESIDUE;
use crate::sample::Reference;

const NEG_INF: i32 = i32::MIN / 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Diagonal,
    Insertion,
    Deletion,
}

/// Integer scoring for [`GlobalAligner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringScheme {
    /// Score for identical residues.
    pub match_score: i32,
    /// Score for differing residues.
    pub mismatch: i32,
    /// Score added for the first residue of a gap.
    pub gap_open: i32,
    /// Score added for each further residue of a gap.
    pub gap_extend: i32,
    /// Leading and trailing gaps cost nothing.
    pub free_end_gaps: bool,
}

impl Default for ScoringScheme {
    fn default() -> Self {
        Self {
            match_score: 5,
            mismatch: -4,
            gap_open: -12,
            gap_extend: -2,
            free_end_gaps: true,
        }
    }
}

impl ScoringScheme {
    fn pair(&self, a: u8, b: u8) -> i32 {
        if is_unknown(a) || is_unknown(b) {
            0
        } else if a.eq_ignore_ascii_case(&b) {
            self.match_score
        } else {
            self.mismatch
        }
    }

    fn end_gap(&self, len: usize) -> i32 {
        if self.free_end_gaps || len == 0 {
            0
        } else {
            self.gap_open + self.gap_extend * (len as i32 - 1)
        }
    }
}

fn is_unknown(residue: u8) -> bool {
    residue == UNKNOWN_RESIDUE || residue.eq_ignore_ascii_case(&b'X')
}

/// Affine-gap global aligner (Gotoh), the default [`AlignmentPrimitive`].
///
/// Ties are broken diagonal first, then insertion, then deletion, so the
/// same inputs always give the same track.
#[derive(Debug, Clone, Default)]
pub struct GlobalAligner {
    scoring: ScoringScheme,
}

/// Dynamic-programming tables, row-major with `width = reference.len() + 1`.
struct Tables {
    width: usize,
    diag: Vec<i32>,
    ins: Vec<i32>,
    del: Vec<i32>,
    diag_from: Vec<State>,
    ins_from: Vec<State>,
    del_from: Vec<State>,
}

impl Tables {
    fn new(rows: usize, width: usize) -> Self {
        let cells = rows * width;
        Self {
            width,
            diag: vec![NEG_INF; cells],
            ins: vec![NEG_INF; cells],
            del: vec![NEG_INF; cells],
            diag_from: vec![State::Diagonal; cells],
            ins_from: vec![State::Diagonal; cells],
            del_from: vec![State::Diagonal; cells],
        }
    }

    fn at(&self, i: usize, j: usize) -> usize {
        i * self.width + j
    }

    fn score(&self, idx: usize, state: State) -> i32 {
        match state {
            State::Diagonal => self.diag[idx],
            State::Insertion => self.ins[idx],
            State::Deletion => self.del[idx],
        }
    }

    fn best_state(&self, idx: usize) -> (State, i32) {
        best_of([
            (State::Diagonal, self.diag[idx]),
            (State::Insertion, self.ins[idx]),
            (State::Deletion, self.del[idx]),
        ])
    }
}

fn best_of(candidates: [(State, i32); 3]) -> (State, i32) {
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }
    best
}

impl GlobalAligner {
    /// Aligner with a custom scoring scheme.
    pub fn new(scoring: ScoringScheme) -> Self {
        Self { scoring }
    }

    /// Scoring scheme in use.
    pub fn scoring(&self) -> &ScoringScheme {
        &self.scoring
    }

    fn fill(&self, sample: &[u8], reference: &[u8]) -> Tables {
        let (n, m) = (sample.len(), reference.len());
        let s = &self.scoring;
        let mut t = Tables::new(n + 1, m + 1);

        t.diag[0] = 0;
        for i in 1..=n {
            let idx = t.at(i, 0);
            t.ins[idx] = s.end_gap(i);
            t.ins_from[idx] = if i == 1 { State::Diagonal } else { State::Insertion };
        }
        for j in 1..=m {
            let idx = t.at(0, j);
            t.del[idx] = s.end_gap(j);
            t.del_from[idx] = if j == 1 { State::Diagonal } else { State::Deletion };
        }

        for i in 1..=n {
            for j in 1..=m {
                let idx = t.at(i, j);
                let up_left = t.at(i - 1, j - 1);
                let up = t.at(i - 1, j);
                let left = t.at(i, j - 1);

                let (from, score) = t.best_state(up_left);
                t.diag[idx] = score + s.pair(sample[i - 1], reference[j - 1]);
                t.diag_from[idx] = from;

                let (from, score) = best_of([
                    (State::Diagonal, t.diag[up] + s.gap_open),
                    (State::Insertion, t.ins[up] + s.gap_extend),
                    (State::Deletion, t.del[up] + s.gap_open),
                ]);
                t.ins[idx] = score;
                t.ins_from[idx] = from;

                let (from, score) = best_of([
                    (State::Diagonal, t.diag[left] + s.gap_open),
                    (State::Insertion, t.ins[left] + s.gap_open),
                    (State::Deletion, t.del[left] + s.gap_extend),
                ]);
                t.del[idx] = score;
                t.del_from[idx] = from;
            }
        }

        t
    }

    /// Cell where the traceback starts. With free end gaps the alignment may
    /// finish anywhere on the last row or column.
    fn traceback_start(&self, t: &Tables, n: usize, m: usize) -> (usize, usize, State) {
        let (state, _) = t.best_state(t.at(n, m));
        if !self.scoring.free_end_gaps {
            return (n, m, state);
        }

        let mut best = (n, m, state, t.score(t.at(n, m), state));
        for j in 0..m {
            let (state, score) = t.best_state(t.at(n, j));
            if score > best.3 {
                best = (n, j, state, score);
            }
        }
        for i in 0..n {
            let (state, score) = t.best_state(t.at(i, m));
            if score > best.3 {
                best = (i, m, state, score);
            }
        }
        (best.0, best.1, best.2)
    }
}

/// Columns collected right to left during traceback, with the step that
/// produced each one.
#[derive(Default)]
struct ReversedColumns {
    left: Vec<u8>,
    right: Vec<u8>,
    steps: Vec<State>,
}

impl ReversedColumns {
    fn push(&mut self, step: State, left: u8, right: u8) {
        self.left.push(left);
        self.right.push(right);
        self.steps.push(step);
    }
}

impl AlignmentPrimitive for GlobalAligner {
    fn align(&self, sample: &[u8], reference: &Reference) -> Result<AlignmentTrack, AlignmentError> {
        let ref_seq = reference.sequence().as_bytes();
        if sample.is_empty() || ref_seq.is_empty() {
            return Err(AlignmentError::EmptyInput);
        }

        // a gap in the sample is a missing residue, not a deletion
        let sample: Vec<u8> = sample
            .iter()
            .map(|&b| if b == GAP { UNKNOWN_RESIDUE } else { b })
            .collect();

        let (n, m) = (sample.len(), ref_seq.len());
        let tables = self.fill(&sample, ref_seq);
        let (mut i, mut j, mut state) = self.traceback_start(&tables, n, m);

        let mut cols = ReversedColumns::default();
        for k in (j..m).rev() {
            cols.push(State::Deletion, GAP, ref_seq[k]);
        }
        for k in (i..n).rev() {
            cols.push(State::Insertion, sample[k], GAP);
        }

        while i > 0 || j > 0 {
            if i == 0 {
                state = State::Deletion;
            } else if j == 0 {
                state = State::Insertion;
            }
            let idx = tables.at(i, j);
            match state {
                State::Diagonal => {
                    cols.push(State::Diagonal, sample[i - 1], ref_seq[j - 1]);
                    state = tables.diag_from[idx];
                    i -= 1;
                    j -= 1;
                }
                State::Insertion => {
                    cols.push(State::Insertion, sample[i - 1], GAP);
                    state = tables.ins_from[idx];
                    i -= 1;
                }
                State::Deletion => {
                    cols.push(State::Deletion, GAP, ref_seq[j - 1]);
                    state = tables.del_from[idx];
                    j -= 1;
                }
            }
        }

        Ok(build_track(cols, reference.first_residue()))
    }
}

fn build_track(cols: ReversedColumns, first_residue: i32) -> AlignmentTrack {
    let len = cols.left.len();
    let mut left = String::with_capacity(len);
    let mut symbols = String::with_capacity(len);
    let mut right = String::with_capacity(len);
    let mut ref_index = Vec::with_capacity(len);
    let mut consumed = 0i32;

    let columns = cols.left.iter().zip(&cols.right).zip(&cols.steps).rev();
    for ((&l, &r), &step) in columns {
        let kind = match step {
            State::Insertion => ColumnKind::Insertion,
            State::Deletion => ColumnKind::Deletion,
            State::Diagonal if l.eq_ignore_ascii_case(&r) => ColumnKind::Match,
            State::Diagonal => ColumnKind::Substitution,
        };

        left.push(l as char);
        symbols.push(kind.symbol() as char);
        right.push(r as char);
        ref_index.push(first_residue + consumed);
        if kind != ColumnKind::Insertion {
            consumed += 1;
        }
    }

    AlignmentTrack {
        left,
        symbols,
        right,
        ref_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(seq: &str) -> Reference {
        Reference::new("ref", seq, 1)
    }

    #[test]
    fn identical_sequences_align_without_gaps() {
        let track = GlobalAligner::default()
            .align(b"MFVFLVLLPL", &reference("MFVFLVLLPL"))
            .unwrap();
        assert_eq!(track.symbols, "..........");
        assert_eq!(track.ref_index, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn substitution_is_marked() {
        let track = GlobalAligner::default()
            .align(b"MFVFLYLLPL", &reference("MFVFLVLLPL"))
            .unwrap();
        assert_eq!(track.symbols, ".....*....");
        assert_eq!(track.left.as_bytes()[5], b'Y');
        assert_eq!(track.right.as_bytes()[5], b'V');
    }

    #[test]
    fn internal_deletion_becomes_gap_run() {
        let track = GlobalAligner::default()
            .align(b"MFVFLVPLVSSQCVNL", &reference("MFVFLVLLPLVSSQCVNL"))
            .unwrap();
        track.validate().unwrap();
        assert_eq!(track.symbols.matches('-').count(), 2);
        assert_eq!(track.left.replace('-', ""), "MFVFLVPLVSSQCVNL");
        assert_eq!(track.right, "MFVFLVLLPLVSSQCVNL");
    }

    #[test]
    fn insertion_carries_next_reference_coordinate() {
        let track = GlobalAligner::default()
            .align(b"MFVFLWVLLPLVSSQ", &reference("MFVFLVLLPLVSSQ"))
            .unwrap();
        let col = track.symbols.find('+').unwrap();
        assert_eq!(track.left.as_bytes()[col], b'W');
        assert_eq!(track.ref_index[col], 6);
    }

    #[test]
    fn truncated_sample_leaves_terminal_deletions() {
        let track = GlobalAligner::default()
            .align(b"LVLLPLVSSQ", &reference("MFVFLVLLPLVSSQ"))
            .unwrap();
        assert!(track.symbols.starts_with("----"));
        assert_eq!(track.len(), 14);
    }

    #[test]
    fn sample_gap_is_an_unknown_residue() {
        let track = GlobalAligner::default()
            .align(b"MFVFL-LLPL", &reference("MFVFLVLLPL"))
            .unwrap();
        assert_eq!(track.symbols, ".....*....");
        assert_eq!(track.left.as_bytes()[5], UNKNOWN_RESIDUE);
        assert!(track.columns().all(|c| c.kind != ColumnKind::Deletion));

        let (list, report) =
            crate::alignment::extract_mutations(&track, &crate::EngineConfig::default()).unwrap();
        assert!(list.is_empty());
        assert_eq!(report.unknown_residues, 1);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(
            GlobalAligner::default().align(b"", &reference("MFV")),
            Err(AlignmentError::EmptyInput)
        );
    }
}
