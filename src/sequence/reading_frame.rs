use crate::mutation::UNKNOWN_RESIDUE;

const START_CODON: &[u8] = b"ATG";
const STOP_CODONS: [&[u8]; 3] = [b"TAA", b"TAG", b"TGA"];

/// Translate one codon with the standard genetic code.
///
/// Stop codons, ambiguous bases and short trailing codons translate to
/// [`UNKNOWN_RESIDUE`].
pub fn translate_codon(codon: &[u8]) -> u8 {
    let codon: [u8; 3] = match codon {
        [a, b, c] => [a.to_ascii_uppercase(), b.to_ascii_uppercase(), c.to_ascii_uppercase()],
        _ => return UNKNOWN_RESIDUE,
    };

    match &codon {
        b"TTT" | b"TTC" => b'F',
        b"TTA" | b"TTG" | b"CTT" | b"CTC" | b"CTA" | b"CTG" => b'L',
        b"ATT" | b"ATC" | b"ATA" => b'I',
        b"ATG" => b'M',
        b"GTT" | b"GTC" | b"GTA" | b"GTG" => b'V',
        b"TCT" | b"TCC" | b"TCA" | b"TCG" | b"AGT" | b"AGC" => b'S',
        b"CCT" | b"CCC" | b"CCA" | b"CCG" => b'P',
        b"ACT" | b"ACC" | b"ACA" | b"ACG" => b'T',
        b"GCT" | b"GCC" | b"GCA" | b"GCG" => b'A',
        b"TAT" | b"TAC" => b'Y',
        b"CAT" | b"CAC" => b'H',
        b"CAA" | b"CAG" => b'Q',
        b"AAT" | b"AAC" => b'N',
        b"AAA" | b"AAG" => b'K',
        b"GAT" | b"GAC" => b'D',
        b"GAA" | b"GAG" => b'E',
        b"TGT" | b"TGC" => b'C',
        b"TGG" => b'W',
        b"AGA" | b"AGG" | b"CGT" | b"CGC" | b"CGA" | b"CGG" => b'R',
        b"GGA" | b"GGG" | b"GGT" | b"GGC" => b'G',
        _ => UNKNOWN_RESIDUE,
    }
}

/// Candidate open reading frame and its translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenReadingFrame {
    /// Index of the `ATG` in the nucleotide sequence.
    pub start: usize,
    /// Index of the in-frame stop codon.
    pub stop: usize,
    /// Translation from `start` up to and including the stop codon.
    pub protein: String,
}

/// Enumerates candidate ORFs of a nucleotide sequence.
///
/// Every `ATG` is tried in turn, whatever its frame. For each one the stop
/// codon is searched backwards from the end of the sequence, so the ORF is
/// the longest one in that frame rather than the first.
#[derive(Debug, Clone)]
pub struct ReadingFrameLocator {
    seq: Vec<u8>,
    orf: isize,
    stop: isize,
}

impl ReadingFrameLocator {
    /// Create a locator over `nucleotides` (case-insensitive, `U` read as `T`).
    pub fn new(nucleotides: &[u8]) -> Self {
        let seq = nucleotides
            .iter()
            .map(|b| match b.to_ascii_uppercase() {
                b'U' => b'T',
                other => other,
            })
            .collect();
        Self {
            seq,
            orf: -1,
            stop: -1,
        }
    }

    /// Index of the current ORF start, if one has been found.
    pub fn orf_start(&self) -> Option<usize> {
        usize::try_from(self.orf).ok()
    }

    /// Index of the current stop codon, if one has been found.
    pub fn stop_index(&self) -> Option<usize> {
        usize::try_from(self.stop).ok()
    }

    fn codon_at(&self, idx: isize) -> Option<&[u8]> {
        let idx = usize::try_from(idx).ok()?;
        self.seq.get(idx..idx + 3)
    }

    /// Advance to the next `ATG`, one nucleotide past the previous hit.
    pub fn find_next_atg(&mut self) -> bool {
        self.orf += 1;
        let limit = self.seq.len() as isize - 3;

        while self.orf < limit {
            if self.codon_at(self.orf) == Some(START_CODON) {
                self.stop = self.seq.len() as isize - 1;
                return true;
            }
            self.orf += 1;
        }

        false
    }

    /// Scan backwards from the sequence end, in the frame of the current
    /// `ATG`, for the last in-frame stop codon.
    pub fn find_next_stop_codon(&mut self) -> bool {
        self.stop -= 1;
        let remainder = (self.stop - self.orf).rem_euclid(3);
        self.stop -= remainder;

        while self.stop > self.orf + 3 {
            if let Some(codon) = self.codon_at(self.stop) {
                if STOP_CODONS.contains(&codon) {
                    return true;
                }
            }
            self.stop -= 3;
        }

        false
    }

    /// Locate the next `ATG` and its stop codon. `false` means no further ORF.
    pub fn find_next_orf(&mut self) -> bool {
        self.find_next_atg() && self.find_next_stop_codon()
    }

    /// Translate the current ORF from its start through the stop codon.
    pub fn generate_sequence(&self) -> String {
        let (Some(start), Some(stop)) = (self.orf_start(), self.stop_index()) else {
            return String::new();
        };

        (start..stop + 3)
            .step_by(3)
            .map(|i| {
                let end = (i + 3).min(self.seq.len());
                translate_codon(self.seq.get(i..end).unwrap_or_default()) as char
            })
            .collect()
    }
}

impl Iterator for ReadingFrameLocator {
    type Item = OpenReadingFrame;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.find_next_orf() {
            return None;
        }
        Some(OpenReadingFrame {
            start: self.orf_start()?,
            stop: self.stop_index()?,
            protein: self.generate_sequence(),
        })
    }
}
