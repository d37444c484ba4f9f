//! Per-sequence state: raw input, anchored protein result, and the canonical
//! mutation list produced by comparing against a [`Reference`].
//!
//! Comparison runs in two stages. [`Sample::rough_compare`] finds a reading
//! frame (for nucleotide input) and anchors the protein on the reference
//! with exact-match probes. [`Sample::careful_compare`] then runs the full
//! [`AlignmentPrimitive`], extracts mutations and left-justifies deletions.
//! Both stages rebuild their outputs from scratch on every call.

mod coordinates;
mod glycosylation;
mod reference;

pub use coordinates::{organise_map, CoordinateMap};
pub use glycosylation::{find_sequons, glycosylation_changes};
pub use reference::Reference;

use thiserror::Error;
use tracing::{debug, warn};

use crate::alignment::{
    extract_mutations, left_justify_deletions, AlignmentError, AlignmentPrimitive, AlignmentTrack,
    CanonicalizationReport, ExtractionReport,
};
use crate::mutation::{
    dedup_mutations, mutation_summary, parse_summary, sort_mutations, Mutation, UNKNOWN_RESIDUE,
};
use crate::sequence::{roughly_align, ReadingFrameLocator};
use crate::EngineConfig;

/// Errors raised while comparing a single sample.
#[derive(Debug, Error)]
pub enum CompareError {
    /// Sample carries neither nucleotides nor a protein result.
    #[error("sample has no sequence to compare")]
    MissingSequence,

    /// Reference sequence is empty.
    #[error("reference sequence is empty")]
    EmptyReference,

    /// Every reading frame was tried and none anchored on the reference.
    #[error("no reading frame of '{name}' anchors on the reference")]
    NoAlignmentFound {
        /// Sample name.
        name: String,
    },

    /// Alignment primitive or track failure.
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
}

/// What one careful comparison produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareReport {
    /// Column counters from extraction.
    pub extraction: ExtractionReport,
    /// Deletion-run outcomes.
    pub canonical: CanonicalizationReport,
    /// Final mutation count, derived annotations included.
    pub mutations: usize,
    /// Whether the sample ended up flagged problematic.
    pub problematic: bool,
}

/// One loaded sequence and its comparison state.
#[derive(Debug, Clone)]
pub struct Sample {
    name: String,
    nucleotides: Option<String>,
    result: Option<String>,
    offset: i32,
    mutations: Vec<Mutation>,
    track: Option<AlignmentTrack>,
    compared: bool,
    problematic: bool,
    is_reference: bool,
    last_value: Option<String>,
}

impl Sample {
    /// Empty sample with no sequence and offset `-1`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nucleotides: None,
            result: None,
            offset: -1,
            mutations: Vec::new(),
            track: None,
            compared: false,
            problematic: false,
            is_reference: false,
            last_value: None,
        }
    }

    /// Sample with a protein result already set.
    pub fn protein(name: impl Into<String>, sequence: &str) -> Self {
        let mut sample = Self::new(name);
        sample.set_sequence(sequence, true);
        sample
    }

    /// Sample carrying raw nucleotides.
    pub fn nucleotide(name: impl Into<String>, sequence: &str) -> Self {
        let mut sample = Self::new(name);
        sample.set_sequence(sequence, false);
        sample
    }

    /// Store `sequence` as the protein result or as raw nucleotides.
    ///
    /// Alignment gap characters (`-`) are dropped; they mark absent
    /// residues in pre-aligned input, not sequence content.
    pub fn set_sequence(&mut self, sequence: &str, protein: bool) {
        let sequence: String = sequence.chars().filter(|&c| c != '-').collect();
        if protein {
            self.result = Some(sequence);
        } else {
            self.nucleotides = Some(sequence);
        }
    }

    /// Sample name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw nucleotides, cleared once a frame has been anchored.
    pub fn nucleotides(&self) -> Option<&str> {
        self.nucleotides.as_deref()
    }

    /// Protein result.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Whether a non-empty protein result is available.
    pub fn has_result(&self) -> bool {
        self.result.as_deref().is_some_and(|r| !r.is_empty())
    }

    /// Reference number of result index 0, or `-1` when unset.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Canonical mutation list in position order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Track from the last careful comparison.
    pub fn track(&self) -> Option<&AlignmentTrack> {
        self.track.as_ref()
    }

    /// Whether the mutation list is current.
    pub fn is_compared(&self) -> bool {
        self.compared
    }

    /// Whether the insertion-run heuristic (or a user) flagged this sample.
    pub fn is_problematic(&self) -> bool {
        self.problematic
    }

    /// Flag or unflag the sample by hand.
    pub fn set_problematic(&mut self, problematic: bool) {
        self.problematic = problematic;
    }

    /// Whether this sample is the collection baseline.
    pub fn is_reference(&self) -> bool {
        self.is_reference
    }

    /// Mark this sample as the collection baseline.
    pub fn set_reference(&mut self, is_reference: bool) {
        self.is_reference = is_reference;
    }

    /// Metadata value cached by the last reorder.
    pub fn last_value(&self) -> Option<&str> {
        self.last_value.as_deref()
    }

    /// Cache the metadata value used for ordering.
    pub fn set_last_value(&mut self, value: Option<String>) {
        self.last_value = value;
    }

    /// Drop all comparison output.
    pub fn clear_mutations(&mut self) {
        self.mutations.clear();
        self.track = None;
        self.compared = false;
        self.problematic = false;
    }

    /// Anchor the sample on `reference` without a full alignment.
    ///
    /// A sample that already has a protein result is trimmed to the anchored
    /// span; `Ok(false)` means no probe matched and the result is kept as it
    /// is. Otherwise reading frames of the nucleotides are tried in order
    /// until one anchors.
    pub fn rough_compare(
        &mut self,
        reference: &Reference,
        config: &EngineConfig,
    ) -> Result<bool, CompareError> {
        if reference.is_empty() {
            return Err(CompareError::EmptyReference);
        }

        if let Some(result) = self.result.clone().filter(|r| !r.is_empty()) {
            let anchored = self.anchor(result, reference, config);
            if !anchored {
                debug!(sample = %self.name, "protein result did not anchor");
            }
            return Ok(anchored);
        }

        let nucleotides = self
            .nucleotides
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or(CompareError::MissingSequence)?;

        for orf in ReadingFrameLocator::new(nucleotides.as_bytes()) {
            if self.anchor(orf.protein, reference, config) {
                return Ok(true);
            }
            debug!(sample = %self.name, start = orf.start, "reading frame rejected");
        }

        Err(CompareError::NoAlignmentFound {
            name: self.name.clone(),
        })
    }

    fn anchor(&mut self, candidate: String, reference: &Reference, config: &EngineConfig) -> bool {
        match roughly_align(
            &candidate,
            reference.sequence(),
            config.min_residues_before,
            config.probe_length,
        ) {
            Some(anchor) => {
                self.offset = reference.first_residue() + anchor.reference_index() as i32;
                self.result = Some(anchor.sequence);
                self.nucleotides = None;
                true
            }
            None => false,
        }
    }

    /// Align the result against `reference` and rebuild the mutation list.
    ///
    /// After this call `offset` is the reference's first residue number:
    /// leading truncation and extension are carried as terminal deletions
    /// and insertions in the list itself.
    pub fn careful_compare<A: AlignmentPrimitive>(
        &mut self,
        reference: &Reference,
        aligner: &A,
        config: &EngineConfig,
    ) -> Result<CompareReport, CompareError> {
        self.clear_mutations();

        let result = self
            .result
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or(CompareError::MissingSequence)?;
        if reference.is_empty() {
            return Err(CompareError::EmptyReference);
        }

        let track = aligner.align(result.as_bytes(), reference)?;
        let (mut mutations, extraction) = extract_mutations(&track, config)?;

        let canonical = if config.left_justify_deletions {
            left_justify_deletions(&mut mutations, reference, reference.span())
        } else {
            sort_mutations(&mut mutations);
            CanonicalizationReport::default()
        };

        self.offset = reference.first_residue();
        self.mutations = mutations;
        if config.annotate_glycosylation {
            self.annotate_glycosylation(reference);
        }
        dedup_mutations(&mut self.mutations);

        if extraction.problematic {
            warn!(sample = %self.name, run = extraction.longest_insertion_run, "flagged problematic");
        }
        self.problematic = extraction.problematic;
        self.compared = true;
        self.track = Some(track);

        Ok(CompareReport {
            extraction,
            canonical,
            mutations: self.mutations.len(),
            problematic: self.problematic,
        })
    }

    fn annotate_glycosylation(&mut self, reference: &Reference) {
        let Some(result) = self.result.as_deref() else {
            return;
        };
        let map = organise_map(result.len(), self.offset, &self.mutations);
        let changes = glycosylation_changes(result, &map, reference);
        self.mutations.extend(changes);
        sort_mutations(&mut self.mutations);
    }

    /// Replace the mutation list with a stored summary.
    ///
    /// Malformed tokens are skipped with a warning. More than
    /// `max_insertion_run` insertions flags the sample problematic.
    pub fn load_mutations(
        &mut self,
        summary: &str,
        reference: &Reference,
        config: &EngineConfig,
    ) -> CanonicalizationReport {
        self.clear_mutations();
        let (mut mutations, errors) = parse_summary(summary);
        for err in &errors {
            warn!(sample = %self.name, %err, "skipping stored mutation");
        }

        let insertions = mutations.iter().filter(|m| m.is_addition()).count();
        self.problematic = insertions > config.max_insertion_run;
        self.compared = true;
        self.offset = reference.first_residue();

        let report = if config.left_justify_deletions {
            left_justify_deletions(&mut mutations, reference, reference.span())
        } else {
            sort_mutations(&mut mutations);
            CanonicalizationReport::default()
        };
        dedup_mutations(&mut mutations);
        self.mutations = mutations;
        report
    }

    /// Whether the list contains exactly `mutation`.
    pub fn has_mutation(&self, mutation: &Mutation) -> bool {
        self.mutations.contains(mutation)
    }

    /// Mutations of `self` that `other` lacks.
    pub fn one_sided_mutations(&self, other: &Sample) -> usize {
        self.mutations
            .iter()
            .filter(|m| !other.has_mutation(m))
            .count()
    }

    /// Size of the symmetric difference of the two mutation lists.
    pub fn shared_mutations(&self, other: &Sample) -> usize {
        self.one_sided_mutations(other) + other.one_sided_mutations(self)
    }

    /// `exp(-(d/4)^2)` where `d` is [`shared_mutations`](Self::shared_mutations).
    pub fn similarity(&self, other: &Sample) -> f64 {
        let d = self.shared_mutations(other) as f64 / 4.0;
        (-(d * d)).exp()
    }

    /// Map between result indices and reference numbers.
    pub fn coordinate_map(&self) -> CoordinateMap {
        let len = self.result.as_deref().map_or(0, str::len);
        organise_map(len, self.offset, &self.mutations)
    }

    /// Sample residue at reference number `position`.
    pub fn letter(&self, map: &CoordinateMap, position: i32) -> Option<u8> {
        let index = map.sample_index(position)?;
        self.result.as_deref()?.as_bytes().get(index).copied()
    }

    /// Unknown residues in the result.
    pub fn gap_count(&self) -> usize {
        self.result
            .as_deref()
            .map_or(0, |r| r.bytes().filter(|&b| b == UNKNOWN_RESIDUE).count())
    }

    /// Space-joined mutation tokens.
    pub fn mutation_summary(&self) -> String {
        mutation_summary(&self.mutations)
    }

    /// Content hash of name, offset, flags and mutation list.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(&self.offset.to_le_bytes());
        hasher.update(&[self.compared as u8, self.problematic as u8]);
        hasher.update(self.mutation_summary().as_bytes());
        hasher.finalize()
    }
}
