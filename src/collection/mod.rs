//! Sample arena, metadata, and the group tree built over it.
//!
//! Samples live in one [`SampleStore`] and are addressed by [`SampleId`].
//! Groups hold ids only, so a sample can sit in many groups without knowing
//! about any of them. The first sample added is the collection reference.

mod aggregate;
mod group;
pub mod io;

pub use aggregate::{MutationCensus, RepresentativeSet};
pub use group::{Group, GroupId, GroupTree, Node};

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::alignment::{AlignmentPrimitive, CanonicalizationReport};
use crate::sample::{CompareError, Reference, Sample};
use crate::EngineConfig;
use io::{MetadataTable, MUTATIONS_TITLE};

/// Handle to a sample in a [`SampleStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleId(usize);

impl SampleId {
    /// Insertion index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Errors raised by store and group operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A sample with this name is already stored.
    #[error("sample '{0}' already exists")]
    DuplicateName(String),

    /// No sample has this name.
    #[error("no sample named '{0}'")]
    UnknownSample(String),

    /// No metadata column has this title.
    #[error("cannot find title '{0}' in metadata")]
    UnknownTitle(String),

    /// The first sample must carry a protein sequence to serve as reference.
    #[error("reference '{0}' has no protein sequence")]
    ReferenceWithoutProtein(String),

    /// The store has no reference sample with a protein result.
    #[error("no reference sequence loaded")]
    NoReference,

    /// Group handle does not exist or was removed.
    #[error("unknown group {0}")]
    UnknownGroup(usize),

    /// Operation needs samples beyond the reference.
    #[error("group has no samples beyond the reference")]
    EmptyGroup,

    /// The root group cannot be removed.
    #[error("the root group cannot be removed")]
    RootGroup,
}

/// Tally of a bulk comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Samples freshly compared.
    pub compared: usize,
    /// Reference or already-compared samples left alone.
    pub skipped: usize,
    /// Samples whose comparison failed.
    pub failed: usize,
    /// Compared samples flagged problematic.
    pub problematic: usize,
    /// Deletion-run outcomes summed over the batch.
    pub canonical: CanonicalizationReport,
}

/// Outcome of attaching a metadata table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataReport {
    /// Rows matched to a stored sample.
    pub assigned: usize,
    /// Rows kept for samples not loaded yet.
    pub unmatched: usize,
    /// Rows the reader dropped.
    pub skipped: usize,
    /// Samples whose mutation list came from the `mutations` column.
    pub mutations_loaded: usize,
}

/// Central sample arena with per-name metadata and a group tree.
#[derive(Debug)]
pub struct SampleStore {
    samples: Vec<Sample>,
    names: HashMap<String, SampleId>,
    titles: Vec<String>,
    metadata: HashMap<String, BTreeMap<String, String>>,
    first_residue: i32,
    groups: GroupTree,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore {
    /// Empty store; reference numbering starts at 1.
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            names: HashMap::new(),
            titles: Vec::new(),
            metadata: HashMap::new(),
            first_residue: 1,
            groups: GroupTree::new(),
        }
    }

    /// Number the reference's first residue `first_residue`.
    pub fn with_first_residue(mut self, first_residue: i32) -> Self {
        self.first_residue = first_residue;
        self
    }

    /// Stored sample count, reference included.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Add `sample` to the arena and the root group.
    ///
    /// The first sample becomes the reference and must carry a protein
    /// result; nucleotide or empty input is rejected. Later samples are anchored
    /// on the reference right away (nucleotide samples by reading frame,
    /// protein samples by trimming their result); metadata
    /// already known for the name is attached and a stored `mutations`
    /// value is loaded.
    pub fn add_sample(
        &mut self,
        mut sample: Sample,
        config: &EngineConfig,
    ) -> Result<SampleId, StoreError> {
        if self.names.contains_key(sample.name()) {
            return Err(StoreError::DuplicateName(sample.name().to_string()));
        }

        let id = SampleId(self.samples.len());
        if id.0 == 0 {
            if !sample.has_result() {
                warn!(sample = sample.name(), "reference has no protein sequence");
                return Err(StoreError::ReferenceWithoutProtein(sample.name().to_string()));
            }
            sample.set_reference(true);
        } else if sample.has_result() || sample.nucleotides().is_some() {
            if let Ok(reference) = self.reference() {
                match sample.rough_compare(&reference, config) {
                    Ok(true) => {}
                    Ok(false) => debug!(sample = sample.name(), "kept unanchored result"),
                    Err(err) => warn!(sample = sample.name(), %err, "rough comparison failed"),
                }
            }
        }

        self.names.insert(sample.name().to_string(), id);
        self.samples.push(sample);
        self.groups.push_sample(GroupTree::ROOT, id);
        self.load_stored_mutations(id, config);
        Ok(id)
    }

    /// Sample by handle.
    pub fn sample(&self, id: SampleId) -> &Sample {
        &self.samples[id.0]
    }

    /// Mutable sample by handle.
    pub fn sample_mut(&mut self, id: SampleId) -> &mut Sample {
        &mut self.samples[id.0]
    }

    /// Handle for `name`.
    pub fn id(&self, name: &str) -> Result<SampleId, StoreError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::UnknownSample(name.to_string()))
    }

    /// All samples in insertion order.
    pub fn samples(&self) -> impl Iterator<Item = (SampleId, &Sample)> {
        self.samples.iter().enumerate().map(|(i, s)| (SampleId(i), s))
    }

    /// Snapshot of the reference sample's protein result.
    pub fn reference(&self) -> Result<Reference, StoreError> {
        let sample = self.samples.first().ok_or(StoreError::NoReference)?;
        let sequence = sample
            .result()
            .filter(|r| !r.is_empty())
            .ok_or(StoreError::NoReference)?;
        Ok(Reference::new(sample.name(), sequence, self.first_residue))
    }

    /// Group tree.
    pub fn groups(&self) -> &GroupTree {
        &self.groups
    }

    /// Metadata titles, identifier column first.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Whether `title` is a metadata column.
    pub fn has_title(&self, title: &str) -> bool {
        self.titles.iter().any(|t| t == title)
    }

    /// Metadata value for a sample; empty when unset.
    pub fn value_for(&self, id: SampleId, title: &str) -> &str {
        self.metadata
            .get(self.samples[id.0].name())
            .and_then(|kv| kv.get(title))
            .map_or("", String::as_str)
    }

    /// Attach a metadata table. Rows are kept by name, so samples added
    /// later still pick up their values. A `mutations` column is loaded
    /// into every matching sample.
    pub fn load_metadata(&mut self, table: MetadataTable, config: &EngineConfig) -> MetadataReport {
        let mut report = MetadataReport {
            skipped: table.skipped,
            ..MetadataReport::default()
        };
        if let Some(id_title) = table.titles.first() {
            info!(identifier = %id_title, "treating first metadata column as sample identifier");
        }

        for row in table.rows {
            if self.names.contains_key(&row.id) {
                report.assigned += 1;
            } else {
                report.unmatched += 1;
            }
            self.metadata.insert(row.id, row.values);
        }

        for title in table.titles {
            if !self.has_title(&title) {
                self.titles.push(title);
            }
        }

        if self.has_title(MUTATIONS_TITLE) {
            for i in 0..self.samples.len() {
                if self.load_stored_mutations(SampleId(i), config) {
                    report.mutations_loaded += 1;
                }
            }
        }

        info!(
            assigned = report.assigned,
            unmatched = report.unmatched,
            skipped = report.skipped,
            "loaded metadata"
        );
        report
    }

    fn load_stored_mutations(&mut self, id: SampleId, config: &EngineConfig) -> bool {
        let Some(summary) = self
            .metadata
            .get(self.samples[id.0].name())
            .and_then(|kv| kv.get(MUTATIONS_TITLE))
            .cloned()
        else {
            return false;
        };
        let Ok(reference) = self.reference() else {
            warn!("stored mutations need a reference; skipping");
            return false;
        };
        self.samples[id.0].load_mutations(&summary, &reference, config);
        true
    }

    /// Reorder the root group by a metadata column.
    pub fn reorder_by(&mut self, title: &str) -> Result<(), StoreError> {
        self.reorder_group(GroupTree::ROOT, title)
    }

    /// Careful-compare samples `range` (insertion order) against the
    /// reference. The reference and already-compared samples are skipped;
    /// failures are logged and counted, never fatal.
    pub fn compare_range<A: AlignmentPrimitive>(
        &mut self,
        range: Range<usize>,
        aligner: &A,
        config: &EngineConfig,
    ) -> Result<BatchReport, StoreError> {
        let reference = self.reference()?;
        let end = range.end.min(self.samples.len());
        let start = range.start.min(end);
        let total = end - start;
        let step = (total / 10).max(1);
        let mut report = BatchReport::default();

        for (done, sample) in self.samples[start..end].iter_mut().enumerate() {
            if sample.is_reference() || sample.is_compared() {
                report.skipped += 1;
                continue;
            }

            match sample.careful_compare(&reference, aligner, config) {
                Ok(outcome) => {
                    report.compared += 1;
                    report.problematic += usize::from(outcome.problematic);
                    report.canonical += outcome.canonical;
                }
                Err(err @ CompareError::MissingSequence) => {
                    debug!(sample = sample.name(), %err, "nothing to compare");
                    report.failed += 1;
                }
                Err(err) => {
                    warn!(sample = sample.name(), %err, "comparison failed");
                    report.failed += 1;
                }
            }

            if config.verbose && (done + 1) % step == 0 {
                info!(done = done + 1, total, "bulk comparison progress");
            }
        }

        info!(
            compared = report.compared,
            skipped = report.skipped,
            failed = report.failed,
            problematic = report.problematic,
            unresolved = report.canonical.runs_unresolved,
            "bulk comparison finished"
        );
        Ok(report)
    }

    /// Content hash over every sample fingerprint in insertion order.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for sample in &self.samples {
            hasher.update(sample.fingerprint().as_bytes());
        }
        hasher.finalize()
    }
}
