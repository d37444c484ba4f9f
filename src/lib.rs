//! # Canonical mutation calling against a reference protein
//!
//! Given a reference amino-acid sequence and many sample sequences
//! (nucleotide or protein), this crate finds the reading frame, aligns each
//! sample to the reference and turns the alignment into a deterministic list
//! of substitutions, insertions and deletions in reference numbering.
//!
//! ## Pipeline
//!
//! 1. **Reading frame**: nucleotide samples are translated ORF by ORF
//!    ([`sequence::ReadingFrameLocator`]) until one anchors on the reference.
//! 2. **Anchor**: exact-match probes fix a rough offset
//!    ([`sequence::roughly_align`]) before any expensive alignment.
//! 3. **Alignment**: an [`alignment::AlignmentPrimitive`] produces a
//!    three-row track; [`alignment::GlobalAligner`] is the default.
//! 4. **Extraction and canonicalization**: the track becomes a mutation
//!    list whose deletion runs are moved to their leftmost equivalent
//!    placement, so lists compare across samples and aligner versions.
//! 5. **Queries**: requirement expressions ([`query::RequirementSet`]) and
//!    frequency aggregation ([`collection::MutationCensus`]) over a
//!    [`collection::SampleStore`].
//!
//! ## Usage Example
//!
//! ```
//! use mutscan::{EngineConfig, MutationEngine, Sample};
//!
//! let mut engine = MutationEngine::new(EngineConfig::default()).unwrap();
//! engine.add_sample(Sample::protein("ref", "MFVFLVLLPLVSSQCVNLTTRTQLPP")).unwrap();
//! engine.add_sample(Sample::protein("s1", "MFVFLVLLPLVSSQCVNLTNRTQLPP")).unwrap();
//! engine.compare_all().unwrap();
//! let hits = engine.filter("20N").unwrap();
//! assert_eq!(hits.len(), 1);
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod alignment;  // Tracks, extraction, canonicalization, default aligner
pub mod collection; // Sample arena, groups, aggregation, tables
pub mod mutation;   // Mutation tokens
pub mod query;      // Requirement expressions
pub mod sample;     // Per-sample comparison state
pub mod sequence;   // Reading frames and anchoring
/// Python bindings for exposing the engine to external runtimes.
#[cfg(feature = "python-bindings")]
pub mod python_bindings;

// Re-exports for convenience
pub use alignment::{AlignmentPrimitive, AlignmentTrack, GlobalAligner};
pub use collection::{BatchReport, GroupId, GroupTree, SampleId, SampleStore, StoreError};
pub use mutation::{Change, Mutation, MutationParseError};
pub use query::{Requirement, RequirementSet};
pub use sample::{CompareError, CompareReport, Reference, Sample};

use thiserror::Error;
use tracing::debug;

/// Configuration threaded into every comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Move deletion runs to their leftmost equivalent placement.
    pub left_justify_deletions: bool,
    /// Anchor probe length; probes are taken every `probe_length / 2`.
    pub probe_length: usize,
    /// Residues to keep ahead of the anchored start.
    pub min_residues_before: usize,
    /// Longest tolerated internal insertion run.
    pub max_insertion_run: usize,
    /// Trailing track columns exempt from the insertion-run check.
    pub terminal_leniency: usize,
    /// Append derived glycosylation-site gains and losses.
    pub annotate_glycosylation: bool,
    /// Leave problematic samples out of filters and aggregation.
    pub exclude_problematic: bool,
    /// Enable verbose logging.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            left_justify_deletions: true,
            probe_length: sequence::DEFAULT_PROBE_LENGTH,
            min_residues_before: 0,
            max_insertion_run: 10,
            terminal_leniency: 10,
            annotate_glycosylation: false,
            exclude_problematic: true,
            verbose: false,
        }
    }
}

impl EngineConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_length == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "probe length must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Toggle deletion left-justification.
    pub fn with_left_justify_deletions(mut self, enabled: bool) -> Self {
        self.left_justify_deletions = enabled;
        self
    }

    /// Set the anchor probe length.
    pub fn with_probe_length(mut self, probe_length: usize) -> Self {
        self.probe_length = probe_length;
        self
    }

    /// Keep `residues` ahead of the anchored start.
    pub fn with_min_residues_before(mut self, residues: usize) -> Self {
        self.min_residues_before = residues;
        self
    }

    /// Set the insertion-run threshold.
    pub fn with_max_insertion_run(mut self, run: usize) -> Self {
        self.max_insertion_run = run;
        self
    }

    /// Set the trailing leniency window.
    pub fn with_terminal_leniency(mut self, columns: usize) -> Self {
        self.terminal_leniency = columns;
        self
    }

    /// Toggle glycosylation annotations.
    pub fn with_glycosylation(mut self, enabled: bool) -> Self {
        self.annotate_glycosylation = enabled;
        self
    }

    /// Toggle exclusion of problematic samples.
    pub fn with_exclude_problematic(mut self, enabled: bool) -> Self {
        self.exclude_problematic = enabled;
        self
    }

    /// Enable verbose mode.
    pub fn with_verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }
}

/// Invalid configuration values.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A parameter is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors surfaced by [`MutationEngine`].
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Store or group operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Single-sample comparison failed.
    #[error(transparent)]
    Compare(#[from] CompareError),

    /// Table or FASTA input/output failed.
    #[error(transparent)]
    Io(#[from] collection::io::IoError),
}

/// Orchestrates a [`SampleStore`] and an alignment primitive under one
/// [`EngineConfig`].
#[derive(Debug)]
pub struct MutationEngine<A: AlignmentPrimitive = GlobalAligner> {
    config: EngineConfig,
    aligner: A,
    store: SampleStore,
}

impl MutationEngine<GlobalAligner> {
    /// Engine with the default aligner.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_aligner(config, GlobalAligner::default())
    }
}

impl<A: AlignmentPrimitive> MutationEngine<A> {
    /// Engine with a caller-supplied alignment primitive.
    pub fn with_aligner(config: EngineConfig, aligner: A) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            aligner,
            store: SampleStore::new(),
        })
    }

    /// Replace the store (e.g. one numbered from a different residue).
    pub fn with_store(mut self, store: SampleStore) -> Self {
        self.store = store;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Underlying store.
    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Mutable store, for group operations.
    pub fn store_mut(&mut self) -> &mut SampleStore {
        &mut self.store
    }

    /// Add a sample; the first one added is the reference.
    pub fn add_sample(&mut self, sample: Sample) -> Result<SampleId, EngineError> {
        Ok(self.store.add_sample(sample, &self.config)?)
    }

    /// Re-run the careful comparison for one sample.
    pub fn compare_sample(&mut self, id: SampleId) -> Result<CompareReport, EngineError> {
        let reference = self.store.reference()?;
        let report = self
            .store
            .sample_mut(id)
            .careful_compare(&reference, &self.aligner, &self.config)?;
        debug!(sample = id.index(), mutations = report.mutations, "compared sample");
        Ok(report)
    }

    /// Compare every sample not yet compared.
    pub fn compare_all(&mut self) -> Result<BatchReport, EngineError> {
        let len = self.store.len();
        Ok(self.store.compare_range(0..len, &self.aligner, &self.config)?)
    }

    /// Non-reference samples of the root group satisfying `expression`.
    pub fn filter(&self, expression: &str) -> Result<Vec<SampleId>, EngineError> {
        let requirements = RequirementSet::parse(expression);
        let root = self.store.groups().get(GroupTree::ROOT)?;
        Ok(root
            .members()
            .iter()
            .copied()
            .filter(|&id| {
                let sample = self.store.sample(id);
                !sample.is_reference()
                    && !(self.config.exclude_problematic && sample.is_problematic())
                    && requirements.matches(sample)
            })
            .collect())
    }

    /// Build a requirement group under the root.
    pub fn requirement_group(&mut self, expression: &str) -> Result<GroupId, EngineError> {
        Ok(self
            .store
            .requirement_group(GroupTree::ROOT, expression, &self.config)?)
    }

    /// Representative signature of a group.
    pub fn describe(&self, group: GroupId) -> Result<String, EngineError> {
        Ok(self.store.describe(group, &self.config)?.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = EngineConfig::default();
        assert!(config.left_justify_deletions);
        assert_eq!(config.probe_length, 10);
        assert_eq!(config.max_insertion_run, 10);
        assert_eq!(config.terminal_leniency, 10);
        assert!(config.exclude_problematic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_probe_length_is_rejected() {
        let config = EngineConfig::default().with_probe_length(0);
        assert!(matches!(
            MutationEngine::new(config),
            Err(EngineError::Config(ConfigError::InvalidConfiguration(_)))
        ));
    }

    #[test]
    fn engine_compares_and_filters() {
        let mut engine = MutationEngine::new(EngineConfig::default()).unwrap();
        engine
            .add_sample(Sample::protein("ref", "MFVFLVLLPLVSSQCVNLTTRTQLPPAYTNSF"))
            .unwrap();
        let a = engine
            .add_sample(Sample::protein("a", "MFVFLVLLPLVSSQCVNLTNRTQLPPAYTNSF"))
            .unwrap();
        engine
            .add_sample(Sample::protein("b", "MFVFLVLLPLVSSQCVNLTTRTQLPPAYTNSF"))
            .unwrap();

        let report = engine.compare_all().unwrap();
        assert_eq!(report.compared, 2);
        assert_eq!(engine.filter("T20N").unwrap(), vec![a]);
        assert_eq!(engine.filter("!20N").unwrap().len(), 1);

        let group = engine.requirement_group("20N").unwrap();
        assert_eq!(engine.describe(group).unwrap(), "T20N");
    }
}
