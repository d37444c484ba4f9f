//! Python bindings that expose the mutation engine via PyO3.
use pyo3::{exceptions::PyRuntimeError, prelude::*, types::PyModule};

use crate::{EngineConfig, GroupTree, MutationEngine, Sample};

fn runtime_error(err: impl std::fmt::Display) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

/// Python-facing mutation engine over one reference.
#[pyclass(unsendable)]
#[derive(Debug)]
pub struct PyMutationEngine {
    engine: MutationEngine,
}

#[pymethods]
impl PyMutationEngine {
    #[new]
    #[pyo3(signature = (reference_name, reference, left_justify = true, glycosylation = false))]
    /// Create the engine around a reference protein.
    pub fn new(
        reference_name: String,
        reference: String,
        left_justify: bool,
        glycosylation: bool,
    ) -> PyResult<Self> {
        let config = EngineConfig::default()
            .with_left_justify_deletions(left_justify)
            .with_glycosylation(glycosylation);
        let mut engine = MutationEngine::new(config).map_err(runtime_error)?;
        engine
            .add_sample(Sample::protein(reference_name, &reference))
            .map_err(runtime_error)?;
        Ok(Self { engine })
    }

    /// Add a sample.
    ///
    /// Args:
    ///     name: Unique sample name.
    ///     sequence: Protein, or nucleotides when `nucleotide` is true.
    ///     nucleotide: Translate and anchor the sequence first.
    #[pyo3(signature = (name, sequence, nucleotide = false))]
    pub fn add_sample(&mut self, name: String, sequence: String, nucleotide: bool) -> PyResult<()> {
        let sample = if nucleotide {
            Sample::nucleotide(name, &sequence)
        } else {
            Sample::protein(name, &sequence)
        };
        self.engine.add_sample(sample).map_err(runtime_error)?;
        Ok(())
    }

    /// Compare every pending sample. Returns `(compared, failed, problematic)`.
    pub fn compare_all(&mut self) -> PyResult<(usize, usize, usize)> {
        let report = self.engine.compare_all().map_err(runtime_error)?;
        Ok((report.compared, report.failed, report.problematic))
    }

    /// `(name, mutation summary)` for every compared sample.
    pub fn mutations(&self) -> Vec<(String, String)> {
        self.engine
            .store()
            .samples()
            .filter(|(_, s)| s.is_compared())
            .map(|(_, s)| (s.name().to_string(), s.mutation_summary()))
            .collect()
    }

    /// Names of samples satisfying a requirement expression.
    pub fn filter(&self, expression: &str) -> PyResult<Vec<String>> {
        let hits = self.engine.filter(expression).map_err(runtime_error)?;
        Ok(hits
            .into_iter()
            .map(|id| self.engine.store().sample(id).name().to_string())
            .collect())
    }

    /// Representative mutation signature of all samples.
    pub fn describe(&self) -> PyResult<String> {
        self.engine.describe(GroupTree::ROOT).map_err(runtime_error)
    }
}

/// Create Python module.
#[pymodule]
pub fn mutscan_py(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyMutationEngine>()?;
    Ok(())
}
