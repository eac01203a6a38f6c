use std::collections::BTreeMap;

use pyo3::{exceptions::PyValueError, prelude::*};

use crate::{
    loader::parse_mol_block, metrics::Metric, molecule::MolecularGraph, scorer::Scorer,
};

fn to_py_err<E: std::fmt::Display>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn load(mol_block: &str) -> PyResult<MolecularGraph> {
    parse_mol_block(mol_block).map_err(to_py_err)
}

/// Return the Proudfoot `(CM, CM*, Cse)` of a molfile block.
#[pyfunction]
fn molecular_complexity(mol_block: &str) -> PyResult<(f64, f64, f64)> {
    let graph = load(mol_block)?;
    let names = [
        Metric::ProudfootCm.name(),
        Metric::ProudfootCmStar.name(),
        Metric::ProudfootCse.name(),
    ];
    let scores = Scorer::default()
        .score(&graph, &names)
        .map_err(to_py_err)?;
    Ok((scores[0].value(), scores[1].value(), scores[2].value()))
}

/// Score a molfile block with the named metrics, returning `{name: value}`.
#[pyfunction]
fn complexity_scores(mol_block: &str, metrics: Vec<String>) -> PyResult<BTreeMap<String, f64>> {
    let graph = load(mol_block)?;
    let scores = Scorer::default().score(&graph, metrics.as_slice()).map_err(to_py_err)?;
    Ok(scores
        .into_iter()
        .map(|s| (s.name().to_string(), s.value()))
        .collect())
}

/// A Python module implemented in Rust. The name of this function must match
/// the `lib.name` setting in the `Cargo.toml`, else Python will not be able to
/// import the module.
#[pymodule]
#[pyo3(name = "molecular_complexity")]
fn _molecular_complexity(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(molecular_complexity, m)?)?;
    m.add_function(wrap_pyfunction!(complexity_scores, m)?)?;
    Ok(())
}
