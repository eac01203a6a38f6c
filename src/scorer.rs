//! Score molecules against one or more named metrics.
//!
//! A call to [`Scorer::score`] validates the graph, resolves every requested
//! metric name, extracts the [`FeatureSet`] once and then evaluates the
//! metrics in request order. A malformed graph is reported before any metric
//! name is looked at, and an unknown name is reported before any feature is
//! computed.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    error::Result,
    features::{extract_molecule, FeatureSet},
    metrics::{ComplexityScore, MetricRegistry},
    molecule::{MolecularGraph, Molecule},
};

/// Evaluates metrics from a [`MetricRegistry`].
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    registry: MetricRegistry,
    breakdown: bool,
}

impl Scorer {
    pub fn new(registry: MetricRegistry) -> Self {
        Self {
            registry,
            breakdown: false,
        }
    }

    /// Attach per-feature contributions to every score.
    pub fn with_breakdown(mut self, breakdown: bool) -> Self {
        self.breakdown = breakdown;
        self
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Score `graph` with the metrics in `names`, in the given order.
    pub fn score<S: AsRef<str>>(
        &self,
        graph: &MolecularGraph,
        names: &[S],
    ) -> Result<Vec<ComplexityScore>> {
        let _span = tracing::debug_span!("score", metrics = names.len()).entered();

        let mol = Molecule::try_from(graph)?;
        let entries = self.registry.resolve(names)?;
        let features = extract_molecule(&mol)?;

        Ok(entries
            .into_iter()
            .map(|entry| entry.evaluate(&features, self.breakdown))
            .collect())
    }

    /// Score every graph of `graphs` in parallel. Results are returned in
    /// input order; a failing graph does not affect the others.
    pub fn score_batch<S>(
        &self,
        graphs: &[MolecularGraph],
        names: &[S],
    ) -> Vec<Result<Vec<ComplexityScore>>>
    where
        S: AsRef<str> + Sync,
    {
        graphs.par_iter().map(|g| self.score(g, names)).collect()
    }

    /// Validate `graph` and return its features without evaluating metrics.
    pub fn features(&self, graph: &MolecularGraph) -> Result<FeatureSet> {
        extract_molecule(&Molecule::try_from(graph)?)
    }
}

/// Score `graph` against the built-in metrics with their default weights.
pub fn score<S: AsRef<str>>(graph: &MolecularGraph, names: &[S]) -> Result<Vec<ComplexityScore>> {
    Scorer::default().score(graph, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        metrics::Metric,
        molecule::{Atom, BondOrder, Element, Hybridization},
    };

    fn ethanol() -> MolecularGraph {
        let mut g = MolecularGraph::new();
        let sp3 = |e, h| {
            Atom::new(e)
                .with_hybridization(Hybridization::Sp3)
                .with_hydrogens(h)
        };
        let c1 = g.add_atom(sp3(Element::Carbon, 3));
        let c2 = g.add_atom(sp3(Element::Carbon, 2));
        let o = g.add_atom(sp3(Element::Oxygen, 1));
        g.add_bond(c1, c2, BondOrder::Single);
        g.add_bond(c2, o, BondOrder::Single);
        g
    }

    #[test]
    fn scores_follow_request_order() {
        let scores = score(&ethanol(), &["ring_stereo", "proudfoot_cm"]).unwrap();
        let names: Vec<_> = scores.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["ring_stereo", "proudfoot_cm"]);
    }

    #[test]
    fn empty_request_gives_no_scores() {
        assert!(score::<&str>(&ethanol(), &[]).unwrap().is_empty());
    }

    #[test]
    fn structure_errors_come_before_configuration_errors() {
        let mut g = ethanol();
        g.add_bond(0, 0, BondOrder::Single);
        let err = score(&g, &["no_such_metric"]).unwrap_err();
        assert!(err.is_invalid_structure(), "{err}");

        let err = score(&ethanol(), &["no_such_metric"]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn breakdown_sums_to_score() {
        let scorer = Scorer::default().with_breakdown(true);
        let names: Vec<&str> = Metric::ALL.iter().map(Metric::name).collect();
        for score in scorer.score(&ethanol(), &names).unwrap() {
            let total: f64 = score.contributions().unwrap().values().sum();
            assert!((total - score.value()).abs() < 1e-9, "{}", score.name());
        }
    }

    #[test]
    fn batch_keeps_input_order() {
        let mut bad = ethanol();
        bad.add_bond(0, 9, BondOrder::Single);
        let graphs = vec![ethanol(), bad, MolecularGraph::new()];

        let results = Scorer::default().score_batch(&graphs, &["proudfoot_cm"]);
        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap()[0].value() > 0.0);
        assert!(results[1].as_ref().unwrap_err().is_invalid_structure());
        assert_eq!(results[2].as_ref().unwrap()[0].value(), 0.0);
    }
}
