//! Named complexity metrics and the registry that selects them.
//!
//! Every metric is a weighted combination of [`FeatureSet`] entries. The
//! weights of the built-in metrics are declared as named constants below so
//! each formula can be checked against worked examples on its own, and a
//! [`MetricRegistry`] can carry substitute weights without touching any
//! global state.

use std::{collections::BTreeMap, fmt::Display, io, str::FromStr};

use clap::ValueEnum;

use crate::{
    error::{Error, Result},
    features::{Feature, FeatureSet},
};

/// Weight of `environment_sum` in `proudfoot_cm`.
pub const PROUDFOOT_CM: f64 = 1.0;
/// Weight of `environment_log_sum` in `proudfoot_cm_star`.
pub const PROUDFOOT_CM_STAR: f64 = 1.0;
/// Weight of `environment_entropy` in `proudfoot_cse`.
pub const PROUDFOOT_CSE: f64 = 1.0;

pub const RING_STEREO_HEAVY_ATOM: f64 = 0.25;
pub const RING_STEREO_RING: f64 = 1.0;
pub const RING_STEREO_FUSED: f64 = 2.0;
pub const RING_STEREO_BRIDGED: f64 = 3.0;
pub const RING_STEREO_SPIRO: f64 = 2.5;
pub const RING_STEREO_TETRAHEDRAL: f64 = 2.0;
pub const RING_STEREO_DOUBLE_BOND: f64 = 1.0;

pub const HETERO_DIVERSITY_HEAVY_ATOM: f64 = 0.1;
pub const HETERO_DIVERSITY_HETEROATOM: f64 = 0.5;
pub const HETERO_DIVERSITY_ELEMENT: f64 = 1.5;
pub const HETERO_DIVERSITY_FRACTION_SP3: f64 = 3.0;
pub const HETERO_DIVERSITY_ASYMMETRY: f64 = 2.0;

/// The supported complexity metrics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Metric {
    /// Sum of Proudfoot atom-environment complexities (`CM`).
    #[value(name = "proudfoot_cm")]
    ProudfootCm,
    /// Log-sum-exp of Proudfoot atom-environment complexities (`CM*`).
    #[value(name = "proudfoot_cm_star")]
    ProudfootCmStar,
    /// Entropy of the Proudfoot atom-environment distribution (`Cse`).
    #[value(name = "proudfoot_cse")]
    ProudfootCse,
    /// Ring-system topology and stereochemistry, weighted towards fusion,
    /// bridging and stereocenters.
    #[value(name = "ring_stereo")]
    RingStereo,
    /// Heteroatom diversity, sp3 character and asymmetry.
    #[value(name = "hetero_diversity")]
    HeteroDiversity,
}

impl Metric {
    pub const ALL: &'static [Metric] = &[
        Metric::ProudfootCm,
        Metric::ProudfootCmStar,
        Metric::ProudfootCse,
        Metric::RingStereo,
        Metric::HeteroDiversity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::ProudfootCm => "proudfoot_cm",
            Metric::ProudfootCmStar => "proudfoot_cm_star",
            Metric::ProudfootCse => "proudfoot_cse",
            Metric::RingStereo => "ring_stereo",
            Metric::HeteroDiversity => "hetero_diversity",
        }
    }

    /// Return the published (or provisional) weights of this metric.
    pub fn default_coefficients(&self) -> Coefficients {
        match self {
            Metric::ProudfootCm => [(Feature::EnvironmentSum, PROUDFOOT_CM)].into_iter().collect(),
            Metric::ProudfootCmStar => [(Feature::EnvironmentLogSum, PROUDFOOT_CM_STAR)]
                .into_iter()
                .collect(),
            Metric::ProudfootCse => [(Feature::EnvironmentEntropy, PROUDFOOT_CSE)]
                .into_iter()
                .collect(),
            Metric::RingStereo => [
                (Feature::HeavyAtoms, RING_STEREO_HEAVY_ATOM),
                (Feature::Rings, RING_STEREO_RING),
                (Feature::FusedRings, RING_STEREO_FUSED),
                (Feature::BridgedRings, RING_STEREO_BRIDGED),
                (Feature::SpiroRings, RING_STEREO_SPIRO),
                (Feature::TetrahedralStereocenters, RING_STEREO_TETRAHEDRAL),
                (Feature::DoubleBondStereocenters, RING_STEREO_DOUBLE_BOND),
            ]
            .into_iter()
            .collect(),
            Metric::HeteroDiversity => [
                (Feature::HeavyAtoms, HETERO_DIVERSITY_HEAVY_ATOM),
                (Feature::Heteroatoms, HETERO_DIVERSITY_HETEROATOM),
                (Feature::HeteroElements, HETERO_DIVERSITY_ELEMENT),
                (Feature::FractionSp3, HETERO_DIVERSITY_FRACTION_SP3),
                (Feature::AsymmetryRatio, HETERO_DIVERSITY_ASYMMETRY),
            ]
            .into_iter()
            .collect(),
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| Error::configuration(format!("unknown metric '{s}'")))
    }
}

/// Feature weights of one metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coefficients {
    weights: BTreeMap<Feature, f64>,
}

impl Coefficients {
    /// Return the weight of `feature`, zero if it does not take part.
    pub fn weight(&self, feature: Feature) -> f64 {
        self.weights.get(&feature).copied().unwrap_or_default()
    }

    pub fn set(&mut self, feature: Feature, weight: f64) {
        self.weights.insert(feature, weight);
    }

    /// Iterate over the participating features in [`Feature::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        self.weights.iter().map(|(&f, &w)| (f, w))
    }
}

impl FromIterator<(Feature, f64)> for Coefficients {
    fn from_iter<I: IntoIterator<Item = (Feature, f64)>>(iter: I) -> Self {
        Self {
            weights: iter.into_iter().collect(),
        }
    }
}

/// The result of evaluating one metric on one molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexityScore {
    metric: Metric,
    value: f64,
    contributions: Option<BTreeMap<Feature, f64>>,
}

impl ComplexityScore {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Return the name of the metric that produced this score.
    pub fn name(&self) -> &'static str {
        self.metric.name()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Return the weighted contribution of each participating feature, if a
    /// breakdown was requested.
    pub fn contributions(&self) -> Option<&BTreeMap<Feature, f64>> {
        self.contributions.as_ref()
    }
}

/// A registered metric together with the weights it is evaluated with.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricEntry {
    metric: Metric,
    coefficients: Coefficients,
}

impl MetricEntry {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn name(&self) -> &'static str {
        self.metric.name()
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    /// Evaluate this metric on `features`.
    ///
    /// Terms are added in [`Feature`] order, so equal feature sets always
    /// give bit-identical scores.
    pub fn evaluate(&self, features: &FeatureSet, breakdown: bool) -> ComplexityScore {
        let terms: Vec<(Feature, f64)> = self
            .coefficients
            .iter()
            .map(|(f, w)| (f, w * features.get(f)))
            .collect();
        let value = terms.iter().fold(0.0, |acc, (_, t)| acc + t);

        ComplexityScore {
            metric: self.metric,
            value,
            contributions: breakdown.then(|| terms.into_iter().collect()),
        }
    }
}

/// The set of metrics a scorer may evaluate, with their weights.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRegistry {
    entries: BTreeMap<Metric, MetricEntry>,
}

impl Default for MetricRegistry {
    /// A registry holding every built-in metric with its default weights.
    fn default() -> Self {
        let mut registry = Self::empty();
        for &metric in Metric::ALL {
            registry.entries.insert(
                metric,
                MetricEntry {
                    metric,
                    coefficients: metric.default_coefficients(),
                },
            );
        }
        registry
    }
}

impl MetricRegistry {
    /// A registry without any metrics.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register `metric` with its default weights.
    pub fn register(&mut self, metric: Metric) -> Result<()> {
        self.register_with(metric, metric.default_coefficients())
    }

    /// Register `metric` with the given weights.
    pub fn register_with(&mut self, metric: Metric, coefficients: Coefficients) -> Result<()> {
        if self.entries.contains_key(&metric) {
            return Err(Error::configuration(format!(
                "metric '{metric}' is already registered"
            )));
        }
        self.entries.insert(
            metric,
            MetricEntry {
                metric,
                coefficients,
            },
        );
        Ok(())
    }

    /// Replace the weights of a registered metric.
    pub fn set_coefficients(&mut self, metric: Metric, coefficients: Coefficients) -> Result<()> {
        self.entry_mut(metric)?.coefficients = coefficients;
        Ok(())
    }

    /// Replace (or add) the weight of one feature in a registered metric.
    pub fn set_weight(&mut self, metric: Metric, feature: Feature, weight: f64) -> Result<()> {
        self.entry_mut(metric)?.coefficients.set(feature, weight);
        Ok(())
    }

    /// Look up a registered metric by name.
    pub fn get(&self, name: &str) -> Result<&MetricEntry> {
        let metric: Metric = name.parse()?;
        self.entries
            .get(&metric)
            .ok_or_else(|| Error::configuration(format!("metric '{name}' is not registered")))
    }

    /// Look up every name in `names`, failing on the first unknown one.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&MetricEntry>> {
        names.iter().map(|n| self.get(n.as_ref())).collect()
    }

    /// Return the names of all registered metrics.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().map(Metric::name)
    }

    /// Apply coefficient overrides read as CSV with the header
    /// `metric,feature,weight`. Returns the number of overrides applied.
    ///
    /// Every record is read and checked before any weight changes, so a
    /// failing file leaves the registry untouched.
    pub fn apply_overrides<R: io::Read>(&mut self, reader: R) -> Result<usize> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut overrides = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record
                .map_err(|e| Error::configuration(format!("coefficient file: {e}")))?;
            let field = |i: usize| {
                record.get(i).ok_or_else(|| {
                    Error::configuration(format!(
                        "coefficient file: record {} has {} fields, expected 3",
                        line + 1,
                        record.len()
                    ))
                })
            };
            let metric: Metric = field(0)?.parse()?;
            let feature: Feature = field(1)?.parse()?;
            let weight: f64 = field(2)?.parse().map_err(|_| {
                Error::configuration(format!(
                    "coefficient file: record {} has non-numeric weight '{}'",
                    line + 1,
                    record.get(2).unwrap_or_default()
                ))
            })?;
            if !self.entries.contains_key(&metric) {
                return Err(Error::configuration(format!(
                    "coefficient file: record {} names unregistered metric '{metric}'",
                    line + 1
                )));
            }
            overrides.push((metric, feature, weight));
        }

        for &(metric, feature, weight) in &overrides {
            self.set_weight(metric, feature, weight)?;
        }
        tracing::debug!(applied = overrides.len(), "applied coefficient overrides");
        Ok(overrides.len())
    }

    fn entry_mut(&mut self, metric: Metric) -> Result<&mut MetricEntry> {
        self.entries
            .get_mut(&metric)
            .ok_or_else(|| Error::configuration(format!("metric '{metric}' is not registered")))
    }
}
