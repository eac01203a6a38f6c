//! Structural descriptors shared by every complexity metric.
//!
//! [`extract`] validates a [`MolecularGraph`] and computes a [`FeatureSet`]
//! once; every metric is then evaluated against that set. Disconnected
//! molecules are processed fragment by fragment and additive descriptors are
//! summed, while the symmetry classes, the asymmetry ratio and the
//! atom-environment entropy are computed once over the whole graph.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    ops::AddAssign,
    str::FromStr,
};

use petgraph::visit::EdgeRef;

use crate::{
    environment::AtomEnvironments,
    error::{Error, Result},
    molecule::{BondOrder, BondStereo, Chirality, Hybridization, MolecularGraph, Molecule},
    rings::{RingSystem, RingTopology},
    symmetry::SymmetryClasses,
    utils::connected_components,
};

macro_rules! features {
    ( $( $(#[$doc:meta])* ($feature:ident, $name:literal, $additive:literal), )* ) => {
        /// A named structural descriptor.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Feature {
            $( $(#[$doc])* $feature, )*
        }

        impl Feature {
            /// Every descriptor, in a fixed order.
            pub const ALL: &'static [Feature] = &[ $( Feature::$feature, )* ];

            /// Return the snake_case name of this descriptor.
            pub fn name(&self) -> &'static str {
                match self {
                    $( Feature::$feature => $name, )*
                }
            }

            /// Return `true` iff the value for a disconnected molecule is the
            /// sum of the values of its fragments.
            pub fn is_additive(&self) -> bool {
                match self {
                    $( Feature::$feature => $additive, )*
                }
            }
        }

        impl FromStr for Feature {
            type Err = Error;
            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $name => Ok(Feature::$feature), )*
                    _ => Err(Error::configuration(format!("unknown feature '{s}'"))),
                }
            }
        }
    };
}

features!(
    /// Number of non-hydrogen atoms.
    (HeavyAtoms, "heavy_atoms", true),
    /// Number of heavy atoms with sp3 hybridization.
    (Sp3Atoms, "sp3_atoms", true),
    /// `sp3_atoms / heavy_atoms`.
    (FractionSp3, "fraction_sp3", false),
    /// Size of the smallest set of smallest rings.
    (Rings, "rings", true),
    (IsolatedRings, "isolated_rings", true),
    (FusedRings, "fused_rings", true),
    (BridgedRings, "bridged_rings", true),
    (SpiroRings, "spiro_rings", true),
    /// Atoms carrying a tetrahedral chirality tag.
    (TetrahedralStereocenters, "tetrahedral_stereocenters", true),
    /// Double bonds carrying a cis/trans tag.
    (DoubleBondStereocenters, "double_bond_stereocenters", true),
    /// Heavy atoms other than carbon.
    (Heteroatoms, "heteroatoms", true),
    /// Distinct heteroatom elements, counted per fragment.
    (HeteroElements, "hetero_elements", true),
    /// Connected components containing at least one heavy atom.
    (Fragments, "fragments", true),
    /// Distinct symmetry classes among the heavy atoms of the whole graph.
    (SymmetryClasses, "symmetry_classes", false),
    /// `symmetry_classes / heavy_atoms`.
    (AsymmetryRatio, "asymmetry_ratio", false),
    /// Proudfoot `CM`.
    (EnvironmentSum, "environment_sum", true),
    /// Proudfoot `CM*`.
    (EnvironmentLogSum, "environment_log_sum", false),
    /// Proudfoot `Cse`.
    (EnvironmentEntropy, "environment_entropy", false),
);

impl Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Immutable mapping from every [`Feature`] to its value for one molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    values: BTreeMap<Feature, f64>,
}

impl FeatureSet {
    /// A feature set with every descriptor equal to zero.
    pub fn zeros() -> Self {
        Self {
            values: Feature::ALL.iter().map(|&f| (f, 0.0)).collect(),
        }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values.get(&feature).copied().unwrap_or_default()
    }

    /// Look a descriptor up by its snake_case name.
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        name.parse::<Feature>().ok().map(|f| self.get(f))
    }

    /// Iterate over all descriptors in [`Feature::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        self.values.iter().map(|(&f, &v)| (f, v))
    }
}

impl FromIterator<(Feature, f64)> for FeatureSet {
    /// Build a feature set from explicit values; missing descriptors are zero.
    fn from_iter<I: IntoIterator<Item = (Feature, f64)>>(iter: I) -> Self {
        let mut set = Self::zeros();
        set.values.extend(iter);
        set
    }
}

/// Additive descriptors of one fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    heavy_atoms: usize,
    sp3_atoms: usize,
    rings: usize,
    isolated_rings: usize,
    fused_rings: usize,
    bridged_rings: usize,
    spiro_rings: usize,
    tetrahedral: usize,
    double_bond: usize,
    heteroatoms: usize,
    hetero_elements: usize,
    fragments: usize,
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Self) {
        self.heavy_atoms += rhs.heavy_atoms;
        self.sp3_atoms += rhs.sp3_atoms;
        self.rings += rhs.rings;
        self.isolated_rings += rhs.isolated_rings;
        self.fused_rings += rhs.fused_rings;
        self.bridged_rings += rhs.bridged_rings;
        self.spiro_rings += rhs.spiro_rings;
        self.tetrahedral += rhs.tetrahedral;
        self.double_bond += rhs.double_bond;
        self.heteroatoms += rhs.heteroatoms;
        self.hetero_elements += rhs.hetero_elements;
        self.fragments += rhs.fragments;
    }
}

/// Validate `graph` and compute its [`FeatureSet`].
pub fn extract(graph: &MolecularGraph) -> Result<FeatureSet> {
    let mol = Molecule::try_from(graph)?;
    extract_molecule(&mol)
}

/// Compute the [`FeatureSet`] of an already validated molecule.
pub fn extract_molecule(mol: &Molecule) -> Result<FeatureSet> {
    let _span = tracing::debug_span!("extract", atoms = mol.atom_count()).entered();

    let mut totals = Counts::default();
    let mut environments = AtomEnvironments::default();
    for fragment in fragments(mol) {
        totals += fragment_counts(&fragment);
        environments.merge(AtomEnvironments::perceive(&fragment));
    }

    let heavy_atoms = mol.graph().node_weights().filter(|a| a.is_heavy()).count();
    if totals.heavy_atoms != heavy_atoms {
        return Err(Error::extraction(format!(
            "fragments hold {} heavy atoms, molecule holds {heavy_atoms}",
            totals.heavy_atoms
        )));
    }

    let symmetry = SymmetryClasses::perceive(mol);
    if symmetry.count() > heavy_atoms {
        return Err(Error::extraction(format!(
            "{} symmetry classes for {heavy_atoms} heavy atoms",
            symmetry.count()
        )));
    }

    let ratio = |num: usize| {
        if heavy_atoms == 0 {
            0.0
        } else {
            num as f64 / heavy_atoms as f64
        }
    };

    let features: FeatureSet = [
        (Feature::HeavyAtoms, totals.heavy_atoms as f64),
        (Feature::Sp3Atoms, totals.sp3_atoms as f64),
        (Feature::FractionSp3, ratio(totals.sp3_atoms)),
        (Feature::Rings, totals.rings as f64),
        (Feature::IsolatedRings, totals.isolated_rings as f64),
        (Feature::FusedRings, totals.fused_rings as f64),
        (Feature::BridgedRings, totals.bridged_rings as f64),
        (Feature::SpiroRings, totals.spiro_rings as f64),
        (Feature::TetrahedralStereocenters, totals.tetrahedral as f64),
        (Feature::DoubleBondStereocenters, totals.double_bond as f64),
        (Feature::Heteroatoms, totals.heteroatoms as f64),
        (Feature::HeteroElements, totals.hetero_elements as f64),
        (Feature::Fragments, totals.fragments as f64),
        (Feature::SymmetryClasses, symmetry.count() as f64),
        (Feature::AsymmetryRatio, ratio(symmetry.count())),
        (Feature::EnvironmentSum, environments.sum()),
        (Feature::EnvironmentLogSum, environments.log_sum()),
        (Feature::EnvironmentEntropy, environments.entropy()),
    ]
    .into_iter()
    .collect();

    tracing::debug!(
        heavy_atoms,
        rings = totals.rings,
        fragments = totals.fragments,
        "extracted features"
    );
    Ok(features)
}

/// Split `mol` into its connected components.
fn fragments(mol: &Molecule) -> Vec<Molecule> {
    let g = mol.graph();
    let components = connected_components(g);
    if components.len() == 1 {
        return vec![mol.clone()];
    }

    let mut owner = vec![0; g.node_count()];
    for (c, component) in components.iter().enumerate() {
        for ix in component {
            owner[ix.index()] = c;
        }
    }
    (0..components.len())
        .map(|c| {
            Molecule::from_graph(g.filter_map(
                |ix, atom| (owner[ix.index()] == c).then_some(*atom),
                |_, edge| Some(*edge),
            ))
        })
        .collect()
}

fn fragment_counts(fragment: &Molecule) -> Counts {
    let g = fragment.graph();
    let heavy: Vec<_> = g.node_weights().filter(|a| a.is_heavy()).collect();
    let rings = RingSystem::perceive(fragment);

    let hetero_elements: BTreeSet<_> = heavy
        .iter()
        .map(|a| a.element())
        .filter(|e| e.is_hetero())
        .collect();

    Counts {
        heavy_atoms: heavy.len(),
        sp3_atoms: heavy
            .iter()
            .filter(|a| a.hybridization() == Hybridization::Sp3)
            .count(),
        rings: rings.len(),
        isolated_rings: rings.count(RingTopology::Isolated),
        fused_rings: rings.count(RingTopology::Fused),
        bridged_rings: rings.count(RingTopology::Bridged),
        spiro_rings: rings.count(RingTopology::Spiro),
        tetrahedral: heavy
            .iter()
            .filter(|a| a.chirality() != Chirality::None)
            .count(),
        double_bond: g
            .edge_references()
            .filter(|e| e.weight().order == BondOrder::Double && e.weight().stereo != BondStereo::None)
            .count(),
        heteroatoms: heavy.iter().filter(|a| a.element().is_hetero()).count(),
        hetero_elements: hetero_elements.len(),
        fragments: usize::from(!heavy.is_empty()),
    }
}
