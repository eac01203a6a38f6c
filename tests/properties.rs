//! Properties every score must satisfy regardless of the input molecule.

use molecular_complexity::{
    extract, Atom, Bond, BondOrder, BondStereo, Chirality, Element, Error, Feature,
    Hybridization, Metric, MetricRegistry, MolecularGraph, Scorer,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn all_metrics() -> Vec<&'static str> {
    Metric::ALL.iter().map(Metric::name).collect()
}

fn sp3(element: Element, hydrogens: u8) -> Atom {
    Atom::new(element)
        .with_hybridization(Hybridization::Sp3)
        .with_hydrogens(hydrogens)
}

/// Append `atoms` and `bonds` (indexed from zero) to `g`.
fn append(g: &mut MolecularGraph, atoms: &[Atom], bonds: &[(usize, usize, BondOrder)]) {
    let offset = g.atoms().len();
    for &atom in atoms {
        g.add_atom(atom);
    }
    for &(i, j, order) in bonds {
        g.add_bond(offset + i, offset + j, order);
    }
}

/// A decahydroquinoline-like fused bicycle with a hydroxylated stereocenter.
fn fused_fragment(g: &mut MolecularGraph, chiral: bool) {
    let mut atoms = vec![sp3(Element::Carbon, 2); 11];
    atoms[1] = sp3(Element::Carbon, 1).with_chirality(if chiral {
        Chirality::Clockwise
    } else {
        Chirality::None
    });
    atoms[4] = sp3(Element::Carbon, 1);
    atoms[5] = sp3(Element::Carbon, 1);
    atoms[7] = sp3(Element::Nitrogen, 1);
    atoms[10] = sp3(Element::Oxygen, 1);
    let single = BondOrder::Single;
    append(
        g,
        &atoms,
        &[
            (0, 1, single),
            (1, 2, single),
            (2, 3, single),
            (3, 4, single),
            (4, 5, single),
            (5, 0, single),
            (4, 6, single),
            (6, 7, single),
            (7, 8, single),
            (8, 9, single),
            (9, 5, single),
            (1, 10, single),
        ],
    );
}

fn norbornane_fragment(g: &mut MolecularGraph) {
    let mut atoms = vec![sp3(Element::Carbon, 2); 7];
    atoms[0] = sp3(Element::Carbon, 1);
    atoms[3] = sp3(Element::Carbon, 1);
    let single = BondOrder::Single;
    append(
        g,
        &atoms,
        &[
            (0, 1, single),
            (1, 2, single),
            (2, 3, single),
            (3, 4, single),
            (4, 5, single),
            (5, 0, single),
            (0, 6, single),
            (6, 3, single),
        ],
    );
}

fn butene_fragment(g: &mut MolecularGraph) {
    let sp2 = Atom::new(Element::Carbon)
        .with_hybridization(Hybridization::Sp2)
        .with_hydrogens(1);
    let offset = g.atoms().len();
    append(
        g,
        &[sp3(Element::Carbon, 3), sp2, sp2, sp3(Element::Carbon, 3)],
        &[(0, 1, BondOrder::Single), (2, 3, BondOrder::Single)],
    );
    g.push_bond(
        Bond::new(offset + 1, offset + 2, BondOrder::Double).with_stereo(BondStereo::Trans),
    );
}

fn mixture() -> MolecularGraph {
    let mut g = MolecularGraph::new();
    fused_fragment(&mut g, true);
    norbornane_fragment(&mut g);
    butene_fragment(&mut g);
    g
}

/// Saturated skeleton over `n` atoms: carbons, or nitrogens where `nitrogen`
/// says so, with hydrogens filling each atom's valence.
fn skeleton(n: usize, bonds: &[(usize, usize)], nitrogen: impl Fn(usize) -> bool) -> MolecularGraph {
    let mut degree = vec![0u8; n];
    for &(i, j) in bonds {
        degree[i] += 1;
        degree[j] += 1;
    }
    let atoms: Vec<Atom> = (0..n)
        .map(|i| {
            if nitrogen(i) && degree[i] <= 3 {
                sp3(Element::Nitrogen, 3 - degree[i])
            } else {
                sp3(Element::Carbon, 4 - degree[i])
            }
        })
        .collect();
    let mut g = MolecularGraph::new();
    let bonds: Vec<_> = bonds.iter().map(|&(i, j)| (i, j, BondOrder::Single)).collect();
    append(&mut g, &atoms, &bonds);
    g
}

/// Bicyclo[2.2.2]octane: any two of its three six-membered rings form an
/// SSSR.
fn bicyclooctane() -> MolecularGraph {
    let bonds = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (0, 6), (6, 7), (7, 3)];
    skeleton(8, &bonds, |_| false)
}

/// A cage with two four-membered rings and several equally small choices for
/// its third ring.
fn cage() -> MolecularGraph {
    let bonds = [
        (0, 1),
        (0, 2),
        (0, 4),
        (0, 6),
        (1, 3),
        (2, 5),
        (2, 7),
        (3, 5),
        (4, 5),
        (4, 7),
    ];
    skeleton(8, &bonds, |_| false)
}

/// A connected polycyclic skeleton of 6 to 12 atoms with no atom above
/// degree four.
fn random_cage(rng: &mut ChaCha8Rng) -> MolecularGraph {
    let n = rng.gen_range(6..=12);
    let mut degree = vec![0; n];
    let mut bonds: Vec<(usize, usize)> = Vec::new();
    for v in 1..n {
        let open: Vec<usize> = (0..v).filter(|&u| degree[u] < 4).collect();
        let u = *open.choose(rng).unwrap();
        bonds.push((u, v));
        degree[u] += 1;
        degree[v] += 1;
    }
    for _ in 0..n {
        let i = rng.gen_range(0..n);
        let j = rng.gen_range(0..n);
        let known = bonds.contains(&(i, j)) || bonds.contains(&(j, i));
        if i != j && !known && degree[i] < 4 && degree[j] < 4 {
            bonds.push((i, j));
            degree[i] += 1;
            degree[j] += 1;
        }
    }
    let nitrogens: Vec<bool> = (0..n).map(|_| rng.gen_bool(0.2)).collect();
    skeleton(n, &bonds, |i| nitrogens[i])
}

/// Relabel the atoms of `g` at random, shuffle its bond list and flip the
/// direction of some bonds.
fn shuffled(g: &MolecularGraph, rng: &mut ChaCha8Rng) -> MolecularGraph {
    let mut perm: Vec<usize> = (0..g.atoms().len()).collect();
    perm.shuffle(rng);

    let mut atoms = g.atoms().to_vec();
    for (i, &atom) in g.atoms().iter().enumerate() {
        atoms[perm[i]] = atom;
    }
    let mut bonds: Vec<Bond> = g
        .bonds()
        .iter()
        .map(|b| {
            let (i, j) = b.atoms();
            let (i, j) = if rng.gen_bool(0.5) { (j, i) } else { (i, j) };
            Bond::new(perm[i], perm[j], b.order()).with_stereo(b.stereo())
        })
        .collect();
    bonds.shuffle(rng);
    MolecularGraph::from_parts(atoms, bonds)
}

#[test]
fn scores_are_invariant_under_relabeling() {
    let mut rng = ChaCha8Rng::seed_from_u64(2017);
    let mut graphs = vec![mixture(), bicyclooctane(), cage()];
    graphs.extend((0..50).map(|_| random_cage(&mut rng)));

    let scorer = Scorer::default();
    let names = all_metrics();
    for (k, g) in graphs.iter().enumerate() {
        let features = extract(g).unwrap();
        let reference = scorer.score(g, &names).unwrap();
        for _ in 0..8 {
            let h = shuffled(g, &mut rng);
            assert_eq!(extract(&h).unwrap(), features, "graph {k}");
            assert_eq!(scorer.score(&h, &names).unwrap(), reference, "graph {k}");
        }
    }
}

#[test]
fn ring_topology_of_cages() {
    let f = extract(&bicyclooctane()).unwrap();
    assert_eq!(f.get(Feature::Rings), 2.0);
    assert_eq!(f.get(Feature::BridgedRings), 2.0);

    let f = extract(&cage()).unwrap();
    assert_eq!(f.get(Feature::Rings), 3.0);
    assert_eq!(f.get(Feature::BridgedRings), 3.0);
    assert_eq!(f.get(Feature::FusedRings), 0.0);
}

#[test]
fn ring_sizes_split_symmetry_classes() {
    // Cyclopentane plus cyclohexane: eleven CH2 groups in two orbits.
    let mut bonds: Vec<(usize, usize)> = (0..5).map(|k| (k, (k + 1) % 5)).collect();
    bonds.extend((0..6).map(|k| (5 + k, 5 + (k + 1) % 6)));
    let f = extract(&skeleton(11, &bonds, |_| false)).unwrap();
    assert_eq!(f.get(Feature::SymmetryClasses), 2.0);
    assert_eq!(f.get(Feature::AsymmetryRatio), 2.0 / 11.0);
}

#[test]
fn ring_topology_of_mixture() {
    let f = extract(&mixture()).unwrap();
    assert_eq!(f.get(Feature::Rings), 4.0);
    assert_eq!(f.get(Feature::FusedRings), 2.0);
    assert_eq!(f.get(Feature::BridgedRings), 2.0);
    assert_eq!(f.get(Feature::SpiroRings), 0.0);
    assert_eq!(f.get(Feature::IsolatedRings), 0.0);
    assert_eq!(f.get(Feature::Fragments), 3.0);
    assert_eq!(f.get(Feature::TetrahedralStereocenters), 1.0);
    assert_eq!(f.get(Feature::DoubleBondStereocenters), 1.0);
    assert_eq!(f.get(Feature::Heteroatoms), 2.0);
    assert_eq!(f.get(Feature::HeteroElements), 2.0);
}

#[test]
fn empty_graph_scores_zero() {
    let scores = Scorer::default()
        .score(&MolecularGraph::new(), &all_metrics())
        .unwrap();
    assert_eq!(scores.len(), Metric::ALL.len());
    assert!(scores.iter().all(|s| s.value() == 0.0));
}

#[test]
fn stereocenters_never_decrease_complexity() {
    let mut plain = MolecularGraph::new();
    fused_fragment(&mut plain, false);
    let mut chiral = MolecularGraph::new();
    fused_fragment(&mut chiral, true);

    let scorer = Scorer::default();
    let names = all_metrics();
    let before = scorer.score(&plain, &names).unwrap();
    let after = scorer.score(&chiral, &names).unwrap();
    for (b, a) in before.iter().zip(&after) {
        assert!(a.value() >= b.value(), "{} decreased", a.name());
    }
    assert!(after[3].value() > before[3].value());
    assert_eq!(after[3].name(), "ring_stereo");
}

#[test]
fn scoring_is_deterministic() {
    let g = mixture();
    let scorer = Scorer::default().with_breakdown(true);
    let names = all_metrics();
    let first = scorer.score(&g, &names).unwrap();
    for _ in 0..5 {
        assert_eq!(scorer.score(&g, &names).unwrap(), first);
    }
}

#[test]
fn identical_fragments_share_symmetry_classes() {
    let mut single = MolecularGraph::new();
    fused_fragment(&mut single, true);
    let mut double = MolecularGraph::new();
    fused_fragment(&mut double, true);
    fused_fragment(&mut double, true);

    let one = extract(&single).unwrap();
    let two = extract(&double).unwrap();

    for &feature in Feature::ALL.iter().filter(|f| f.is_additive()) {
        assert!(
            (two.get(feature) - 2.0 * one.get(feature)).abs() < 1e-9,
            "{feature} is not additive"
        );
    }
    assert_eq!(two.get(Feature::SymmetryClasses), one.get(Feature::SymmetryClasses));
    assert_eq!(
        two.get(Feature::AsymmetryRatio),
        one.get(Feature::SymmetryClasses) / (2.0 * one.get(Feature::HeavyAtoms))
    );
    assert_eq!(two.get(Feature::FractionSp3), one.get(Feature::FractionSp3));
    assert!(
        (two.get(Feature::EnvironmentLogSum) - one.get(Feature::EnvironmentLogSum) - 1.0).abs()
            < 1e-9
    );
    assert_eq!(
        two.get(Feature::EnvironmentEntropy),
        one.get(Feature::EnvironmentEntropy)
    );
}

#[test]
fn unknown_metric_is_rejected() {
    let err = Scorer::default()
        .score(&mixture(), &["proudfoot_cm", "whitlock"])
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "{err}");
}

#[test]
fn malformed_graph_is_rejected_before_metric_lookup() {
    let mut g = mixture();
    g.add_bond(0, 1, BondOrder::Single);
    let err = Scorer::new(MetricRegistry::empty())
        .score(&g, &["whitlock"])
        .unwrap_err();
    assert!(err.is_invalid_structure(), "{err}");
}

#[test]
fn substituted_coefficients_are_used() {
    let mut registry = MetricRegistry::default();
    registry
        .set_coefficients(
            Metric::RingStereo,
            [(Feature::Rings, 1.0)].into_iter().collect(),
        )
        .unwrap();
    let scores = Scorer::new(registry)
        .score(&mixture(), &["ring_stereo"])
        .unwrap();
    assert_eq!(scores[0].value(), 4.0);
}
