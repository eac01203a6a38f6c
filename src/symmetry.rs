//! Partition heavy atoms into symmetry classes.
//!
//! Two heavy atoms share a class when an automorphism of the heavy-atom graph
//! maps one onto the other. Automorphisms preserve bond orders and each
//! atom's local invariants: element, charge, hybridization, attached
//! hydrogens and heavy degree.
//!
//! Atoms are first split by label refinement: labels start from the local
//! invariants and are refined by the multiset of (bond order, neighbor label)
//! pairs until the partition is stable. A stable cell can still hold several
//! orbits, so the atoms of a cell are compared by individualization. The pair
//! under test gets a fresh label in two copies of the graph, both copies are
//! refined together, and the search branches on the first cell that is still
//! ambiguous until it reaches a bijection that preserves every bond or runs
//! out of candidates. Each automorphism found merges orbits.
//!
//! Labels are ranks into sorted invariant lists, so they never depend on atom
//! order or on hashing.

use std::collections::BTreeMap;

use petgraph::{graph::NodeIndex, unionfind::UnionFind, visit::EdgeRef};

use crate::molecule::{BondOrder, Hybridization, Molecule};

type Invariant = (u8, i8, Hybridization, usize, usize);

/// Heavy neighbors and bond orders, indexed by heavy-atom position.
type Adjacency = Vec<Vec<(usize, BondOrder)>>;

/// Symmetry classes of the heavy atoms of one molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetryClasses {
    classes: Vec<Option<usize>>,
    count: usize,
}

impl SymmetryClasses {
    pub fn perceive(mol: &Molecule) -> Self {
        let g = mol.graph();
        let heavy: Vec<NodeIndex> = g.node_indices().filter(|&ix| g[ix].is_heavy()).collect();

        let mut position = vec![None; g.node_count()];
        for (p, ix) in heavy.iter().enumerate() {
            position[ix.index()] = Some(p);
        }
        let adjacency: Adjacency = heavy
            .iter()
            .map(|&ix| {
                let mut neighbors: Vec<(usize, BondOrder)> = g
                    .edges(ix)
                    .filter_map(|e| {
                        let other = if e.source() == ix { e.target() } else { e.source() };
                        position[other.index()].map(|p| (p, e.weight().order))
                    })
                    .collect();
                neighbors.sort();
                neighbors
            })
            .collect();

        let invariants: Vec<Invariant> = heavy
            .iter()
            .map(|&ix| {
                let atom = &g[ix];
                (
                    atom.element().atomic_number(),
                    atom.charge(),
                    atom.hybridization(),
                    mol.total_hydrogens(ix),
                    mol.heavy_degree(ix),
                )
            })
            .collect();

        let stable = refine(&adjacency, ranks(&invariants));
        let orbit_of = orbits(&adjacency, &stable);

        let mut classes = vec![None; g.node_count()];
        for (&ix, &orbit) in heavy.iter().zip(&orbit_of) {
            classes[ix.index()] = Some(orbit);
        }
        Self {
            classes,
            count: distinct(&orbit_of),
        }
    }

    /// Return the number of distinct classes.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Return the class of the atom at `atom`, or `None` for hydrogens.
    /// Class ids are dense and numbered in order of each class's first atom.
    pub fn class_of(&self, atom: usize) -> Option<usize> {
        self.classes.get(atom).copied().flatten()
    }
}

/// Refine `labels` by neighbor labels until the partition is stable.
fn refine(adjacency: &[Vec<(usize, BondOrder)>], labels: Vec<usize>) -> Vec<usize> {
    let mut labels = ranks(&labels);
    let mut count = distinct(&labels);

    // Each round either splits a cell or ends the loop.
    for round in 0..adjacency.len() {
        let signatures: Vec<(usize, Vec<(BondOrder, usize)>)> = adjacency
            .iter()
            .zip(&labels)
            .map(|(neighbors, &label)| {
                let mut neighborhood: Vec<(BondOrder, usize)> = neighbors
                    .iter()
                    .map(|&(n, order)| (order, labels[n]))
                    .collect();
                neighborhood.sort();
                (label, neighborhood)
            })
            .collect();

        let refined = ranks(&signatures);
        let refined_count = distinct(&refined);
        labels = refined;

        tracing::trace!(round, cells = refined_count, "symmetry refinement");
        if refined_count == count {
            break;
        }
        count = refined_count;
    }
    labels
}

/// Orbit id of every heavy atom, given the stable partition `labels`.
fn orbits(adjacency: &Adjacency, labels: &[usize]) -> Vec<usize> {
    let n = adjacency.len();
    // Two disjoint copies of the graph; atom `i` of the second one is `n + i`.
    let doubled: Adjacency = adjacency
        .iter()
        .cloned()
        .chain(
            adjacency
                .iter()
                .map(|neighbors| neighbors.iter().map(|&(m, order)| (n + m, order)).collect()),
        )
        .collect();
    let fresh = labels.iter().max().map_or(0, |&max| max + 1);

    let mut orbit = UnionFind::<usize>::new(n);
    let mut representatives = BTreeMap::<usize, Vec<usize>>::new();
    for v in 0..n {
        let reps = representatives.entry(labels[v]).or_default();
        if reps.iter().any(|&r| orbit.equiv(r, v)) {
            continue;
        }

        let image = reps.iter().find_map(|&r| {
            let mut start: Vec<usize> = labels.iter().chain(labels).copied().collect();
            start[r] = fresh;
            start[n + v] = fresh;
            find_automorphism(&doubled, n, start)
        });
        match image {
            Some(image) => {
                for (i, j) in image.into_iter().enumerate() {
                    orbit.union(i, j);
                }
            }
            None => reps.push(v),
        }
    }

    let mut ids = BTreeMap::new();
    (0..n)
        .map(|i| {
            let next = ids.len();
            *ids.entry(orbit.find(i)).or_insert(next)
        })
        .collect()
}

/// Search for an automorphism mapping every atom of the first copy in
/// `doubled` onto the atom of the second copy that ends up with the same
/// label. Returns the image of each atom.
fn find_automorphism(doubled: &Adjacency, n: usize, labels: Vec<usize>) -> Option<Vec<usize>> {
    let labels = refine(doubled, labels);
    let (first, second) = labels.split_at(n);

    let mut first_sorted = first.to_vec();
    let mut second_sorted = second.to_vec();
    first_sorted.sort_unstable();
    second_sorted.sort_unstable();
    if first_sorted != second_sorted {
        return None;
    }

    let mut cells = BTreeMap::<usize, Vec<usize>>::new();
    for (x, &label) in first.iter().enumerate() {
        cells.entry(label).or_default().push(x);
    }

    let Some((&label, cell)) = cells.iter().find(|(_, cell)| cell.len() > 1) else {
        // Every cell is a single atom, so the labels fix the bijection.
        let atom_with: BTreeMap<usize, usize> =
            second.iter().enumerate().map(|(y, &l)| (l, y)).collect();
        let image: Vec<usize> = first
            .iter()
            .map(|l| atom_with.get(l).copied())
            .collect::<Option<_>>()?;
        let preserved = (0..n).all(|x| {
            doubled[x]
                .iter()
                .all(|&(m, order)| doubled[n + image[x]].contains(&(n + image[m], order)))
        });
        return preserved.then_some(image);
    };

    let x = cell[0];
    let fresh = labels.iter().max().map_or(0, |&max| max + 1);
    second
        .iter()
        .enumerate()
        .filter(|&(_, &l)| l == label)
        .find_map(|(y, _)| {
            let mut start = labels.clone();
            start[x] = fresh;
            start[n + y] = fresh;
            find_automorphism(doubled, n, start)
        })
}

/// Replace each key by its rank among the distinct keys.
fn ranks<K: Ord + Clone>(keys: &[K]) -> Vec<usize> {
    let mut table = BTreeMap::new();
    for k in keys {
        table.entry(k.clone()).or_insert(0);
    }
    for (rank, v) in table.values_mut().enumerate() {
        *v = rank;
    }
    keys.iter().map(|k| table[k]).collect()
}

fn distinct(labels: &[usize]) -> usize {
    let mut seen = labels.to_vec();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::{Atom, Element, MolecularGraph};

    fn sp3(element: Element, hydrogens: u8) -> Atom {
        Atom::new(element)
            .with_hybridization(Hybridization::Sp3)
            .with_hydrogens(hydrogens)
    }

    fn classes(g: &MolecularGraph) -> SymmetryClasses {
        SymmetryClasses::perceive(&Molecule::try_from(g).unwrap())
    }

    #[test]
    fn pentane_has_three_classes() {
        let mut g = MolecularGraph::new();
        let hs = [3, 2, 2, 2, 3];
        for h in hs {
            g.add_atom(sp3(Element::Carbon, h));
        }
        for i in 0..4 {
            g.add_bond(i, i + 1, BondOrder::Single);
        }
        let sc = classes(&g);
        assert_eq!(sc.count(), 3);
        assert_eq!(sc.class_of(0), sc.class_of(4));
        assert_eq!(sc.class_of(1), sc.class_of(3));
        assert_ne!(sc.class_of(1), sc.class_of(2));
    }

    #[test]
    fn refinement_separates_atoms_with_equal_local_invariants() {
        // Hexane: C2 and C3 share local invariants and only differ in their
        // neighbors.
        let mut g = MolecularGraph::new();
        for h in [3, 2, 2, 2, 2, 3] {
            g.add_atom(sp3(Element::Carbon, h));
        }
        for i in 0..5 {
            g.add_bond(i, i + 1, BondOrder::Single);
        }
        assert_eq!(classes(&g).count(), 3);
    }

    fn ring(g: &mut MolecularGraph, size: usize) -> Vec<usize> {
        let atoms: Vec<usize> = (0..size)
            .map(|_| g.add_atom(sp3(Element::Carbon, 2)))
            .collect();
        for k in 0..size {
            g.add_bond(atoms[k], atoms[(k + 1) % size], BondOrder::Single);
        }
        atoms
    }

    #[test]
    fn ring_size_separates_atoms_that_refinement_cannot() {
        // Cyclopentane and cyclohexane: eleven CH2 groups that all look alike
        // to label refinement, in two orbits.
        let mut g = MolecularGraph::new();
        let five = ring(&mut g, 5);
        let six = ring(&mut g, 6);

        let sc = classes(&g);
        assert_eq!(sc.count(), 2);
        assert!(five.iter().all(|&a| sc.class_of(a) == sc.class_of(five[0])));
        assert!(six.iter().all(|&a| sc.class_of(a) == sc.class_of(six[0])));
        assert_ne!(sc.class_of(five[0]), sc.class_of(six[0]));
    }

    #[test]
    fn cubane_atoms_form_one_class() {
        let mut g = MolecularGraph::new();
        for _ in 0..8 {
            g.add_atom(sp3(Element::Carbon, 1));
        }
        for k in 0..4 {
            g.add_bond(k, (k + 1) % 4, BondOrder::Single);
            g.add_bond(4 + k, 4 + (k + 1) % 4, BondOrder::Single);
            g.add_bond(k, k + 4, BondOrder::Single);
        }
        assert_eq!(classes(&g).count(), 1);
    }

    #[test]
    fn bond_orders_break_symmetry() {
        // Cyclohexene: the ring is no longer uniform once one bond is double.
        let mut g = MolecularGraph::new();
        for k in 0..6 {
            let hybridization = if k < 2 {
                Hybridization::Sp2
            } else {
                Hybridization::Sp3
            };
            let h = if k < 2 { 1 } else { 2 };
            g.add_atom(
                Atom::new(Element::Carbon)
                    .with_hybridization(hybridization)
                    .with_hydrogens(h),
            );
        }
        g.add_bond(0, 1, BondOrder::Double);
        for k in 1..6 {
            g.add_bond(k, (k + 1) % 6, BondOrder::Single);
        }
        let sc = classes(&g);
        assert_eq!(sc.count(), 3);
        assert_eq!(sc.class_of(2), sc.class_of(5));
        assert_eq!(sc.class_of(3), sc.class_of(4));
    }

    #[test]
    fn hydrogens_have_no_class() {
        let mut g = MolecularGraph::new();
        let c = g.add_atom(sp3(Element::Carbon, 3));
        let h = g.add_atom(Atom::new(Element::Hydrogen));
        g.add_bond(c, h, BondOrder::Single);
        let sc = classes(&g);
        assert_eq!(sc.count(), 1);
        assert_eq!(sc.class_of(h), None);
    }

    #[test]
    fn empty_molecule_has_no_classes() {
        assert_eq!(classes(&MolecularGraph::new()).count(), 0);
    }
}
