//! Atom-environment complexity after Proudfoot, *Bioorg. Med. Chem. Lett.*
//! 27 (2017) 2014-2017 (doi:10.1016/j.bmcl.2017.03.008).
//!
//! Every heavy atom `a` emits one *atom path* per route of length one or two
//! leaving it: a neighbor `n` yields the pair `(a, n)` when `n` is a hydrogen
//! or `a` is its only neighbor, and otherwise one triple `(a, n, m)` for every
//! further neighbor `m` of `n`. Path elements are atom types: element, total
//! degree (hydrogens included) and heavy degree. With `p_i` the fractional
//! occurrence of each distinct path among the `N` paths of `a`,
//!
//! ```text
//! CA  = -sum(p_i * log2(p_i)) + log2(N)
//! CM  = sum(CA)
//! CM* = log2(sum(2^CA))
//! Cse = -sum(q_i * log2(q_i))
//! ```
//!
//! where `q_i` is the fractional occurrence of each distinct atom environment
//! (the sorted multiset of an atom's paths) among all heavy atoms.

use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;

use crate::{
    molecule::{Element, Index, Molecule},
    utils::{entropy, ordered_sum},
};

/// Type of an atom as seen from a path: element, total degree including
/// hydrogens, and number of heavy neighbors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomType {
    element: Element,
    degree: usize,
    heavy_degree: usize,
}

/// An implicit hydrogen, or any explicit hydrogen bound to a single atom.
const HYDROGEN: AtomType = AtomType {
    element: Element::Hydrogen,
    degree: 1,
    heavy_degree: 1,
};

/// A path of two or three atom types starting at the central atom.
pub type AtomPath = (AtomType, AtomType, Option<AtomType>);

/// Per-atom environment complexities and environments of a set of heavy
/// atoms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomEnvironments {
    complexities: Vec<f64>,
    environments: Vec<Vec<AtomPath>>,
}

impl AtomEnvironments {
    /// Enumerate the atom paths of every heavy atom of `mol`.
    pub fn perceive(mol: &Molecule) -> Self {
        let g = mol.graph();
        let types: Vec<AtomType> = g.node_indices().map(|ix| atom_type(mol, ix)).collect();

        let mut out = Self::default();
        for a in g.node_indices().filter(|&ix| g[ix].is_heavy()) {
            let mut paths = atom_paths(mol, &types, a);
            let complexity = path_complexity(&paths);
            paths.sort();
            out.complexities.push(complexity);
            out.environments.push(paths);
        }
        out
    }

    /// Append the atoms of `other`.
    pub fn merge(&mut self, other: AtomEnvironments) {
        self.complexities.extend(other.complexities);
        self.environments.extend(other.environments);
    }

    /// Return the per-atom complexities `CA`.
    pub fn complexities(&self) -> &[f64] {
        &self.complexities
    }

    /// `CM`: the sum of the per-atom complexities.
    pub fn sum(&self) -> f64 {
        ordered_sum(self.complexities.clone())
    }

    /// `CM*`: the base-2 log-sum-exp of the per-atom complexities, or zero
    /// when there are no heavy atoms.
    pub fn log_sum(&self) -> f64 {
        if self.complexities.is_empty() {
            return 0.0;
        }
        ordered_sum(self.complexities.iter().map(|ca| ca.exp2()).collect()).log2()
    }

    /// `Cse`: the Shannon entropy of the atom-environment distribution.
    pub fn entropy(&self) -> f64 {
        let mut counts = BTreeMap::<&[AtomPath], usize>::new();
        for env in &self.environments {
            *counts.entry(env.as_slice()).or_default() += 1;
        }
        entropy(counts.into_values())
    }
}

fn atom_type(mol: &Molecule, ix: NodeIndex<Index>) -> AtomType {
    let g = mol.graph();
    let degree = g.neighbors(ix).count() + g[ix].hydrogens() as usize;
    AtomType {
        element: g[ix].element(),
        degree,
        heavy_degree: degree - mol.total_hydrogens(ix),
    }
}

fn total_degree(mol: &Molecule, ix: NodeIndex<Index>) -> usize {
    let g = mol.graph();
    g.neighbors(ix).count() + g[ix].hydrogens() as usize
}

fn atom_paths(mol: &Molecule, types: &[AtomType], a: NodeIndex<Index>) -> Vec<AtomPath> {
    let g = mol.graph();
    let ta = types[a.index()];
    let mut paths = vec![(ta, HYDROGEN, None); g[a].hydrogens() as usize];

    for n in g.neighbors(a) {
        let tn = types[n.index()];
        if !g[n].is_heavy() || total_degree(mol, n) == 1 {
            paths.push((ta, tn, None));
            continue;
        }
        for m in g.neighbors(n).filter(|&m| m != a) {
            paths.push((ta, tn, Some(types[m.index()])));
        }
        for _ in 0..g[n].hydrogens() {
            paths.push((ta, tn, Some(HYDROGEN)));
        }
    }
    paths
}

/// `CA` of one atom: path entropy plus the log of the path count.
fn path_complexity(paths: &[AtomPath]) -> f64 {
    if paths.is_empty() {
        return 0.0;
    }
    let mut counts = BTreeMap::<&AtomPath, usize>::new();
    for p in paths {
        *counts.entry(p).or_default() += 1;
    }
    entropy(counts.into_values()) + (paths.len() as f64).log2()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::{Atom, BondOrder, Hybridization, MolecularGraph};

    fn ring(elements: &[(Element, u8)], order: BondOrder, hybridization: Hybridization) -> Molecule {
        let mut g = MolecularGraph::new();
        for &(e, h) in elements {
            g.add_atom(
                Atom::new(e)
                    .with_hydrogens(h)
                    .with_hybridization(hybridization),
            );
        }
        for i in 0..elements.len() {
            g.add_bond(i, (i + 1) % elements.len(), order);
        }
        Molecule::try_from(&g).unwrap()
    }

    #[test]
    fn benzene_atom_complexity() {
        // Each carbon: one (C,H) pair, two (C,C,C) and two (C,C,H) triples.
        let mol = ring(&[(Element::Carbon, 1); 6], BondOrder::Aromatic, Hybridization::Aromatic);
        let env = AtomEnvironments::perceive(&mol);
        let expected = -(0.2f64 * 0.2f64.log2() + 0.8 * 0.4f64.log2()) + 5f64.log2();
        for &ca in env.complexities() {
            assert!((ca - expected).abs() < 1e-12);
        }
        assert!((env.sum() - 23.06313713864835).abs() < 1e-9);
        assert!((env.log_sum() - 6.428818690495881).abs() < 1e-9);
        assert!(env.entropy().abs() < 1e-12);
    }

    #[test]
    fn cyclohexane_reference_values() {
        let mol = ring(&[(Element::Carbon, 2); 6], BondOrder::Single, Hybridization::Sp3);
        let env = AtomEnvironments::perceive(&mol);
        assert!((env.sum() - 27.0).abs() < 1e-9);
        assert!((env.log_sum() - 7.084962500721156).abs() < 1e-9);
    }

    #[test]
    fn explicit_and_implicit_hydrogens_agree() {
        let mut implicit = MolecularGraph::new();
        let c = implicit.add_atom(Atom::new(Element::Carbon).with_hydrogens(3));
        let o = implicit.add_atom(Atom::new(Element::Oxygen).with_hydrogens(1));
        implicit.add_bond(c, o, BondOrder::Single);

        let mut explicit = MolecularGraph::new();
        let c = explicit.add_atom(Atom::new(Element::Carbon));
        let o = explicit.add_atom(Atom::new(Element::Oxygen));
        explicit.add_bond(c, o, BondOrder::Single);
        for parent in [c, c, c, o] {
            let h = explicit.add_atom(Atom::new(Element::Hydrogen));
            explicit.add_bond(parent, h, BondOrder::Single);
        }

        let a = AtomEnvironments::perceive(&Molecule::try_from(&implicit).unwrap());
        let b = AtomEnvironments::perceive(&Molecule::try_from(&explicit).unwrap());
        assert_eq!(a.sum(), b.sum());
        assert_eq!(a.entropy(), b.entropy());
    }

    #[test]
    fn lone_atom_contributes_nothing() {
        let mut g = MolecularGraph::new();
        g.add_atom(Atom::new(Element::Sodium).with_charge(1));
        let env = AtomEnvironments::perceive(&Molecule::try_from(&g).unwrap());
        assert_eq!(env.complexities(), &[0.0]);
        assert_eq!(env.log_sum(), 0.0);
    }

    #[test]
    fn empty_molecule_is_zero() {
        let env = AtomEnvironments::perceive(&Molecule::try_from(&MolecularGraph::new()).unwrap());
        assert_eq!(env.sum(), 0.0);
        assert_eq!(env.log_sum(), 0.0);
        assert_eq!(env.entropy(), 0.0);
    }
}
