//! Ring perception for molecular graphs.
//!
//! Enumerates the *relevant cycles* of a [`Molecule`], the cycles that are not
//! a GF(2) sum of strictly shorter cycles. Their union is the same for every
//! labeling of the graph, so each cycle is classified against all the others.
//! The smallest set of smallest rings (SSSR) is then picked greedily from the
//! relevant cycles ordered by size and topology. Any two such picks hold the
//! same multiset of (size, topology) pairs, so the topology counts do not
//! depend on atom or bond order even when the SSSR itself is not unique.

use std::collections::VecDeque;

use bit_set::BitSet;
use petgraph::graph::NodeIndex;

use crate::{
    molecule::{Index, MGraph, Molecule},
    utils::connected_components,
};

/// Relationship of a ring to the other relevant cycles of its molecule.
///
/// Variants are ordered by precedence: a ring that is fused to one cycle
/// and bridged with another counts as bridged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RingTopology {
    /// Shares no atom with any other ring.
    Isolated,
    /// Shares exactly one atom with another ring.
    Spiro,
    /// Shares exactly one bond (two bonded atoms) with another ring.
    Fused,
    /// Shares three or more atoms, or two non-bonded atoms, with another ring.
    Bridged,
}

/// A single ring of the SSSR.
#[derive(Debug, Clone)]
pub struct Ring {
    atoms: Vec<usize>,
    bonds: BitSet,
    topology: RingTopology,
}

impl Ring {
    /// Return the atoms of this ring in cyclic order.
    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    pub fn size(&self) -> usize {
        self.atoms.len()
    }

    pub fn topology(&self) -> RingTopology {
        self.topology
    }

    pub fn contains_bond(&self, bond: usize) -> bool {
        self.bonds.contains(bond)
    }
}

/// The rings of one molecule together with per-atom and per-bond ring
/// membership.
#[derive(Debug, Clone, Default)]
pub struct RingSystem {
    rings: Vec<Ring>,
    ring_atoms: BitSet,
    ring_bonds: BitSet,
}

impl RingSystem {
    /// Perceive the SSSR of `mol` and classify its rings.
    pub fn perceive(mol: &Molecule) -> Self {
        let g = mol.graph();
        let target = cyclomatic_number(g);
        if target == 0 {
            return Self::default();
        }

        let cycles = relevant_cycles(g, target);
        let topologies: Vec<RingTopology> = (0..cycles.len())
            .map(|i| classify(g, &cycles, i))
            .collect();

        let candidates = cycles
            .into_iter()
            .zip(topologies)
            .map(|((atoms, bonds), topology)| Ring {
                atoms,
                bonds,
                topology,
            })
            .collect();
        let rings = smallest_set_of_smallest_rings(candidates, target);

        let mut ring_atoms = BitSet::with_capacity(g.node_count());
        let mut ring_bonds = BitSet::with_capacity(g.edge_count());
        for ring in &rings {
            ring_atoms.extend(ring.atoms.iter().copied());
            ring_bonds.union_with(&ring.bonds);
        }

        Self {
            rings,
            ring_atoms,
            ring_bonds,
        }
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Return the number of rings with the given topology.
    pub fn count(&self, topology: RingTopology) -> usize {
        self.rings
            .iter()
            .filter(|r| r.topology == topology)
            .count()
    }

    pub fn atom_in_ring(&self, atom: usize) -> bool {
        self.ring_atoms.contains(atom)
    }

    pub fn bond_in_ring(&self, bond: usize) -> bool {
        self.ring_bonds.contains(bond)
    }
}

/// Number of independent cycles: |E| - |V| + #components.
fn cyclomatic_number(g: &MGraph) -> usize {
    let components = connected_components(g).len();
    (g.edge_count() + components).saturating_sub(g.node_count())
}

/// Row-reduced set of bond sets over GF(2): each row is stored with its pivot
/// bond, and no row contains the pivot of any row stored before it.
#[derive(Debug, Default)]
struct CycleSpace {
    rows: Vec<(usize, BitSet)>,
}

impl CycleSpace {
    fn rank(&self) -> usize {
        self.rows.len()
    }

    /// Remainder of `bonds` after eliminating every stored row. Empty iff
    /// `bonds` is a sum of stored cycles.
    fn reduce(&self, bonds: &BitSet) -> BitSet {
        let mut reduced = bonds.clone();
        for (pivot, row) in &self.rows {
            if reduced.contains(*pivot) {
                reduced.symmetric_difference_with(row);
            }
        }
        reduced
    }

    /// Add `bonds` if it is independent of the stored rows.
    fn insert(&mut self, bonds: &BitSet) -> bool {
        let reduced = self.reduce(bonds);
        match reduced.iter().next() {
            Some(pivot) => {
                self.rows.push((pivot, reduced));
                true
            }
            None => false,
        }
    }
}

/// Breadth-first distances from `root`, `None` for unreachable atoms.
fn distances(g: &MGraph, root: NodeIndex<Index>) -> Vec<Option<usize>> {
    let mut dist = vec![None; g.node_count()];
    dist[root.index()] = Some(0);

    let mut queue = VecDeque::from([(root, 0)]);
    while let Some((v, d)) = queue.pop_front() {
        for n in g.neighbors(v) {
            if dist[n.index()].is_none() {
                dist[n.index()] = Some(d + 1);
                queue.push_back((n, d + 1));
            }
        }
    }
    dist
}

/// Simple cycles of exactly `len` atoms. Each cycle is reported once, starting
/// at its lowest atom and walked towards the lower of that atom's two ring
/// neighbors.
fn cycles_of_length(g: &MGraph, dist: &[Vec<Option<usize>>], len: usize) -> Vec<Vec<usize>> {
    let mut cycles = Vec::new();
    for root in g.node_indices() {
        let mut path = vec![root.index()];
        let mut on_path = BitSet::with_capacity(g.node_count());
        on_path.insert(root.index());
        extend_path(g, &dist[root.index()], len, &mut path, &mut on_path, &mut cycles);
    }
    cycles
}

fn extend_path(
    g: &MGraph,
    dist: &[Option<usize>],
    len: usize,
    path: &mut Vec<usize>,
    on_path: &mut BitSet,
    cycles: &mut Vec<Vec<usize>>,
) {
    let (Some(&root), Some(&last)) = (path.first(), path.last()) else {
        return;
    };
    if path.len() == len {
        let closes = g
            .find_edge(NodeIndex::new(last), NodeIndex::new(root))
            .is_some();
        if closes && path[1] < last {
            cycles.push(path.clone());
        }
        return;
    }

    for n in g.neighbors(NodeIndex::new(last)) {
        let n = n.index();
        // Prune walks that can no longer get back to the root in time.
        let in_reach = dist[n].is_some_and(|d| path.len() + d <= len);
        if n > root && in_reach && !on_path.contains(n) {
            path.push(n);
            on_path.insert(n);
            extend_path(g, dist, len, path, on_path, cycles);
            path.pop();
            on_path.remove(n);
        }
    }
}

/// Bonds of the cycle through `atoms`, in cyclic order.
fn cycle_bonds(g: &MGraph, atoms: &[usize]) -> Option<BitSet> {
    let mut bonds = BitSet::with_capacity(g.edge_count());
    for (k, &a) in atoms.iter().enumerate() {
        let b = atoms[(k + 1) % atoms.len()];
        let e = g.find_edge(NodeIndex::new(a), NodeIndex::new(b))?;
        bonds.insert(e.index());
    }
    Some(bonds)
}

/// Every relevant cycle of `g`, shortest first. Cycles of one length are
/// tested against the span of the strictly shorter ones only, so all
/// relevant cycles of a length are kept even when they depend on each other.
fn relevant_cycles(g: &MGraph, target: usize) -> Vec<(Vec<usize>, BitSet)> {
    let dist: Vec<_> = g.node_indices().map(|r| distances(g, r)).collect();
    let mut shorter = CycleSpace::default();
    let mut relevant = Vec::new();

    for len in 3..=g.node_count() {
        if shorter.rank() == target {
            break;
        }
        let group: Vec<(Vec<usize>, BitSet)> = cycles_of_length(g, &dist, len)
            .into_iter()
            .filter_map(|atoms| cycle_bonds(g, &atoms).map(|bonds| (atoms, bonds)))
            .filter(|(_, bonds)| !shorter.reduce(bonds).is_empty())
            .collect();
        for (_, bonds) in &group {
            shorter.insert(bonds);
        }
        tracing::trace!(len, relevant = group.len(), rank = shorter.rank(), "ring size done");
        relevant.extend(group);
    }
    relevant
}

/// Select `target` independent rings of minimum total size, preferring the
/// lower topology among rings of equal size.
fn smallest_set_of_smallest_rings(mut candidates: Vec<Ring>, target: usize) -> Vec<Ring> {
    candidates.sort_by(|a, b| {
        a.size()
            .cmp(&b.size())
            .then(a.topology.cmp(&b.topology))
            .then_with(|| a.bonds.iter().cmp(b.bonds.iter()))
    });

    let mut space = CycleSpace::default();
    candidates.retain(|ring| space.rank() < target && space.insert(&ring.bonds));

    if candidates.len() < target {
        tracing::warn!(
            found = candidates.len(),
            expected = target,
            "ring perception found fewer rings than the cyclomatic number"
        );
    }
    candidates
}

/// Classify cycle `i` against every other relevant cycle.
fn classify(g: &MGraph, cycles: &[(Vec<usize>, BitSet)], i: usize) -> RingTopology {
    let (atoms, bonds) = &cycles[i];
    let mut topology = RingTopology::Isolated;

    for (j, (other_atoms, other_bonds)) in cycles.iter().enumerate() {
        if i == j {
            continue;
        }
        let shared: Vec<usize> = atoms
            .iter()
            .copied()
            .filter(|a| other_atoms.contains(a))
            .collect();

        let relation = match shared.len() {
            0 => RingTopology::Isolated,
            1 => RingTopology::Spiro,
            2 => {
                let shared_bond = g
                    .find_edge(NodeIndex::new(shared[0]), NodeIndex::new(shared[1]))
                    .is_some_and(|e| bonds.contains(e.index()) && other_bonds.contains(e.index()));
                if shared_bond {
                    RingTopology::Fused
                } else {
                    RingTopology::Bridged
                }
            }
            _ => RingTopology::Bridged,
        };
        topology = topology.max(relation);
    }
    topology
}
