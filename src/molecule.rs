//! Graph-theoretic representation of a molecule.
//!
//! Callers describe a molecule as a flat arena of [`Atom`]s and [`Bond`]s
//! (a [`MolecularGraph`]); bonds refer to atoms by position, so ring
//! structures never need reference cycles. Before any descriptor is computed,
//! the arena is checked for structural well-formedness and converted into a
//! [`Molecule`], an undirected `petgraph` graph whose node indices coincide
//! with the caller's atom indices.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use petgraph::{
    graph::{Graph, NodeIndex},
    Undirected,
};

use crate::error::{Error, Result};

pub(crate) type Index = u32;
pub(crate) type MGraph = Graph<Atom, Edge, Undirected, Index>;

/// Thrown by [`Element::from_str`] if the string does not represent a valid
/// chemical element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseElementError;

macro_rules! periodic_table {
    ( $(($element:ident, $symbol:literal, $number:literal),)* ) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        /// Represents a chemical element.
        pub enum Element {
            $( $element, )*
        }

        impl Element {
            /// Return the atomic number of this element.
            pub fn atomic_number(&self) -> u8 {
                match &self {
                    $( Element::$element => $number, )*
                }
            }

            /// Return the element symbol, e.g. `"Cl"`.
            pub fn symbol(&self) -> &'static str {
                match &self {
                    $( Element::$element => $symbol, )*
                }
            }
        }

        impl Display for Element {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.symbol())
            }
        }

        impl FromStr for Element {
            type Err = ParseElementError;
            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $( $symbol => Ok(Element::$element), )*
                    _ => Err(ParseElementError),
                }
            }
        }
    };
}

periodic_table!(
    (Hydrogen, "H", 1),
    (Helium, "He", 2),
    (Lithium, "Li", 3),
    (Beryllium, "Be", 4),
    (Boron, "B", 5),
    (Carbon, "C", 6),
    (Nitrogen, "N", 7),
    (Oxygen, "O", 8),
    (Fluorine, "F", 9),
    (Neon, "Ne", 10),
    (Sodium, "Na", 11),
    (Magnesium, "Mg", 12),
    (Aluminum, "Al", 13),
    (Silicon, "Si", 14),
    (Phosphorus, "P", 15),
    (Sulfur, "S", 16),
    (Chlorine, "Cl", 17),
    (Argon, "Ar", 18),
    (Potassium, "K", 19),
    (Calcium, "Ca", 20),
    (Scandium, "Sc", 21),
    (Titanium, "Ti", 22),
    (Vanadium, "V", 23),
    (Chromium, "Cr", 24),
    (Manganese, "Mn", 25),
    (Iron, "Fe", 26),
    (Cobalt, "Co", 27),
    (Nickel, "Ni", 28),
    (Copper, "Cu", 29),
    (Zinc, "Zn", 30),
    (Gallium, "Ga", 31),
    (Germanium, "Ge", 32),
    (Arsenic, "As", 33),
    (Selenium, "Se", 34),
    (Bromine, "Br", 35),
    (Krypton, "Kr", 36),
    (Rubidium, "Rb", 37),
    (Strontium, "Sr", 38),
    (Yttrium, "Y", 39),
    (Zirconium, "Zr", 40),
    (Niobium, "Nb", 41),
    (Molybdenum, "Mo", 42),
    (Technetium, "Tc", 43),
    (Ruthenium, "Ru", 44),
    (Rhodium, "Rh", 45),
    (Palladium, "Pd", 46),
    (Silver, "Ag", 47),
    (Cadmium, "Cd", 48),
    (Indium, "In", 49),
    (Tin, "Sn", 50),
    (Antimony, "Sb", 51),
    (Tellurium, "Te", 52),
    (Iodine, "I", 53),
    (Xenon, "Xe", 54),
    (Cesium, "Cs", 55),
    (Barium, "Ba", 56),
    (Lanthanum, "La", 57),
    (Cerium, "Ce", 58),
    (Praseodymium, "Pr", 59),
    (Neodymium, "Nd", 60),
    (Promethium, "Pm", 61),
    (Samarium, "Sm", 62),
    (Europium, "Eu", 63),
    (Gadolinium, "Gd", 64),
    (Terbium, "Tb", 65),
    (Dysprosium, "Dy", 66),
    (Holmium, "Ho", 67),
    (Erbium, "Er", 68),
    (Thulium, "Tm", 69),
    (Ytterbium, "Yb", 70),
    (Lutetium, "Lu", 71),
    (Hafnium, "Hf", 72),
    (Tantalum, "Ta", 73),
    (Wolfram, "W", 74),
    (Rhenium, "Re", 75),
    (Osmium, "Os", 76),
    (Iridium, "Ir", 77),
    (Platinum, "Pt", 78),
    (Gold, "Au", 79),
    (Mercury, "Hg", 80),
    (Thallium, "Tl", 81),
    (Lead, "Pb", 82),
    (Bismuth, "Bi", 83),
    (Polonium, "Po", 84),
    (Astatine, "At", 85),
    (Radon, "Rn", 86),
    (Francium, "Fr", 87),
    (Radium, "Ra", 88),
    (Actinium, "Ac", 89),
    (Thorium, "Th", 90),
    (Protactinium, "Pa", 91),
    (Uranium, "U", 92),
    (Neptunium, "Np", 93),
    (Plutonium, "Pu", 94),
    (Americium, "Am", 95),
    (Curium, "Cm", 96),
    (Berkelium, "Bk", 97),
    (Californium, "Cf", 98),
    (Einsteinium, "Es", 99),
    (Fermium, "Fm", 100),
    (Mendelevium, "Md", 101),
    (Nobelium, "No", 102),
    (Lawrencium, "Lr", 103),
    (Rutherfordium, "Rf", 104),
    (Dubnium, "Db", 105),
    (Seaborgium, "Sg", 106),
    (Bohrium, "Bh", 107),
    (Hassium, "Hs", 108),
    (Meitnerium, "Mt", 109),
    (Darmstadtium, "Ds", 110),
    (Roentgenium, "Rg", 111),
    (Copernicium, "Cn", 112),
    (Nihonium, "Nh", 113),
    (Flerovium, "Fl", 114),
    (Moscovium, "Mc", 115),
    (Livermorium, "Lv", 116),
    (Tennessine, "Ts", 117),
    (Oganesson, "Og", 118),
);

impl Element {
    /// Return `true` iff this element is hydrogen.
    pub fn is_hydrogen(&self) -> bool {
        *self == Element::Hydrogen
    }

    /// Return `true` iff this element counts as a heteroatom, i.e., it is
    /// neither carbon nor hydrogen.
    pub fn is_hetero(&self) -> bool {
        !matches!(self, Element::Carbon | Element::Hydrogen)
    }
}

/// Orbital hybridization of an atom, as assigned by the upstream parser.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hybridization {
    Sp,
    Sp2,
    Sp3,
    Aromatic,
    /// Hydrogens, metals, and anything the parser did not classify.
    #[default]
    Unspecified,
}

/// Tetrahedral chirality tag of an atom.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Chirality {
    #[default]
    None,
    Clockwise,
    CounterClockwise,
}

/// The nodes of a [`Molecule`] graph.
///
/// Besides its element, an atom carries the attributes the upstream parser
/// has already perceived: formal charge, hybridization, the number of
/// implicit (unlisted) hydrogens, and a tetrahedral chirality tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom {
    element: Element,
    charge: i8,
    hybridization: Hybridization,
    hydrogens: u8,
    chirality: Chirality,
}

impl Atom {
    /// Construct a neutral [`Atom`] of type `element` with no implicit
    /// hydrogens, unspecified hybridization and no chirality tag.
    pub fn new(element: Element) -> Self {
        Self {
            element,
            charge: 0,
            hybridization: Hybridization::Unspecified,
            hydrogens: 0,
            chirality: Chirality::None,
        }
    }

    pub fn with_charge(mut self, charge: i8) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_hybridization(mut self, hybridization: Hybridization) -> Self {
        self.hybridization = hybridization;
        self
    }

    /// Set the number of implicit hydrogens attached to this atom.
    pub fn with_hydrogens(mut self, hydrogens: u8) -> Self {
        self.hydrogens = hydrogens;
        self
    }

    pub fn with_chirality(mut self, chirality: Chirality) -> Self {
        self.chirality = chirality;
        self
    }

    /// Return this [`Atom`]'s element.
    pub fn element(&self) -> Element {
        self.element
    }

    pub fn charge(&self) -> i8 {
        self.charge
    }

    pub fn hybridization(&self) -> Hybridization {
        self.hybridization
    }

    /// Return the number of implicit hydrogens on this atom. Explicit
    /// hydrogen atoms bonded to it are not included.
    pub fn hydrogens(&self) -> u8 {
        self.hydrogens
    }

    pub fn chirality(&self) -> Chirality {
        self.chirality
    }

    /// Return `true` iff this atom is not a hydrogen.
    pub fn is_heavy(&self) -> bool {
        !self.element.is_hydrogen()
    }
}

/// Bond order of a [`Bond`].
///
/// Aromatic bonds keep their own order; rings are never kekulized.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl TryFrom<i64> for BondOrder {
    type Error = Error;

    /// Accept the integer codes used by connection tables: 1, 2 and 3 for
    /// single, double and triple bonds and 4 for aromatic bonds.
    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(BondOrder::Single),
            2 => Ok(BondOrder::Double),
            3 => Ok(BondOrder::Triple),
            4 => Ok(BondOrder::Aromatic),
            _ => Err(Error::InvalidBondOrder(value)),
        }
    }
}

/// Configuration of a stereogenic double bond.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BondStereo {
    #[default]
    None,
    Cis,
    Trans,
}

/// A bond between two atoms of a [`MolecularGraph`], referenced by position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Bond {
    begin: usize,
    end: usize,
    order: BondOrder,
    stereo: BondStereo,
}

impl Bond {
    pub fn new(begin: usize, end: usize, order: BondOrder) -> Self {
        Self {
            begin,
            end,
            order,
            stereo: BondStereo::None,
        }
    }

    pub fn with_stereo(mut self, stereo: BondStereo) -> Self {
        self.stereo = stereo;
        self
    }

    /// Return the positions of the two atoms joined by this bond.
    pub fn atoms(&self) -> (usize, usize) {
        (self.begin, self.end)
    }

    pub fn order(&self) -> BondOrder {
        self.order
    }

    pub fn stereo(&self) -> BondStereo {
        self.stereo
    }
}

/// The edges of a [`Molecule`] graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Edge {
    pub(crate) order: BondOrder,
    pub(crate) stereo: BondStereo,
}

/// A caller-owned molecule: atoms and bonds in flat, indexed collections.
///
/// The graph may be disconnected, and nothing about it is checked until it
/// is handed to the scorer (or converted into a [`Molecule`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MolecularGraph {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl MolecularGraph {
    /// Construct an empty [`MolecularGraph`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a [`MolecularGraph`] from existing atom and bond lists.
    pub fn from_parts(atoms: Vec<Atom>, bonds: Vec<Bond>) -> Self {
        Self { atoms, bonds }
    }

    /// Append `atom` and return its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Append a bond of order `order` between atoms `i` and `j` and return its
    /// index. The indices are not checked here.
    pub fn add_bond(&mut self, i: usize, j: usize, order: BondOrder) -> usize {
        self.push_bond(Bond::new(i, j, order))
    }

    /// Append an arbitrary [`Bond`] and return its index.
    pub fn push_bond(&mut self, bond: Bond) -> usize {
        self.bonds.push(bond);
        self.bonds.len() - 1
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Check that this graph is structurally well-formed.
    ///
    /// Every bond must join two distinct atoms that exist, no atom pair may be
    /// joined twice, and aromatic bonds may only touch aromatic atoms. The
    /// first violation found (in bond order) is returned.
    pub fn validate(&self) -> Result<()> {
        let atom_count = self.atoms.len();
        let mut seen = BTreeMap::<(usize, usize), usize>::new();

        for (ix, bond) in self.bonds.iter().enumerate() {
            let (i, j) = bond.atoms();
            for atom in [i, j] {
                if atom >= atom_count {
                    return Err(Error::DanglingBond {
                        bond: ix,
                        atom,
                        atom_count,
                    });
                }
            }

            if i == j {
                return Err(Error::SelfLoop { bond: ix, atom: i });
            }

            let key = (i.min(j), i.max(j));
            if let Some(&first) = seen.get(&key) {
                return Err(Error::DuplicateBond {
                    first,
                    second: ix,
                    i: key.0,
                    j: key.1,
                });
            }
            seen.insert(key, ix);

            if bond.order() == BondOrder::Aromatic {
                for atom in [i, j] {
                    if self.atoms[atom].hybridization() != Hybridization::Aromatic {
                        return Err(Error::InconsistentAromaticity { bond: ix, atom });
                    }
                }
            }
        }
        Ok(())
    }
}

/// A validated, simple, loopless graph with [`Atom`]s as nodes and bonds as
/// edges.
///
/// Hydrogens may appear either as implicit counts on heavy atoms or as
/// explicit nodes; descriptors treat both the same way.
#[derive(Debug, Clone)]
pub struct Molecule {
    graph: MGraph,
}

impl Molecule {
    /// Construct a [`Molecule`] from an existing `MGraph`.
    pub(crate) fn from_graph(g: MGraph) -> Self {
        Self { graph: g }
    }

    /// Return a representation of this molecule as an `MGraph`.
    pub(crate) fn graph(&self) -> &MGraph {
        &self.graph
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Return the atom stored at position `ix`.
    pub fn atom(&self, ix: usize) -> Option<&Atom> {
        self.graph.node_weight(NodeIndex::new(ix))
    }

    /// Return the number of hydrogens attached to the atom at `ix`, counting
    /// both implicit hydrogens and explicit hydrogen neighbors.
    pub(crate) fn total_hydrogens(&self, ix: NodeIndex<Index>) -> usize {
        let implicit = self.graph[ix].hydrogens() as usize;
        let explicit = self
            .graph
            .neighbors(ix)
            .filter(|&n| !self.graph[n].is_heavy())
            .count();
        implicit + explicit
    }

    /// Return the number of heavy-atom neighbors of the atom at `ix`.
    pub(crate) fn heavy_degree(&self, ix: NodeIndex<Index>) -> usize {
        self.graph
            .neighbors(ix)
            .filter(|&n| self.graph[n].is_heavy())
            .count()
    }
}

impl TryFrom<&MolecularGraph> for Molecule {
    type Error = Error;

    fn try_from(mol: &MolecularGraph) -> Result<Self> {
        mol.validate()?;

        let mut graph = MGraph::with_capacity(mol.atoms.len(), mol.bonds.len());
        for atom in &mol.atoms {
            graph.add_node(*atom);
        }
        for bond in &mol.bonds {
            let (i, j) = bond.atoms();
            graph.add_edge(
                NodeIndex::new(i),
                NodeIndex::new(j),
                Edge {
                    order: bond.order(),
                    stereo: bond.stereo(),
                },
            );
        }
        Ok(Molecule::from_graph(graph))
    }
}
