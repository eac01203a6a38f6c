//! Structural complexity scores for molecular graphs.
//!
//! ```
//! use molecular_complexity::{score, Atom, BondOrder, Element, Hybridization, MolecularGraph};
//!
//! let mut g = MolecularGraph::new();
//! let c = g.add_atom(Atom::new(Element::Carbon).with_hybridization(Hybridization::Sp3).with_hydrogens(3));
//! let o = g.add_atom(Atom::new(Element::Oxygen).with_hybridization(Hybridization::Sp3).with_hydrogens(1));
//! g.add_bond(c, o, BondOrder::Single);
//!
//! let scores = score(&g, &["proudfoot_cm", "ring_stereo"]).unwrap();
//! assert_eq!(scores[0].name(), "proudfoot_cm");
//! ```

// Molecule definition and validation
pub mod molecule;

// Errors shared by every stage
pub mod error;

// Data IO
pub mod loader;

// Ring perception and classification
pub mod rings;

// Symmetry classes of heavy atoms
pub mod symmetry;

// Proudfoot atom environments
pub mod environment;

// Structural descriptors
pub mod features;

// Named metrics and their weights
pub mod metrics;

// Scoring entry points
pub mod scorer;

// Utility functions
mod utils;

// Python library
#[cfg(feature = "python")]
pub mod python;

pub use error::{Error, Result};
pub use features::{extract, Feature, FeatureSet};
pub use metrics::{Coefficients, ComplexityScore, Metric, MetricEntry, MetricRegistry};
pub use molecule::{
    Atom, Bond, BondOrder, BondStereo, Chirality, Element, Hybridization, MolecularGraph,
};
pub use scorer::{score, Scorer};
