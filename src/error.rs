//! Error types for complexity scoring.
//!
//! Failures fall into three groups: the input graph is not well-formed, the
//! caller asked for a metric the registry does not know, or an internal
//! invariant of feature extraction was violated.

use thiserror::Error;

/// Errors that can occur while validating, extracting or scoring a molecule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A bond references an atom index outside the atom set.
    #[error("bond {bond} references atom {atom}, but the graph has only {atom_count} atoms")]
    DanglingBond {
        bond: usize,
        atom: usize,
        atom_count: usize,
    },

    /// A bond joins an atom to itself.
    #[error("bond {bond} joins atom {atom} to itself")]
    SelfLoop { bond: usize, atom: usize },

    /// Two bonds join the same pair of atoms.
    #[error("bonds {first} and {second} both join atoms {i} and {j}")]
    DuplicateBond {
        first: usize,
        second: usize,
        i: usize,
        j: usize,
    },

    /// An aromatic bond touches an atom that is not marked aromatic.
    #[error("aromatic bond {bond} touches non-aromatic atom {atom}")]
    InconsistentAromaticity { bond: usize, atom: usize },

    /// An integer bond order outside the accepted range.
    #[error("invalid bond order {0}: expected 1, 2, 3 or 4 (aromatic)")]
    InvalidBondOrder(i64),

    /// An unknown or unregistered metric, or a bad coefficient override.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A structural property that extraction relies on is missing.
    ///
    /// Unreachable for graphs that passed validation.
    #[error("feature extraction failed: {0}")]
    FeatureExtraction(String),
}

impl Error {
    /// Return `true` iff this error describes a malformed input graph.
    pub fn is_invalid_structure(&self) -> bool {
        matches!(
            self,
            Error::DanglingBond { .. }
                | Error::SelfLoop { .. }
                | Error::DuplicateBond { .. }
                | Error::InconsistentAromaticity { .. }
                | Error::InvalidBondOrder(_)
        )
    }

    pub(crate) fn configuration(detail: impl Into<String>) -> Self {
        Error::Configuration(detail.into())
    }

    pub(crate) fn extraction(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        tracing::error!(%detail, "internal invariant violated during feature extraction");
        Error::FeatureExtraction(detail)
    }
}

/// Shorthand for results carrying an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_are_classified() {
        assert!(Error::SelfLoop { bond: 0, atom: 1 }.is_invalid_structure());
        assert!(Error::InvalidBondOrder(-1).is_invalid_structure());
        assert!(!Error::configuration("nope").is_invalid_structure());
    }

    #[test]
    fn messages_name_the_offending_indices() {
        let e = Error::DanglingBond {
            bond: 2,
            atom: 7,
            atom_count: 3,
        };
        assert_eq!(
            e.to_string(),
            "bond 2 references atom 7, but the graph has only 3 atoms"
        );
    }
}
