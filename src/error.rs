//! Error types shared across the assembly core.
use crate::dof::DofId;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Library-wide error type for the assembly core.
///
/// All variants describe structural or configuration problems that are discovered
/// synchronously during setup or the first integration pass. None of them are
/// retryable: the intended treatment is to propagate the error to the analysis
/// driver and abort with diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssemblyError {
    /// A variable or term was used before its required setup was completed,
    /// or its configuration is internally inconsistent.
    Configuration { context: String },
    /// The shape declared by a term disagrees with the shape it actually produced.
    ///
    /// This is a programming-contract violation on the side of the term
    /// implementation, so the error carries enough context to identify the
    /// offending term and cell.
    DimensionMismatch {
        term: String,
        cell: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Code-number resolution could not find a dof with the requested identity
    /// on a node required by an interpolation.
    MissingDof { node: usize, dof: DofId },
    /// A term or interpolation was asked to operate on a geometry it does not support.
    UnsupportedConfiguration { context: String },
}

impl AssemblyError {
    /// Convenience constructor for [`AssemblyError::Configuration`].
    pub fn configuration(context: impl Into<String>) -> Self {
        Self::Configuration { context: context.into() }
    }

    /// Convenience constructor for [`AssemblyError::UnsupportedConfiguration`].
    pub fn unsupported(context: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration { context: context.into() }
    }
}

impl Display for AssemblyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { context } => {
                write!(f, "Invalid configuration: {}", context)
            }
            Self::DimensionMismatch {
                term,
                cell,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Term '{}' on cell {} declared contribution shape {}x{} but produced {}x{}",
                    term, cell, expected.0, expected.1, actual.0, actual.1
                )
            }
            Self::MissingDof { node, dof } => {
                write!(f, "Node {} does not carry a dof with identity {:?}", node, dof)
            }
            Self::UnsupportedConfiguration { context } => {
                write!(f, "Unsupported configuration: {}", context)
            }
        }
    }
}

impl std::error::Error for AssemblyError {}
