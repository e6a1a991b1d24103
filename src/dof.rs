//! Degrees of freedom and their nodal storage.
use nalgebra::{RealField, Scalar};
use serde::{Deserialize, Serialize};

/// Identity of a single scalar unknown at a node.
///
/// Two field descriptors refer to the *same* nodal unknown if and only if their
/// dof identities compare equal. Dof creation during element initialization
/// merges by identity, so e.g. a mechanical term and a coupled term that both
/// request [`DofId::DisplacementX`] on a node end up sharing one dof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DofId {
    DisplacementX,
    DisplacementY,
    DisplacementZ,
    Temperature,
    Pressure,
}

/// Selects which stored value of an unknown is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueMode {
    /// The current (total) value of the unknown.
    Total,
    /// The value at the previously committed time step.
    Previous,
}

/// A single scalar unknown stored at a node.
///
/// Carries the current and previously committed values, and the global equation
/// number assigned by [`crate::mesh::Domain::number_equations`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Dof<T: Scalar> {
    id: DofId,
    equation_number: Option<usize>,
    value: T,
    previous: T,
}

impl<T: RealField> Dof<T> {
    pub fn new(id: DofId) -> Self {
        Self {
            id,
            equation_number: None,
            value: T::zero(),
            previous: T::zero(),
        }
    }

    pub fn id(&self) -> DofId {
        self.id
    }

    /// The global equation number, if equation numbering has been performed.
    pub fn equation_number(&self) -> Option<usize> {
        self.equation_number
    }

    pub(crate) fn set_equation_number(&mut self, number: usize) {
        self.equation_number = Some(number);
    }

    pub fn value(&self, mode: ValueMode) -> T {
        match mode {
            ValueMode::Total => self.value.clone(),
            ValueMode::Previous => self.previous.clone(),
        }
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    /// Commits the current value as the previous-step value.
    pub fn commit(&mut self) {
        self.previous = self.value.clone();
    }
}
