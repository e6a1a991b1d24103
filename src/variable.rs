//! Field descriptors: the binding between a physical quantity, an
//! interpolation scheme and a set of dof identities.
use crate::dof::DofId;
use crate::error::AssemblyError;
use crate::interpolation::Interpolation;
use nalgebra::RealField;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// The physical quantity a field represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    Displacement,
    Temperature,
    Pressure,
}

/// Whether a field is scalar-valued or vector-valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueCategory {
    Scalar,
    Vector,
}

/// Describes an unknown field (or its test counterpart) in a weak formulation.
///
/// A variable binds a quantity to an interpolation scheme, a value category and
/// a component count. Its dof identities are assigned once during
/// initialization, when the physics setup decides which concrete nodal unknowns
/// the field maps to. A test field additionally keeps a non-owning back
/// reference to the primary (unknown) field it is dual to; the physics setup
/// owns both and must keep the primary alive for as long as any test field
/// references it.
///
/// Variables are created once per physics setup and shared (via [`Arc`]) across
/// all elements and terms that integrate the field.
#[derive(Debug)]
pub struct Variable<T: RealField> {
    interpolation: Arc<dyn Interpolation<T>>,
    quantity: Quantity,
    category: ValueCategory,
    components: usize,
    dof_ids: OnceLock<Vec<DofId>>,
    dual: Option<Arc<Variable<T>>>,
}

impl<T: RealField> Variable<T> {
    /// Creates a primary (unknown) field descriptor.
    pub fn new(
        interpolation: Arc<dyn Interpolation<T>>,
        quantity: Quantity,
        category: ValueCategory,
        components: usize,
    ) -> Result<Self, AssemblyError> {
        Self::build(interpolation, quantity, category, components, None)
    }

    /// Creates a test field descriptor dual to `primary`.
    ///
    /// The test field must be compatible with its primary: same quantity and
    /// same component count.
    pub fn dual_of(
        primary: &Arc<Variable<T>>,
        interpolation: Arc<dyn Interpolation<T>>,
    ) -> Result<Self, AssemblyError> {
        Self::build(
            interpolation,
            primary.quantity,
            primary.category,
            primary.components,
            Some(Arc::clone(primary)),
        )
    }

    fn build(
        interpolation: Arc<dyn Interpolation<T>>,
        quantity: Quantity,
        category: ValueCategory,
        components: usize,
        dual: Option<Arc<Variable<T>>>,
    ) -> Result<Self, AssemblyError> {
        match category {
            ValueCategory::Scalar if components != 1 => {
                return Err(AssemblyError::configuration(format!(
                    "scalar variable must have exactly one component, got {}",
                    components
                )));
            }
            ValueCategory::Vector if components == 0 => {
                return Err(AssemblyError::configuration(
                    "vector variable must have at least one component",
                ));
            }
            _ => {}
        }
        if let Some(primary) = &dual {
            if primary.quantity != quantity || primary.components != components {
                return Err(AssemblyError::configuration(format!(
                    "test field ({:?}, {} components) is incompatible with its primary ({:?}, {} components)",
                    quantity, components, primary.quantity, primary.components
                )));
            }
        }
        Ok(Self {
            interpolation,
            quantity,
            category,
            components,
            dof_ids: OnceLock::new(),
            dual,
        })
    }

    pub fn interpolation(&self) -> &Arc<dyn Interpolation<T>> {
        &self.interpolation
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn category(&self) -> ValueCategory {
        self.category
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// The primary field this descriptor is the test counterpart of, if any.
    pub fn dual(&self) -> Option<&Arc<Variable<T>>> {
        self.dual.as_ref()
    }

    pub fn is_test_field(&self) -> bool {
        self.dual.is_some()
    }

    /// The ordered dof identities of this field, one per component.
    ///
    /// Fails with a configuration error if queried before
    /// [`assign_dof_ids`](Self::assign_dof_ids) was called.
    pub fn dof_ids(&self) -> Result<&[DofId], AssemblyError> {
        self.dof_ids
            .get()
            .map(Vec::as_slice)
            .ok_or_else(|| {
                AssemblyError::configuration(format!(
                    "dof identities of {:?} variable queried before assignment",
                    self.quantity
                ))
            })
    }

    /// Assigns the dof identities of this field.
    ///
    /// Must provide exactly one distinct identity per component. Calling this
    /// again with the same sequence is a no-op; a different sequence is a
    /// configuration error.
    pub fn assign_dof_ids(&self, ids: Vec<DofId>) -> Result<(), AssemblyError> {
        if ids.len() != self.components {
            return Err(AssemblyError::configuration(format!(
                "{:?} variable has {} components but {} dof identities were assigned",
                self.quantity,
                self.components,
                ids.len()
            )));
        }
        if ids.iter().enumerate().any(|(i, id)| ids[..i].contains(id)) {
            return Err(AssemblyError::configuration(format!(
                "duplicate dof identity in assignment {:?}",
                ids
            )));
        }
        match self.dof_ids.set(ids) {
            Ok(()) => Ok(()),
            Err(rejected) => {
                if self.dof_ids.get().map(Vec::as_slice) == Some(rejected.as_slice()) {
                    Ok(())
                } else {
                    Err(AssemblyError::configuration(format!(
                        "dof identities of {:?} variable already assigned to a different sequence",
                        self.quantity
                    )))
                }
            }
        }
    }
}
