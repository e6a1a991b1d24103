//! Reference weak-form terms.
//!
//! These are the built-in physics integrands: a diffusion (conductivity /
//! permeability) term, a capacity (mass) term and a source (load) term. They
//! double as templates for physics modules implementing their own terms.
use crate::assembly::local::{field_dimension, WeakFormTerm};
use crate::dof::ValueMode;
use crate::element::CellContext;
use crate::error::AssemblyError;
use crate::quadrature::IntegrationPoint;
use crate::time::TimeStep;
use crate::variable::Variable;
use nalgebra::{DMatrix, DVector, RealField};
use std::sync::Arc;

fn check_dual_consistency<T: RealField>(
    test_field: &Arc<Variable<T>>,
    unknown_field: &Arc<Variable<T>>,
) -> Result<(), AssemblyError> {
    if let Some(primary) = test_field.dual() {
        if !Arc::ptr_eq(primary, unknown_field) {
            return Err(AssemblyError::configuration(
                "test field is dual to a different variable than the term's unknown field",
            ));
        }
    }
    Ok(())
}

/// Evaluates the physical-space shape function gradients of `variable` on the
/// context's cell at `xi`: `dim` rows, one column per node.
fn physical_gradients<T: RealField>(
    context: &CellContext<T>,
    variable: &Variable<T>,
    xi: &[T],
) -> Result<DMatrix<T>, AssemblyError> {
    let kind = context.kind();
    if context.domain().dim() != kind.reference_dim() {
        return Err(AssemblyError::unsupported(format!(
            "gradient evaluation requires cell dimension ({}) equal to domain dimension ({})",
            kind.reference_dim(),
            context.domain().dim()
        )));
    }
    let jacobian = context.jacobian(xi);
    let jacobian_inv_t = jacobian
        .try_inverse()
        .ok_or_else(|| {
            AssemblyError::unsupported(format!(
                "singular geometry Jacobian on cell {}",
                context.cell_index()
            ))
        })?
        .transpose();
    let mut reference_gradients = DMatrix::zeros(0, 0);
    variable
        .interpolation()
        .populate_basis_gradients(&mut reference_gradients, kind, xi)?;
    Ok(jacobian_inv_t * reference_gradients)
}

/// The diffusion term $\int \nabla w \cdot k \, \nabla u$, the weak form of
/// scalar conduction/permeation with constant isotropic coefficient `k`.
#[derive(Debug)]
pub struct DiffusionTerm<T: RealField> {
    test_field: Arc<Variable<T>>,
    unknown_field: Arc<Variable<T>>,
    conductivity: T,
}

impl<T: RealField> DiffusionTerm<T> {
    pub fn new(
        test_field: Arc<Variable<T>>,
        unknown_field: Arc<Variable<T>>,
        conductivity: T,
    ) -> Result<Self, AssemblyError> {
        if test_field.components() != 1 || unknown_field.components() != 1 {
            return Err(AssemblyError::configuration(
                "diffusion term is defined for scalar fields only",
            ));
        }
        check_dual_consistency(&test_field, &unknown_field)?;
        Ok(Self {
            test_field,
            unknown_field,
            conductivity,
        })
    }
}

impl<T: RealField> WeakFormTerm<T> for DiffusionTerm<T> {
    fn name(&self) -> &str {
        "diffusion"
    }

    fn test_field(&self) -> &Arc<Variable<T>> {
        &self.test_field
    }

    fn unknown_field(&self) -> &Arc<Variable<T>> {
        &self.unknown_field
    }

    fn required_shape(&self, context: &CellContext<T>) -> Result<(usize, usize), AssemblyError> {
        Ok((
            field_dimension(context, &self.test_field)?,
            field_dimension(context, &self.unknown_field)?,
        ))
    }

    fn prepare_for_cell(&self, context: &CellContext<T>) -> Result<(), AssemblyError> {
        if context.domain().dim() != context.kind().reference_dim() {
            return Err(AssemblyError::unsupported(format!(
                "diffusion term cannot integrate a {}d cell embedded in a {}d domain",
                context.kind().reference_dim(),
                context.domain().dim()
            )));
        }
        Ok(())
    }

    fn evaluate_tangent(
        &self,
        context: &CellContext<T>,
        point: &IntegrationPoint<T>,
        _step: &TimeStep<T>,
    ) -> Result<DMatrix<T>, AssemblyError> {
        let test_gradients = physical_gradients(context, &self.test_field, point.coords())?;
        let unknown_gradients = physical_gradients(context, &self.unknown_field, point.coords())?;
        Ok(test_gradients.transpose() * unknown_gradients * self.conductivity.clone())
    }

    fn evaluate_residual(
        &self,
        context: &CellContext<T>,
        point: &IntegrationPoint<T>,
        step: &TimeStep<T>,
    ) -> Result<DVector<T>, AssemblyError> {
        let tangent = self.evaluate_tangent(context, point, step)?;
        let unknowns = context.field_unknown_vector(&self.unknown_field, ValueMode::Total)?;
        Ok(tangent * unknowns)
    }
}

/// The capacity term $\int w \, c \, u$: mass/capacity coupling with constant
/// coefficient `c`, applied componentwise for vector fields.
#[derive(Debug)]
pub struct CapacityTerm<T: RealField> {
    test_field: Arc<Variable<T>>,
    unknown_field: Arc<Variable<T>>,
    capacity: T,
}

impl<T: RealField> CapacityTerm<T> {
    pub fn new(
        test_field: Arc<Variable<T>>,
        unknown_field: Arc<Variable<T>>,
        capacity: T,
    ) -> Result<Self, AssemblyError> {
        if test_field.components() != unknown_field.components() {
            return Err(AssemblyError::configuration(format!(
                "capacity term requires matching component counts, got {} and {}",
                test_field.components(),
                unknown_field.components()
            )));
        }
        check_dual_consistency(&test_field, &unknown_field)?;
        Ok(Self {
            test_field,
            unknown_field,
            capacity,
        })
    }
}

impl<T: RealField> WeakFormTerm<T> for CapacityTerm<T> {
    fn name(&self) -> &str {
        "capacity"
    }

    fn test_field(&self) -> &Arc<Variable<T>> {
        &self.test_field
    }

    fn unknown_field(&self) -> &Arc<Variable<T>> {
        &self.unknown_field
    }

    fn required_shape(&self, context: &CellContext<T>) -> Result<(usize, usize), AssemblyError> {
        Ok((
            field_dimension(context, &self.test_field)?,
            field_dimension(context, &self.unknown_field)?,
        ))
    }

    fn evaluate_tangent(
        &self,
        context: &CellContext<T>,
        point: &IntegrationPoint<T>,
        _step: &TimeStep<T>,
    ) -> Result<DMatrix<T>, AssemblyError> {
        let kind = context.kind();
        let components = self.test_field.components();

        let test_count = self.test_field.interpolation().node_count(kind)?;
        let mut test_basis = vec![T::zero(); test_count];
        self.test_field
            .interpolation()
            .populate_basis(&mut test_basis, kind, point.coords())?;

        let unknown_count = self.unknown_field.interpolation().node_count(kind)?;
        let mut unknown_basis = vec![T::zero(); unknown_count];
        self.unknown_field
            .interpolation()
            .populate_basis(&mut unknown_basis, kind, point.coords())?;

        let mut result = DMatrix::zeros(test_count * components, unknown_count * components);
        for (i, phi_i) in test_basis.iter().enumerate() {
            for (j, phi_j) in unknown_basis.iter().enumerate() {
                let value = self.capacity.clone() * phi_i.clone() * phi_j.clone();
                for component in 0..components {
                    result[(i * components + component, j * components + component)] =
                        value.clone();
                }
            }
        }
        Ok(result)
    }

    fn evaluate_residual(
        &self,
        context: &CellContext<T>,
        point: &IntegrationPoint<T>,
        step: &TimeStep<T>,
    ) -> Result<DVector<T>, AssemblyError> {
        let tangent = self.evaluate_tangent(context, point, step)?;
        let unknowns = context.field_unknown_vector(&self.unknown_field, ValueMode::Total)?;
        Ok(tangent * unknowns)
    }
}

/// The source term $\int w \, f$ with constant magnitude `f`: a residual-only
/// load, its tangent contribution is identically zero.
///
/// Constructed from a test field alone; the unknown field is resolved through
/// the test field's dual back-reference.
#[derive(Debug)]
pub struct SourceTerm<T: RealField> {
    test_field: Arc<Variable<T>>,
    unknown_field: Arc<Variable<T>>,
    magnitude: T,
}

impl<T: RealField> SourceTerm<T> {
    pub fn new(test_field: Arc<Variable<T>>, magnitude: T) -> Result<Self, AssemblyError> {
        if test_field.components() != 1 {
            return Err(AssemblyError::configuration(
                "source term is defined for scalar fields only",
            ));
        }
        let unknown_field = test_field
            .dual()
            .cloned()
            .ok_or_else(|| {
                AssemblyError::configuration(
                    "source term requires a test field with a dual (primary) variable",
                )
            })?;
        Ok(Self {
            test_field,
            unknown_field,
            magnitude,
        })
    }
}

impl<T: RealField> WeakFormTerm<T> for SourceTerm<T> {
    fn name(&self) -> &str {
        "source"
    }

    fn test_field(&self) -> &Arc<Variable<T>> {
        &self.test_field
    }

    fn unknown_field(&self) -> &Arc<Variable<T>> {
        &self.unknown_field
    }

    fn required_shape(&self, context: &CellContext<T>) -> Result<(usize, usize), AssemblyError> {
        Ok((
            field_dimension(context, &self.test_field)?,
            field_dimension(context, &self.unknown_field)?,
        ))
    }

    fn evaluate_tangent(
        &self,
        context: &CellContext<T>,
        _point: &IntegrationPoint<T>,
        _step: &TimeStep<T>,
    ) -> Result<DMatrix<T>, AssemblyError> {
        let (rows, cols) = self.required_shape(context)?;
        Ok(DMatrix::zeros(rows, cols))
    }

    fn evaluate_residual(
        &self,
        context: &CellContext<T>,
        point: &IntegrationPoint<T>,
        _step: &TimeStep<T>,
    ) -> Result<DVector<T>, AssemblyError> {
        let kind = context.kind();
        let count = self.test_field.interpolation().node_count(kind)?;
        let mut basis = vec![T::zero(); count];
        self.test_field
            .interpolation()
            .populate_basis(&mut basis, kind, point.coords())?;
        Ok(DVector::from_iterator(
            count,
            basis.into_iter().map(|phi| self.magnitude.clone() * phi),
        ))
    }
}
