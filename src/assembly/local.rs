//! The weak-form term abstraction.
use crate::element::CellContext;
use crate::error::AssemblyError;
use crate::time::TimeStep;
use crate::variable::Variable;
use nalgebra::{DMatrix, DVector, RealField};
use std::fmt;
use std::sync::Arc;

/// A weak-form integrand, evaluable at integration points of a cell.
///
/// A term couples a test field and an unknown field and knows nothing about the
/// concrete element integrating it; conversely the element knows nothing about
/// the physics inside the term. Implementations are constructed once per
/// physics, are stateless across integration points (all per-point state is
/// passed in) and are therefore safely shared across elements and threads.
///
/// Both evaluation methods return *unweighted per-point* contributions; the
/// integrating element scales them by the integration measure.
pub trait WeakFormTerm<T: RealField>: fmt::Debug + Send + Sync {
    /// A short identifier used in diagnostics.
    fn name(&self) -> &str;

    /// The test (dual) field of this term.
    fn test_field(&self) -> &Arc<Variable<T>>;

    /// The unknown field of this term.
    fn unknown_field(&self) -> &Arc<Variable<T>>;

    /// The dimensions of this term's contributions on the given cell, stable
    /// across all integration points of the cell. Lets the element pre-allocate
    /// and validate the accumulation shape before integration starts.
    fn required_shape(&self, context: &CellContext<T>) -> Result<(usize, usize), AssemblyError>;

    /// One-time per-cell setup hook, e.g. for validating the geometry.
    /// Must be idempotent; the default does nothing.
    fn prepare_for_cell(&self, _context: &CellContext<T>) -> Result<(), AssemblyError> {
        Ok(())
    }

    /// The bilinear (tangent) contribution between test and unknown field at
    /// one integration point, in test-component-major by unknown-component-major
    /// ordering.
    fn evaluate_tangent(
        &self,
        context: &CellContext<T>,
        point: &crate::quadrature::IntegrationPoint<T>,
        step: &TimeStep<T>,
    ) -> Result<DMatrix<T>, AssemblyError>;

    /// The known-value (residual) contribution at one integration point, in
    /// test-field component ordering.
    fn evaluate_residual(
        &self,
        context: &CellContext<T>,
        point: &crate::quadrature::IntegrationPoint<T>,
        step: &TimeStep<T>,
    ) -> Result<DVector<T>, AssemblyError>;
}

/// The number of scalar dofs `variable` contributes on the context's cell:
/// required node count times component count.
pub fn field_dimension<T: RealField>(
    context: &CellContext<T>,
    variable: &Variable<T>,
) -> Result<usize, AssemblyError> {
    let nodes = variable.interpolation().required_nodes(context.cell())?;
    Ok(nodes.len() * variable.components())
}
