//! Interpolation schemes: the collaborator that ties a field to nodes and
//! shape functions on a cell.
use crate::error::AssemblyError;
use crate::mesh::{Cell, CellKind};
use nalgebra::{convert, DMatrix, RealField};
use std::fmt;

/// Evaluates the canonical nodal basis of the given cell kind at the reference
/// point `xi`, writing one value per node into `values`.
///
/// # Panics
///
/// Panics if `values` or `xi` do not match the node count and reference
/// dimension of the kind.
pub fn populate_reference_basis<T: RealField>(kind: CellKind, values: &mut [T], xi: &[T]) {
    assert_eq!(values.len(), kind.num_nodes());
    assert_eq!(xi.len(), kind.reference_dim());
    let half: T = convert(0.5);
    let quarter: T = convert(0.25);
    match kind {
        CellKind::Line2 => {
            let x = xi[0].clone();
            values[0] = half.clone() * (T::one() - x.clone());
            values[1] = half * (T::one() + x);
        }
        CellKind::Tri3 => {
            let (x, y) = (xi[0].clone(), xi[1].clone());
            values[0] = T::one() - x.clone() - y.clone();
            values[1] = x;
            values[2] = y;
        }
        CellKind::Quad4 => {
            let (x, y) = (xi[0].clone(), xi[1].clone());
            values[0] = quarter.clone() * (T::one() - x.clone()) * (T::one() - y.clone());
            values[1] = quarter.clone() * (T::one() + x.clone()) * (T::one() - y.clone());
            values[2] = quarter.clone() * (T::one() + x.clone()) * (T::one() + y.clone());
            values[3] = quarter * (T::one() - x) * (T::one() + y);
        }
    }
}

/// Evaluates the reference gradients of the canonical nodal basis.
///
/// `gradients` is resized to `reference_dim` rows by `num_nodes` columns; column
/// `i` holds the gradient of basis function `i` with respect to the reference
/// coordinates.
pub fn populate_reference_gradients<T: RealField>(kind: CellKind, gradients: &mut DMatrix<T>, xi: &[T]) {
    assert_eq!(xi.len(), kind.reference_dim());
    gradients.resize_mut(kind.reference_dim(), kind.num_nodes(), T::zero());
    let half: T = convert(0.5);
    let quarter: T = convert(0.25);
    match kind {
        CellKind::Line2 => {
            gradients[(0, 0)] = -half.clone();
            gradients[(0, 1)] = half;
        }
        CellKind::Tri3 => {
            gradients[(0, 0)] = -T::one();
            gradients[(1, 0)] = -T::one();
            gradients[(0, 1)] = T::one();
            gradients[(1, 1)] = T::zero();
            gradients[(0, 2)] = T::zero();
            gradients[(1, 2)] = T::one();
        }
        CellKind::Quad4 => {
            let (x, y) = (xi[0].clone(), xi[1].clone());
            let signs = [
                (-T::one(), -T::one()),
                (T::one(), -T::one()),
                (T::one(), T::one()),
                (-T::one(), T::one()),
            ];
            for (i, (sx, sy)) in signs.into_iter().enumerate() {
                gradients[(0, i)] =
                    quarter.clone() * sx.clone() * (T::one() + sy.clone() * y.clone());
                gradients[(1, i)] = quarter.clone() * sy * (T::one() + sx * x.clone());
            }
        }
    }
}

/// An interpolation scheme over geometric cells.
///
/// Given a cell, the interpolation identifies the nodes that carry dofs for a
/// field using this scheme, and evaluates shape-function values and reference
/// gradients at integration points. Implementations must be stateless with
/// respect to evaluation, so a single instance is safely shared across
/// elements and threads.
pub trait Interpolation<T: RealField>: fmt::Debug + Send + Sync {
    /// The nodes of `cell` that carry dofs for a field using this interpolation,
    /// in a fixed, interpolation-defined order.
    fn required_nodes(&self, cell: &Cell) -> Result<Vec<usize>, AssemblyError>;

    /// Number of basis functions on a cell of the given kind.
    fn node_count(&self, kind: CellKind) -> Result<usize, AssemblyError>;

    /// Writes the basis function values at `xi` into `values` (one per node).
    fn populate_basis(&self, values: &mut [T], kind: CellKind, xi: &[T]) -> Result<(), AssemblyError>;

    /// Writes the reference gradients at `xi` into `gradients`
    /// (`reference_dim` rows, one column per node).
    fn populate_basis_gradients(
        &self,
        gradients: &mut DMatrix<T>,
        kind: CellKind,
        xi: &[T],
    ) -> Result<(), AssemblyError>;
}

/// The cell's own canonical nodal (isoparametric) basis: every geometric node
/// carries dofs, shape functions are the linear/bilinear functions of the kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodalInterpolation;

impl<T: RealField> Interpolation<T> for NodalInterpolation {
    fn required_nodes(&self, cell: &Cell) -> Result<Vec<usize>, AssemblyError> {
        Ok(cell.connectivity().to_vec())
    }

    fn node_count(&self, kind: CellKind) -> Result<usize, AssemblyError> {
        Ok(kind.num_nodes())
    }

    fn populate_basis(&self, values: &mut [T], kind: CellKind, xi: &[T]) -> Result<(), AssemblyError> {
        populate_reference_basis(kind, values, xi);
        Ok(())
    }

    fn populate_basis_gradients(
        &self,
        gradients: &mut DMatrix<T>,
        kind: CellKind,
        xi: &[T],
    ) -> Result<(), AssemblyError> {
        populate_reference_gradients(kind, gradients, xi);
        Ok(())
    }
}
