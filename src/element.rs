//! The multiphysics element: integration of weak-form terms and assembly of
//! their contributions.
use crate::assembly::global::{ScatterAdd, ScatterAddVector};
use crate::assembly::local::WeakFormTerm;
use crate::dof::{DofId, ValueMode};
use crate::error::AssemblyError;
use crate::interpolation::populate_reference_gradients;
use crate::mesh::{Cell, CellKind, Domain};
use crate::quadrature::{IntegrationPoint, IntegrationRule};
use crate::time::TimeStep;
use crate::variable::Variable;
use log::{debug, trace};
use nalgebra::{DMatrix, DVector, RealField};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Read-only view of one cell and the domain it lives in.
///
/// This is what terms receive at every integration point: enough geometry to
/// evaluate Jacobians and measures, and access to nodal unknowns, without
/// knowing the concrete element type.
pub struct CellContext<'a, T: RealField> {
    domain: &'a Domain<T>,
    cell_index: usize,
}

impl<'a, T: RealField> CellContext<'a, T> {
    pub fn new(domain: &'a Domain<T>, cell_index: usize) -> Self {
        Self { domain, cell_index }
    }

    pub fn domain(&self) -> &'a Domain<T> {
        self.domain
    }

    pub fn cell_index(&self) -> usize {
        self.cell_index
    }

    pub fn cell(&self) -> &'a Cell {
        self.domain.cell(self.cell_index)
    }

    pub fn kind(&self) -> CellKind {
        self.cell().kind()
    }

    /// The Jacobian of the geometry mapping at reference point `xi`:
    /// `dim` rows by `reference_dim` columns.
    pub fn jacobian(&self, xi: &[T]) -> DMatrix<T> {
        let cell = self.cell();
        let kind = cell.kind();
        let mut gradients = DMatrix::zeros(0, 0);
        populate_reference_gradients(kind, &mut gradients, xi);
        let dim = self.domain.dim();
        let ref_dim = kind.reference_dim();
        let mut jacobian = DMatrix::zeros(dim, ref_dim);
        for (a, &node_index) in cell.connectivity().iter().enumerate() {
            let position = self.domain.node(node_index).position();
            for d in 0..dim {
                for r in 0..ref_dim {
                    jacobian[(d, r)] += position[d].clone() * gradients[(r, a)].clone();
                }
            }
        }
        jacobian
    }

    /// The length/area/volume differential of the geometry at `xi`, computed as
    /// the Gram determinant of the Jacobian. Also valid for cells embedded in a
    /// higher-dimensional domain (e.g. a segment in 2D).
    pub fn measure(&self, xi: &[T]) -> T {
        let jacobian = self.jacobian(xi);
        let gram = jacobian.transpose() * &jacobian;
        gram.determinant().abs().sqrt()
    }

    /// The integration measure associated with one point of a rule:
    /// quadrature weight times the geometric measure at the point.
    pub fn volume_around(&self, point: &IntegrationPoint<T>) -> T {
        point.weight() * self.measure(point.coords())
    }

    /// Gathers the nodal unknowns of `variable` on this cell into a dense
    /// vector: interpolation node order, the variable's dof identities in order
    /// within each node.
    pub fn field_unknown_vector(
        &self,
        variable: &Variable<T>,
        mode: ValueMode,
    ) -> Result<DVector<T>, AssemblyError> {
        let nodes = variable.interpolation().required_nodes(self.cell())?;
        let ids = variable.dof_ids()?;
        let mut values = DVector::zeros(nodes.len() * ids.len());
        for (i, &node_index) in nodes.iter().enumerate() {
            let node = self.domain.node(node_index);
            for (k, &id) in ids.iter().enumerate() {
                let dof = node.dof(id).ok_or(AssemblyError::MissingDof {
                    node: node_index,
                    dof: id,
                })?;
                values[i * ids.len() + k] = dof.value(mode);
            }
        }
        Ok(values)
    }
}

/// Selects the index space code numbers are resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DofNumbering {
    /// Positions within the element's own dof block, frozen at initialization.
    ElementLocal,
    /// Global equation numbers assigned by [`Domain::number_equations`].
    Global,
}

#[derive(Debug, Clone, Default)]
struct LocalDofLayout {
    positions: FxHashMap<(usize, DofId), usize>,
}

/// An element integrating weak-form terms over one cell.
///
/// The element owns its integration rule and the set of variables attached to
/// it, drives the integration loop, resolves local-to-global numbering per
/// field and scatter-adds local contributions into an assembly target.
///
/// Lifecycle: `Uninitialized -> Initialized -> Integrated/Assembled`, where
/// integration and assembly are repeatable per solver iteration but
/// [`initialize`](Self::initialize) must have completed (for *all* elements,
/// single-threaded) before any concurrent numeric phase starts.
pub struct MpElement<T: RealField> {
    cell_index: usize,
    integration_rule: Box<dyn IntegrationRule<T>>,
    variables: Vec<Arc<Variable<T>>>,
    layout: Option<LocalDofLayout>,
}

impl<T: RealField> MpElement<T> {
    pub fn new(cell_index: usize, integration_rule: Box<dyn IntegrationRule<T>>) -> Self {
        Self {
            cell_index,
            integration_rule,
            variables: Vec::new(),
            layout: None,
        }
    }

    pub fn cell_index(&self) -> usize {
        self.cell_index
    }

    pub fn integration_rule(&self) -> &dyn IntegrationRule<T> {
        &*self.integration_rule
    }

    pub fn variables(&self) -> &[Arc<Variable<T>>] {
        &self.variables
    }

    /// Attaches a variable whose dofs this element must provide.
    /// Attaching the same variable twice is a no-op.
    pub fn attach_variable(&mut self, variable: Arc<Variable<T>>) {
        if !self.variables.iter().any(|v| Arc::ptr_eq(v, &variable)) {
            self.variables.push(variable);
        }
    }

    /// Resolves the nodes required by every attached variable and ensures each
    /// of them carries dofs with the variable's identities, creating missing
    /// dofs. Freezes the element-local dof layout. Idempotent.
    pub fn initialize(&mut self, domain: &mut Domain<T>) -> Result<(), AssemblyError> {
        let cell_kind = domain.cell(self.cell_index).kind();
        if self.integration_rule.cell_kind() != cell_kind {
            return Err(AssemblyError::unsupported(format!(
                "integration rule for {:?} attached to element on a {:?} cell",
                self.integration_rule.cell_kind(),
                cell_kind
            )));
        }

        let mut layout = LocalDofLayout::default();
        let mut next_position = 0;
        for variable in &self.variables {
            let ids = variable.dof_ids()?;
            let nodes = variable
                .interpolation()
                .required_nodes(domain.cell(self.cell_index))?;
            for node_index in nodes {
                for &id in ids {
                    domain.node_mut(node_index).ensure_dof(id);
                    layout.positions.entry((node_index, id)).or_insert_with(|| {
                        let position = next_position;
                        next_position += 1;
                        position
                    });
                }
            }
        }
        debug!(
            "Initialized element on cell {}: {} local dofs across {} variables",
            self.cell_index,
            next_position,
            self.variables.len()
        );
        self.layout = Some(layout);
        Ok(())
    }

    /// Resolves code numbers for `variable` on this element: interpolation node
    /// order concatenated with the variable's per-node dof-identity order.
    ///
    /// Fails with [`AssemblyError::MissingDof`] if a required node lacks a dof
    /// of a requested identity. A truncated or padded result is never returned,
    /// since it would silently corrupt the assembled system's shape.
    pub fn local_code_numbers(
        &self,
        domain: &Domain<T>,
        variable: &Variable<T>,
        numbering: DofNumbering,
    ) -> Result<Vec<usize>, AssemblyError> {
        let nodes = variable
            .interpolation()
            .required_nodes(domain.cell(self.cell_index))?;
        let ids = variable.dof_ids()?;
        let mut codes = Vec::with_capacity(nodes.len() * ids.len());
        for &node_index in &nodes {
            for &id in ids {
                let code = match numbering {
                    DofNumbering::ElementLocal => {
                        let layout = self.layout.as_ref().ok_or_else(|| {
                            AssemblyError::configuration(
                                "element-local code numbers requested before initialization",
                            )
                        })?;
                        *layout
                            .positions
                            .get(&(node_index, id))
                            .ok_or(AssemblyError::MissingDof {
                                node: node_index,
                                dof: id,
                            })?
                    }
                    DofNumbering::Global => {
                        let dof = domain.node(node_index).dof(id).ok_or(
                            AssemblyError::MissingDof {
                                node: node_index,
                                dof: id,
                            },
                        )?;
                        dof.equation_number().ok_or_else(|| {
                            AssemblyError::configuration(
                                "global code numbers requested before equation numbering",
                            )
                        })?
                    }
                };
                codes.push(code);
            }
        }
        Ok(codes)
    }

    /// Integrates the tangent (bilinear) contribution of `term` over this
    /// element into `output`, which is resized to the term's required shape.
    ///
    /// Accumulation order follows the integration rule's point order and is
    /// deterministic for a given rule. Each per-point contribution is scaled by
    /// the geometric measure associated with the point before accumulation.
    pub fn integrate_tangent_into(
        &self,
        domain: &Domain<T>,
        term: &dyn WeakFormTerm<T>,
        step: &TimeStep<T>,
        output: &mut DMatrix<T>,
    ) -> Result<(), AssemblyError> {
        let context = CellContext::new(domain, self.cell_index);
        term.prepare_for_cell(&context)?;
        let (rows, cols) = term.required_shape(&context)?;
        output.resize_mut(rows, cols, T::zero());
        output.fill(T::zero());
        for point in self.integration_rule.points() {
            let contribution = term.evaluate_tangent(&context, point, step)?;
            if contribution.shape() != (rows, cols) {
                return Err(AssemblyError::DimensionMismatch {
                    term: term.name().to_string(),
                    cell: self.cell_index,
                    expected: (rows, cols),
                    actual: contribution.shape(),
                });
            }
            *output += contribution * context.volume_around(point);
        }
        trace!(
            "Integrated {}x{} tangent of '{}' on cell {}",
            rows,
            cols,
            term.name(),
            self.cell_index
        );
        Ok(())
    }

    /// Like [`integrate_tangent_into`](Self::integrate_tangent_into), returning
    /// a freshly allocated matrix.
    pub fn integrate_tangent(
        &self,
        domain: &Domain<T>,
        term: &dyn WeakFormTerm<T>,
        step: &TimeStep<T>,
    ) -> Result<DMatrix<T>, AssemblyError> {
        let mut output = DMatrix::zeros(0, 0);
        self.integrate_tangent_into(domain, term, step, &mut output)?;
        Ok(output)
    }

    /// Integrates the residual (known-value) contribution of `term` over this
    /// element into `output`, which is resized to the term's test-field size.
    pub fn integrate_residual_into(
        &self,
        domain: &Domain<T>,
        term: &dyn WeakFormTerm<T>,
        step: &TimeStep<T>,
        output: &mut DVector<T>,
    ) -> Result<(), AssemblyError> {
        let context = CellContext::new(domain, self.cell_index);
        term.prepare_for_cell(&context)?;
        let (rows, _) = term.required_shape(&context)?;
        output.resize_vertically_mut(rows, T::zero());
        output.fill(T::zero());
        for point in self.integration_rule.points() {
            let contribution = term.evaluate_residual(&context, point, step)?;
            if contribution.len() != rows {
                return Err(AssemblyError::DimensionMismatch {
                    term: term.name().to_string(),
                    cell: self.cell_index,
                    expected: (rows, 1),
                    actual: (contribution.len(), 1),
                });
            }
            *output += contribution * context.volume_around(point);
        }
        Ok(())
    }

    /// Like [`integrate_residual_into`](Self::integrate_residual_into),
    /// returning a freshly allocated vector.
    pub fn integrate_residual(
        &self,
        domain: &Domain<T>,
        term: &dyn WeakFormTerm<T>,
        step: &TimeStep<T>,
    ) -> Result<DVector<T>, AssemblyError> {
        let mut output = DVector::zeros(0);
        self.integrate_residual_into(domain, term, step, &mut output)?;
        Ok(output)
    }

    /// Scatter-adds an integrated tangent contribution into `target`:
    /// `target[test_codes[i]][unknown_codes[j]] += contribution[i][j]`.
    ///
    /// Scatter-add, never overwrite: repeated assembly from elements sharing a
    /// dof accumulates.
    pub fn assemble_tangent(
        &self,
        domain: &Domain<T>,
        target: &mut dyn ScatterAdd<T>,
        contribution: &DMatrix<T>,
        term: &dyn WeakFormTerm<T>,
        numbering: DofNumbering,
    ) -> Result<(), AssemblyError> {
        let test_codes = self.local_code_numbers(domain, term.test_field(), numbering)?;
        let unknown_codes = self.local_code_numbers(domain, term.unknown_field(), numbering)?;
        if contribution.shape() != (test_codes.len(), unknown_codes.len()) {
            return Err(AssemblyError::DimensionMismatch {
                term: term.name().to_string(),
                cell: self.cell_index,
                expected: (test_codes.len(), unknown_codes.len()),
                actual: contribution.shape(),
            });
        }
        target.scatter_add(&test_codes, &unknown_codes, contribution);
        Ok(())
    }

    /// Transposed variant of [`assemble_tangent`](Self::assemble_tangent):
    /// scatters with swapped row/column code numbers, for terms contributing to
    /// both a forward and an adjoint position of a coupled system.
    pub fn assemble_tangent_transposed(
        &self,
        domain: &Domain<T>,
        target: &mut dyn ScatterAdd<T>,
        contribution: &DMatrix<T>,
        term: &dyn WeakFormTerm<T>,
        numbering: DofNumbering,
    ) -> Result<(), AssemblyError> {
        let test_codes = self.local_code_numbers(domain, term.test_field(), numbering)?;
        let unknown_codes = self.local_code_numbers(domain, term.unknown_field(), numbering)?;
        if contribution.shape() != (test_codes.len(), unknown_codes.len()) {
            return Err(AssemblyError::DimensionMismatch {
                term: term.name().to_string(),
                cell: self.cell_index,
                expected: (test_codes.len(), unknown_codes.len()),
                actual: contribution.shape(),
            });
        }
        target.scatter_add(&unknown_codes, &test_codes, &contribution.transpose());
        Ok(())
    }

    /// Scatter-adds an integrated residual contribution into `target` at the
    /// term's test-field code numbers.
    pub fn assemble_residual(
        &self,
        domain: &Domain<T>,
        target: &mut dyn ScatterAddVector<T>,
        contribution: &DVector<T>,
        term: &dyn WeakFormTerm<T>,
        numbering: DofNumbering,
    ) -> Result<(), AssemblyError> {
        let test_codes = self.local_code_numbers(domain, term.test_field(), numbering)?;
        if contribution.len() != test_codes.len() {
            return Err(AssemblyError::DimensionMismatch {
                term: term.name().to_string(),
                cell: self.cell_index,
                expected: (test_codes.len(), 1),
                actual: (contribution.len(), 1),
            });
        }
        target.scatter_add_vector(&test_codes, contribution);
        Ok(())
    }

    /// Gathers the current (or historical) nodal unknowns of `variable` on this
    /// element: the bridge from global solution state back into the per-field
    /// dense vector a term consumes as its known-value input.
    pub fn field_unknown_vector(
        &self,
        domain: &Domain<T>,
        variable: &Variable<T>,
        mode: ValueMode,
        step: &TimeStep<T>,
    ) -> Result<DVector<T>, AssemblyError> {
        trace!(
            "Gathering {:?} unknowns on cell {} at step {}",
            variable.quantity(),
            self.cell_index,
            step.index
        );
        CellContext::new(domain, self.cell_index).field_unknown_vector(variable, mode)
    }
}
