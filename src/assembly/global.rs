//! Scatter-add targets and global assembly drivers.
use crate::assembly::local::WeakFormTerm;
use crate::element::{DofNumbering, MpElement};
use crate::mesh::Domain;
use crate::time::TimeStep;
use log::debug;
use nalgebra::{DMatrix, DVector, RealField};
use nalgebra_sparse::CooMatrix;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::cell::RefCell;
use std::sync::Arc;
use thread_local::ThreadLocal;

/// A matrix-shaped assembly target supporting scatter-add by index pair.
///
/// The contract is accumulation: `target[rows[i]][cols[j]] += values[i][j]`,
/// never overwrite, so that contributions from elements sharing dofs sum up.
pub trait ScatterAdd<T: RealField> {
    /// # Panics
    ///
    /// Panics if the index slices do not match the shape of `values` or
    /// reference positions outside the target.
    fn scatter_add(&mut self, rows: &[usize], cols: &[usize], values: &DMatrix<T>);
}

impl<T: RealField> ScatterAdd<T> for DMatrix<T> {
    fn scatter_add(&mut self, rows: &[usize], cols: &[usize], values: &DMatrix<T>) {
        assert_eq!(values.nrows(), rows.len(), "scatter-add row index count mismatch");
        assert_eq!(values.ncols(), cols.len(), "scatter-add column index count mismatch");
        for (i, &row) in rows.iter().enumerate() {
            for (j, &col) in cols.iter().enumerate() {
                self[(row, col)] += values[(i, j)].clone();
            }
        }
    }
}

impl<T: RealField> ScatterAdd<T> for CooMatrix<T> {
    fn scatter_add(&mut self, rows: &[usize], cols: &[usize], values: &DMatrix<T>) {
        assert_eq!(values.nrows(), rows.len(), "scatter-add row index count mismatch");
        assert_eq!(values.ncols(), cols.len(), "scatter-add column index count mismatch");
        for (i, &row) in rows.iter().enumerate() {
            for (j, &col) in cols.iter().enumerate() {
                self.push(row, col, values[(i, j)].clone());
            }
        }
    }
}

/// A vector-shaped assembly target supporting scatter-add by index.
pub trait ScatterAddVector<T: RealField> {
    /// # Panics
    ///
    /// Panics if `rows` does not match the length of `values` or references
    /// positions outside the target.
    fn scatter_add_vector(&mut self, rows: &[usize], values: &DVector<T>);
}

impl<T: RealField> ScatterAddVector<T> for DVector<T> {
    fn scatter_add_vector(&mut self, rows: &[usize], values: &DVector<T>) {
        assert_eq!(values.len(), rows.len(), "scatter-add index count mismatch");
        for (i, &row) in rows.iter().enumerate() {
            self[row] += values[i].clone();
        }
    }
}

/// Sequential driver: integrates every term over every element and scatter-adds
/// the contributions into one target using global equation numbers.
pub struct SystemAssembler<'a, T: RealField> {
    domain: &'a Domain<T>,
    elements: &'a [MpElement<T>],
    terms: Vec<Arc<dyn WeakFormTerm<T>>>,
}

impl<'a, T: RealField> SystemAssembler<'a, T> {
    pub fn new(domain: &'a Domain<T>, elements: &'a [MpElement<T>]) -> Self {
        Self {
            domain,
            elements,
            terms: Vec::new(),
        }
    }

    pub fn add_term(&mut self, term: Arc<dyn WeakFormTerm<T>>) {
        self.terms.push(term);
    }

    pub fn terms(&self) -> &[Arc<dyn WeakFormTerm<T>>] {
        &self.terms
    }

    /// Assembles the tangent contributions of all terms and elements.
    pub fn assemble_tangent_into(
        &self,
        target: &mut impl ScatterAdd<T>,
        step: &TimeStep<T>,
    ) -> eyre::Result<()> {
        debug!(
            "Assembling tangent: {} elements, {} terms",
            self.elements.len(),
            self.terms.len()
        );
        let mut local = DMatrix::zeros(0, 0);
        for element in self.elements {
            for term in &self.terms {
                element.integrate_tangent_into(self.domain, &**term, step, &mut local)?;
                element.assemble_tangent(self.domain, target, &local, &**term, DofNumbering::Global)?;
            }
        }
        Ok(())
    }

    /// Assembles the residual contributions of all terms and elements.
    pub fn assemble_residual_into(
        &self,
        target: &mut impl ScatterAddVector<T>,
        step: &TimeStep<T>,
    ) -> eyre::Result<()> {
        debug!(
            "Assembling residual: {} elements, {} terms",
            self.elements.len(),
            self.terms.len()
        );
        let mut local = DVector::zeros(0);
        for element in self.elements {
            for term in &self.terms {
                element.integrate_residual_into(self.domain, &**term, step, &mut local)?;
                element.assemble_residual(self.domain, target, &local, &**term, DofNumbering::Global)?;
            }
        }
        Ok(())
    }
}

/// Parallel driver using a partition-then-merge scheme.
///
/// Each rayon worker folds its elements' contributions into a private
/// [`CooMatrix`] accumulator; a final reduction concatenates the partial
/// accumulators. Since COO admits duplicate entries, the assembled value at any
/// position is the exact sum of all contributions to it, independent of the
/// partitioning. Integration reads only immutable domain state, so elements can
/// be processed concurrently; all dof creation must have happened in the
/// single-threaded initialization phase.
pub struct ParSystemAssembler<'a, T>
where
    T: RealField,
{
    domain: &'a Domain<T>,
    elements: &'a [MpElement<T>],
    terms: Vec<Arc<dyn WeakFormTerm<T>>>,
    num_equations: usize,
    // Per-thread scratch buffers for local contributions
    matrix_workspace: ThreadLocal<RefCell<DMatrix<T>>>,
    vector_workspace: ThreadLocal<RefCell<DVector<T>>>,
}

impl<'a, T> ParSystemAssembler<'a, T>
where
    T: RealField + Send + Sync,
{
    /// `num_equations` is the equation count returned by
    /// [`Domain::number_equations`] and fixes the dimension of the assembled
    /// system.
    pub fn new(domain: &'a Domain<T>, elements: &'a [MpElement<T>], num_equations: usize) -> Self {
        Self {
            domain,
            elements,
            terms: Vec::new(),
            num_equations,
            matrix_workspace: ThreadLocal::new(),
            vector_workspace: ThreadLocal::new(),
        }
    }

    pub fn add_term(&mut self, term: Arc<dyn WeakFormTerm<T>>) {
        self.terms.push(term);
    }

    /// Assembles the global tangent as a COO accumulator with (possibly
    /// duplicate) triplets; converting to CSR sums duplicates.
    pub fn assemble_tangent(&self, step: &TimeStep<T>) -> eyre::Result<CooMatrix<T>> {
        let n = self.num_equations;
        debug!(
            "Parallel tangent assembly: {} elements, {} terms, {} equations",
            self.elements.len(),
            self.terms.len(),
            n
        );
        self.elements
            .par_iter()
            .try_fold(
                || CooMatrix::new(n, n),
                |mut accumulator, element| {
                    let workspace = self
                        .matrix_workspace
                        .get_or(|| RefCell::new(DMatrix::zeros(0, 0)));
                    let mut local = workspace.borrow_mut();
                    for term in &self.terms {
                        element.integrate_tangent_into(self.domain, &**term, step, &mut local)?;
                        element.assemble_tangent(
                            self.domain,
                            &mut accumulator,
                            &local,
                            &**term,
                            DofNumbering::Global,
                        )?;
                    }
                    Ok(accumulator)
                },
            )
            .try_reduce(|| CooMatrix::new(n, n), |a, b| Ok(merge_coo(a, b)))
    }

    /// Assembles the global residual by summing per-worker partial vectors.
    pub fn assemble_residual(&self, step: &TimeStep<T>) -> eyre::Result<DVector<T>> {
        let n = self.num_equations;
        self.elements
            .par_iter()
            .try_fold(
                || DVector::zeros(n),
                |mut accumulator: DVector<T>, element| {
                    let workspace = self
                        .vector_workspace
                        .get_or(|| RefCell::new(DVector::zeros(0)));
                    let mut local = workspace.borrow_mut();
                    for term in &self.terms {
                        element.integrate_residual_into(self.domain, &**term, step, &mut local)?;
                        element.assemble_residual(
                            self.domain,
                            &mut accumulator,
                            &local,
                            &**term,
                            DofNumbering::Global,
                        )?;
                    }
                    Ok(accumulator)
                },
            )
            .try_reduce(|| DVector::zeros(n), |a, b| Ok(a + b))
    }
}

fn merge_coo<T: RealField>(mut a: CooMatrix<T>, b: CooMatrix<T>) -> CooMatrix<T> {
    for (i, j, v) in b.triplet_iter() {
        a.push(i, j, v.clone());
    }
    a
}
