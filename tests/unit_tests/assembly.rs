use super::helpers::{dual_field, line_domain, scalar_field, step, ConstantTerm};
use matrixcompare::assert_matrix_eq;
use mpfem::assembly::global::{ParSystemAssembler, ScatterAdd, SystemAssembler};
use mpfem::assembly::local::WeakFormTerm;
use mpfem::assembly::terms::DiffusionTerm;
use mpfem::dof::DofId;
use mpfem::element::{DofNumbering, MpElement};
use mpfem::error::AssemblyError;
use mpfem::mesh::Domain;
use mpfem::quadrature::GaussLineRule;
use mpfem::variable::Quantity;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use proptest::prelude::*;
use std::sync::Arc;

fn line_elements(domain: &Domain<f64>) -> Vec<MpElement<f64>> {
    (0..domain.cells().len())
        .map(|i| MpElement::new(i, Box::new(GaussLineRule::new(2).unwrap())))
        .collect()
}

#[test]
fn dense_scatter_add_accumulates_at_index_pairs() {
    let mut target = DMatrix::zeros(4, 4);
    let values = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    target.scatter_add(&[0, 2], &[1, 3], &values);
    target.scatter_add(&[0, 2], &[1, 3], &values);

    let mut expected = DMatrix::zeros(4, 4);
    expected[(0, 1)] = 2.0;
    expected[(0, 3)] = 4.0;
    expected[(2, 1)] = 6.0;
    expected[(2, 3)] = 8.0;
    assert_matrix_eq!(target, expected);
}

#[test]
fn coo_scatter_add_sums_duplicates_on_conversion() {
    let mut target = CooMatrix::new(3, 3);
    let values = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    // Both blocks hit position (1, 1)
    target.scatter_add(&[0, 1], &[0, 1], &values);
    target.scatter_add(&[1, 2], &[1, 2], &values);

    let csr = CsrMatrix::from(&target);
    let expected = DMatrix::from_row_slice(
        3,
        3,
        &[
            1.0, 2.0, 0.0, //
            3.0, 5.0, 2.0, //
            0.0, 3.0, 4.0,
        ],
    );
    assert_matrix_eq!(csr, expected);
}

#[test]
fn sequential_assembly_sums_shared_dof_contributions() {
    let mut domain = line_domain(&[0.0, 1.0, 2.0]);
    let temperature = scalar_field(Quantity::Temperature, DofId::Temperature);
    let test_temperature = dual_field(&temperature);

    let mut elements = line_elements(&domain);
    for element in &mut elements {
        element.attach_variable(Arc::clone(&temperature));
        element.initialize(&mut domain).unwrap();
    }
    let n = domain.number_equations();
    assert_eq!(n, 3);

    let term: Arc<dyn WeakFormTerm<f64>> = Arc::new(
        DiffusionTerm::new(Arc::clone(&test_temperature), Arc::clone(&temperature), 1.0).unwrap(),
    );
    let mut assembler = SystemAssembler::new(&domain, &elements);
    assembler.add_term(Arc::clone(&term));

    let mut tangent = DMatrix::zeros(n, n);
    assembler.assemble_tangent_into(&mut tangent, &step()).unwrap();

    // The middle node is shared, so its diagonal entry is the sum of both cells
    let expected = DMatrix::from_row_slice(
        3,
        3,
        &[
            1.0, -1.0, 0.0, //
            -1.0, 2.0, -1.0, //
            0.0, -1.0, 1.0,
        ],
    );
    assert_matrix_eq!(tangent, expected, comp = abs, tol = 1e-13);

    drop(assembler);
    for (node, value) in [(0, 2.0), (1, 3.0), (2, 5.0)] {
        domain
            .node_mut(node)
            .dof_mut(DofId::Temperature)
            .unwrap()
            .set_value(value);
    }
    let mut assembler = SystemAssembler::new(&domain, &elements);
    assembler.add_term(term);
    let mut residual = DVector::zeros(n);
    assembler
        .assemble_residual_into(&mut residual, &step())
        .unwrap();
    let expected = &expected * DVector::from_column_slice(&[2.0, 3.0, 5.0]);
    assert_matrix_eq!(residual, expected, comp = abs, tol = 1e-13);
}

#[test]
fn parallel_assembly_matches_sequential() {
    let mut domain = line_domain(&[0.0, 0.5, 1.25, 2.0, 3.5]);
    let temperature = scalar_field(Quantity::Temperature, DofId::Temperature);
    let test_temperature = dual_field(&temperature);

    let mut elements = line_elements(&domain);
    for element in &mut elements {
        element.attach_variable(Arc::clone(&temperature));
        element.initialize(&mut domain).unwrap();
    }
    let n = domain.number_equations();
    for (node, value) in [(0, 1.0), (1, -2.0), (2, 0.5), (3, 3.0), (4, -1.0)] {
        domain
            .node_mut(node)
            .dof_mut(DofId::Temperature)
            .unwrap()
            .set_value(value);
    }

    let term: Arc<DiffusionTerm<f64>> = Arc::new(
        DiffusionTerm::new(Arc::clone(&test_temperature), Arc::clone(&temperature), 2.5).unwrap(),
    );

    let mut sequential = SystemAssembler::new(&domain, &elements);
    sequential.add_term(term.clone());
    let mut dense = DMatrix::zeros(n, n);
    sequential.assemble_tangent_into(&mut dense, &step()).unwrap();
    let mut residual = DVector::zeros(n);
    sequential
        .assemble_residual_into(&mut residual, &step())
        .unwrap();

    let mut parallel = ParSystemAssembler::new(&domain, &elements, n);
    parallel.add_term(term);
    let coo = parallel.assemble_tangent(&step()).unwrap();
    let par_residual = parallel.assemble_residual(&step()).unwrap();

    // Duplicate triplets sum on CSR conversion, so the partitioning of elements
    // across workers cannot change the assembled values
    let csr = CsrMatrix::from(&coo);
    assert_matrix_eq!(csr, dense, comp = abs, tol = 1e-12);
    assert_matrix_eq!(par_residual, residual, comp = abs, tol = 1e-12);
}

#[test]
fn transposed_assembly_scatters_into_the_adjoint_block() {
    let mut domain = line_domain(&[0.0, 2.0]);
    let temperature = scalar_field(Quantity::Temperature, DofId::Temperature);
    let test_temperature = dual_field(&temperature);
    let pressure = scalar_field(Quantity::Pressure, DofId::Pressure);

    let mut element = MpElement::new(0, Box::new(GaussLineRule::new(2).unwrap()));
    element.attach_variable(Arc::clone(&temperature));
    element.attach_variable(Arc::clone(&pressure));
    element.initialize(&mut domain).unwrap();
    let n = domain.number_equations();
    assert_eq!(n, 4);

    // Couples the temperature test field against the pressure unknown
    let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    let term = ConstantTerm {
        test_field: test_temperature,
        unknown_field: Arc::clone(&pressure),
        matrix: matrix.clone(),
        vector: DVector::zeros(2),
    };

    let local = element.integrate_tangent(&domain, &term, &step()).unwrap();
    let mut target = DMatrix::zeros(n, n);
    element
        .assemble_tangent(&domain, &mut target, &local, &term, DofNumbering::Global)
        .unwrap();
    element
        .assemble_tangent_transposed(&domain, &mut target, &local, &term, DofNumbering::Global)
        .unwrap();

    // Temperature rows are equations {0, 2}, pressure rows equations {1, 3};
    // the forward block lands at (T, P) and its transpose at (P, T)
    let block = matrix * 2.0;
    let mut expected = DMatrix::zeros(n, n);
    expected.scatter_add(&[0, 2], &[1, 3], &block);
    expected.scatter_add(&[1, 3], &[0, 2], &block.transpose());
    assert_matrix_eq!(target, expected, comp = abs, tol = 1e-13);
}

#[test]
fn assembly_over_a_missing_field_is_fatal() {
    let mut domain = line_domain(&[0.0, 1.0]);
    let temperature = scalar_field(Quantity::Temperature, DofId::Temperature);
    // The pressure field is never attached to the element, so its dofs and
    // equation numbers do not exist
    let pressure = scalar_field(Quantity::Pressure, DofId::Pressure);

    let mut elements = line_elements(&domain);
    elements[0].attach_variable(Arc::clone(&temperature));
    elements[0].initialize(&mut domain).unwrap();
    let n = domain.number_equations();

    let mut assembler = SystemAssembler::new(&domain, &elements);
    assembler.add_term(Arc::new(ConstantTerm {
        test_field: Arc::clone(&pressure),
        unknown_field: pressure,
        matrix: DMatrix::identity(2, 2),
        vector: DVector::zeros(2),
    }));

    let mut target = DMatrix::zeros(n, n);
    let error = assembler
        .assemble_tangent_into(&mut target, &step())
        .unwrap_err();
    assert!(matches!(
        error.downcast_ref::<AssemblyError>(),
        Some(AssemblyError::MissingDof { .. })
    ));
}

fn fixture_with_terms(
    matrices: &[DMatrix<f64>],
) -> (DMatrix<f64>, Vec<Arc<ConstantTerm>>, Vec<MpElement<f64>>, Domain<f64>) {
    let mut domain = line_domain(&[0.0, 2.0]);
    let temperature = scalar_field(Quantity::Temperature, DofId::Temperature);
    let test_temperature = dual_field(&temperature);
    let mut elements = line_elements(&domain);
    elements[0].attach_variable(Arc::clone(&temperature));
    elements[0].initialize(&mut domain).unwrap();
    let n = domain.number_equations();
    let terms = matrices
        .iter()
        .map(|matrix| {
            Arc::new(ConstantTerm {
                test_field: Arc::clone(&test_temperature),
                unknown_field: Arc::clone(&temperature),
                matrix: matrix.clone(),
                vector: DVector::zeros(2),
            })
        })
        .collect();
    (DMatrix::zeros(n, n), terms, elements, domain)
}

proptest! {
    #[test]
    fn assembly_is_additive_and_order_independent(
        a in proptest::collection::vec(-100.0f64..100.0, 4),
        b in proptest::collection::vec(-100.0f64..100.0, 4),
    ) {
        let matrix_a = DMatrix::from_row_slice(2, 2, &a);
        let matrix_b = DMatrix::from_row_slice(2, 2, &b);
        let (zero, terms, elements, domain) =
            fixture_with_terms(&[matrix_a, matrix_b]);
        let [term_a, term_b] = <[_; 2]>::try_from(terms).unwrap();

        // Both terms in one pass
        let mut joint = SystemAssembler::new(&domain, &elements);
        joint.add_term(term_a.clone());
        joint.add_term(term_b.clone());
        let mut combined = zero.clone();
        joint.assemble_tangent_into(&mut combined, &step()).unwrap();

        // Reversed order
        let mut reversed = SystemAssembler::new(&domain, &elements);
        reversed.add_term(term_b.clone());
        reversed.add_term(term_a.clone());
        let mut swapped = zero.clone();
        reversed.assemble_tangent_into(&mut swapped, &step()).unwrap();

        // Two separate passes into the same accumulating target
        let mut split = zero.clone();
        let mut only_a = SystemAssembler::new(&domain, &elements);
        only_a.add_term(term_a);
        only_a.assemble_tangent_into(&mut split, &step()).unwrap();
        let mut only_b = SystemAssembler::new(&domain, &elements);
        only_b.add_term(term_b);
        only_b.assemble_tangent_into(&mut split, &step()).unwrap();

        assert_matrix_eq!(combined, swapped, comp = abs, tol = 1e-9);
        assert_matrix_eq!(combined, split, comp = abs, tol = 1e-9);
    }
}
