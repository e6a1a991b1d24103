use mpfem::dof::DofId;
use mpfem::error::AssemblyError;
use mpfem::interpolation::NodalInterpolation;
use mpfem::variable::{Quantity, ValueCategory, Variable};
use std::sync::Arc;

fn temperature() -> Variable<f64> {
    Variable::new(
        Arc::new(NodalInterpolation),
        Quantity::Temperature,
        ValueCategory::Scalar,
        1,
    )
    .unwrap()
}

#[test]
fn dof_ids_before_assignment_is_a_configuration_error() {
    let variable = temperature();
    assert!(matches!(
        variable.dof_ids(),
        Err(AssemblyError::Configuration { .. })
    ));
}

#[test]
fn dof_id_assignment_must_match_component_count() {
    let variable = temperature();
    let result = variable.assign_dof_ids(vec![DofId::Temperature, DofId::Pressure]);
    assert!(matches!(result, Err(AssemblyError::Configuration { .. })));
}

#[test]
fn dof_id_assignment_rejects_duplicates() {
    let displacement = Variable::<f64>::new(
        Arc::new(NodalInterpolation),
        Quantity::Displacement,
        ValueCategory::Vector,
        2,
    )
    .unwrap();
    let result = displacement.assign_dof_ids(vec![DofId::DisplacementX, DofId::DisplacementX]);
    assert!(matches!(result, Err(AssemblyError::Configuration { .. })));
}

#[test]
fn dof_id_assignment_is_idempotent_but_rejects_conflicts() {
    let variable = temperature();
    variable.assign_dof_ids(vec![DofId::Temperature]).unwrap();
    // Same sequence again is fine
    variable.assign_dof_ids(vec![DofId::Temperature]).unwrap();
    // A different sequence is not
    let result = variable.assign_dof_ids(vec![DofId::Pressure]);
    assert!(matches!(result, Err(AssemblyError::Configuration { .. })));
    assert_eq!(variable.dof_ids().unwrap(), &[DofId::Temperature]);
}

#[test]
fn scalar_variable_must_have_one_component() {
    let result = Variable::<f64>::new(
        Arc::new(NodalInterpolation),
        Quantity::Temperature,
        ValueCategory::Scalar,
        3,
    );
    assert!(matches!(result, Err(AssemblyError::Configuration { .. })));
}

#[test]
fn dual_field_references_its_primary() {
    let primary = Arc::new(temperature());
    let test_field = Variable::dual_of(&primary, Arc::new(NodalInterpolation)).unwrap();
    assert!(test_field.is_test_field());
    assert!(Arc::ptr_eq(test_field.dual().unwrap(), &primary));
    assert_eq!(test_field.quantity(), primary.quantity());
    assert_eq!(test_field.components(), primary.components());
    assert!(!primary.is_test_field());
}
