use matrixcompare::assert_scalar_eq;
use mpfem::error::AssemblyError;
use mpfem::mesh::CellKind;
use mpfem::quadrature::{default_rule, GaussLineRule, GaussQuadRule, IntegrationRule, TriangleRule};

fn weight_sum(rule: &dyn IntegrationRule<f64>) -> f64 {
    rule.points().iter().map(|p| p.weight()).sum()
}

#[test]
fn gauss_line_rules_integrate_constants_exactly() {
    for n in 1..=3 {
        let rule = GaussLineRule::<f64>::new(n).unwrap();
        assert_scalar_eq!(weight_sum(&rule), 2.0, comp = abs, tol = 1e-14);
    }
}

#[test]
fn gauss_line_rules_are_exact_for_polynomials() {
    // int_{-1}^{1} x^2 dx = 2/3, exact from two points on
    for n in 2..=3 {
        let rule = GaussLineRule::<f64>::new(n).unwrap();
        let integral: f64 = rule
            .points()
            .iter()
            .map(|p| p.weight() * p.coords()[0].powi(2))
            .sum();
        assert_scalar_eq!(integral, 2.0 / 3.0, comp = abs, tol = 1e-14);
    }

    // Odd powers integrate to zero by symmetry
    let rule = GaussLineRule::<f64>::new(3).unwrap();
    let integral: f64 = rule
        .points()
        .iter()
        .map(|p| p.weight() * p.coords()[0].powi(3))
        .sum();
    assert_scalar_eq!(integral, 0.0, comp = abs, tol = 1e-14);
}

#[test]
fn quad_rule_weights_sum_to_reference_area() {
    for n in 1..=3 {
        let rule = GaussQuadRule::<f64>::new(n).unwrap();
        assert_eq!(rule.points().len(), n * n);
        assert_scalar_eq!(weight_sum(&rule), 4.0, comp = abs, tol = 1e-14);
    }
}

#[test]
fn triangle_rule_weights_sum_to_reference_area() {
    assert_scalar_eq!(
        weight_sum(&TriangleRule::<f64>::centroid()),
        0.5,
        comp = abs,
        tol = 1e-14
    );
    assert_scalar_eq!(
        weight_sum(&TriangleRule::<f64>::three_point()),
        0.5,
        comp = abs,
        tol = 1e-14
    );
}

#[test]
fn three_point_triangle_rule_is_exact_for_quadratics() {
    // int over the reference triangle of x^2 is 1/12
    let rule = TriangleRule::<f64>::three_point();
    let integral: f64 = rule
        .points()
        .iter()
        .map(|p| p.weight() * p.coords()[0].powi(2))
        .sum();
    assert_scalar_eq!(integral, 1.0 / 12.0, comp = abs, tol = 1e-14);
}

#[test]
fn unavailable_rule_is_reported_as_unsupported() {
    let result = GaussLineRule::<f64>::new(4);
    assert!(matches!(
        result,
        Err(AssemblyError::UnsupportedConfiguration { .. })
    ));
}

#[test]
fn default_rules_match_their_cell_kind() {
    for kind in [CellKind::Line2, CellKind::Tri3, CellKind::Quad4] {
        assert_eq!(default_rule::<f64>(kind).cell_kind(), kind);
    }
}
