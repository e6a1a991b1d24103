//! Integration rules for the reference cells.
//!
//! A rule owns a finite, restartable sequence of integration points. Point
//! ordering is deterministic for a given rule, so integration results are
//! exactly reproducible.
use crate::error::AssemblyError;
use crate::mesh::CellKind;
use itertools::Itertools;
use nalgebra::{convert, RealField};
use std::fmt;

/// A single integration point: local (reference) coordinates and a weight.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationPoint<T> {
    coords: Vec<T>,
    weight: T,
}

impl<T: RealField> IntegrationPoint<T> {
    pub fn new(coords: Vec<T>, weight: T) -> Self {
        Self { coords, weight }
    }

    /// Reference coordinates of the point. Length equals the reference dimension.
    pub fn coords(&self) -> &[T] {
        &self.coords
    }

    pub fn weight(&self) -> T {
        self.weight.clone()
    }
}

/// A quadrature scheme over one reference cell kind.
pub trait IntegrationRule<T>: fmt::Debug + Send + Sync {
    /// The cell kind this rule integrates over.
    fn cell_kind(&self) -> CellKind;

    /// The points of the rule, in a fixed, deterministic order.
    fn points(&self) -> &[IntegrationPoint<T>];
}

/// Gauss-Legendre rule on the reference segment $[-1, 1]$.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussLineRule<T> {
    points: Vec<IntegrationPoint<T>>,
}

impl<T: RealField> GaussLineRule<T> {
    /// Creates a rule with `n` points (1 to 3), exact for polynomials of degree
    /// $2n - 1$.
    pub fn new(n: usize) -> Result<Self, AssemblyError> {
        let points = gauss_points_1d(n)?
            .into_iter()
            .map(|(x, w)| IntegrationPoint::new(vec![x], w))
            .collect();
        Ok(Self { points })
    }
}

impl<T: RealField> IntegrationRule<T> for GaussLineRule<T> {
    fn cell_kind(&self) -> CellKind {
        CellKind::Line2
    }

    fn points(&self) -> &[IntegrationPoint<T>] {
        &self.points
    }
}

/// Tensor-product Gauss rule on the reference quadrilateral $[-1, 1]^2$.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussQuadRule<T> {
    points: Vec<IntegrationPoint<T>>,
}

impl<T: RealField> GaussQuadRule<T> {
    /// Creates an `n` by `n` tensor-product rule (1 to 3 points per direction).
    pub fn new(n: usize) -> Result<Self, AssemblyError> {
        let line = gauss_points_1d::<T>(n)?;
        let points = line
            .iter()
            .cartesian_product(&line)
            .map(|((y, wy), (x, wx))| {
                IntegrationPoint::new(vec![x.clone(), y.clone()], wx.clone() * wy.clone())
            })
            .collect();
        Ok(Self { points })
    }
}

impl<T: RealField> IntegrationRule<T> for GaussQuadRule<T> {
    fn cell_kind(&self) -> CellKind {
        CellKind::Quad4
    }

    fn points(&self) -> &[IntegrationPoint<T>] {
        &self.points
    }
}

/// Symmetric rules on the reference triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleRule<T> {
    points: Vec<IntegrationPoint<T>>,
}

impl<T: RealField> TriangleRule<T> {
    /// Single-point centroid rule, exact for linear integrands.
    pub fn centroid() -> Self {
        let third: T = convert(1.0 / 3.0);
        let half: T = convert(0.5);
        Self {
            points: vec![IntegrationPoint::new(vec![third.clone(), third], half)],
        }
    }

    /// Three-point rule at the edge midpoints, exact for quadratic integrands.
    pub fn three_point() -> Self {
        let sixth: T = convert(1.0 / 6.0);
        let two_thirds: T = convert(2.0 / 3.0);
        let w: T = convert(1.0 / 6.0);
        Self {
            points: vec![
                IntegrationPoint::new(vec![sixth.clone(), sixth.clone()], w.clone()),
                IntegrationPoint::new(vec![two_thirds.clone(), sixth.clone()], w.clone()),
                IntegrationPoint::new(vec![sixth, two_thirds], w),
            ],
        }
    }
}

impl<T: RealField> IntegrationRule<T> for TriangleRule<T> {
    fn cell_kind(&self) -> CellKind {
        CellKind::Tri3
    }

    fn points(&self) -> &[IntegrationPoint<T>] {
        &self.points
    }
}

/// A reasonable default rule for each supported cell kind: exact for the
/// bilinear tangent contributions of the built-in terms.
pub fn default_rule<T: RealField>(kind: CellKind) -> Box<dyn IntegrationRule<T>> {
    match kind {
        CellKind::Line2 => Box::new(GaussLineRule::new(2).unwrap()),
        CellKind::Tri3 => Box::new(TriangleRule::three_point()),
        CellKind::Quad4 => Box::new(GaussQuadRule::new(2).unwrap()),
    }
}

fn gauss_points_1d<T: RealField>(n: usize) -> Result<Vec<(T, T)>, AssemblyError> {
    let zero = T::zero();
    let one = T::one();
    match n {
        1 => Ok(vec![(zero, convert(2.0))]),
        2 => {
            let x: T = convert(1.0 / 3.0f64.sqrt());
            Ok(vec![(-x.clone(), one.clone()), (x, one)])
        }
        3 => {
            let x: T = convert(0.6f64.sqrt());
            let w_outer: T = convert(5.0 / 9.0);
            let w_center: T = convert(8.0 / 9.0);
            Ok(vec![
                (-x.clone(), w_outer.clone()),
                (zero, w_center),
                (x, w_outer),
            ])
        }
        _ => Err(AssemblyError::unsupported(format!(
            "no {}-point Gauss segment rule available",
            n
        ))),
    }
}
