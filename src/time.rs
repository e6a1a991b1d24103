//! Time step bookkeeping passed through to weak-form terms.
use nalgebra::Scalar;
use serde::{Deserialize, Serialize};

/// Identifies one solution step of an analysis.
///
/// The assembly core itself never advances time; it only threads the step
/// through to terms, which may use the increment for e.g. transient capacity
/// contributions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeStep<T: Scalar> {
    pub index: usize,
    pub time: T,
    pub increment: T,
}

impl<T: Scalar> TimeStep<T> {
    pub fn new(index: usize, time: T, increment: T) -> Self {
        Self { index, time, increment }
    }
}
