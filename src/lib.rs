//! **mpfem** is a library for generic multiphysics weak-form finite element
//! assembly.
//!
//! The central abstraction lets an arbitrary physical field
//! ([`variable::Variable`]), an arbitrary weak-form integrand
//! ([`assembly::local::WeakFormTerm`]) and an arbitrary cell geometry be
//! composed so that any combination of physics can be integrated and assembled
//! into a discrete system without the element or the term knowing each other's
//! concrete type:
//!
//! - a *variable* binds a physical quantity to an interpolation scheme and a
//!   set of dof identities, optionally as the test (dual) counterpart of an
//!   unknown field;
//! - a *term* evaluates unweighted tangent and residual contributions at
//!   single integration points;
//! - the *element* ([`element::MpElement`]) drives the integration loop,
//!   weights and accumulates per-point contributions, resolves code numbers
//!   per field and scatter-adds local blocks into an assembly target.
//!
//! Global drivers (sequential and rayon-parallel) live in
//! [`assembly::global`]; reference physics terms in [`assembly::terms`].
//!
//! The crate deliberately does not decide what physics to solve, pick solvers,
//! or manage global sparse storage: it produces correctly shaped, correctly
//! indexed local contributions and accumulates them into caller-provided
//! targets.
pub mod assembly;
pub mod dof;
pub mod element;
pub mod error;
pub mod interpolation;
pub mod mesh;
pub mod quadrature;
pub mod time;
pub mod variable;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
