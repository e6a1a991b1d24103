//! Local and global assembly of weak-form contributions.
//!
//! The `local` module defines the weak-form term abstraction evaluated per
//! integration point; `global` provides scatter-add targets and the
//! sequential/parallel drivers that sweep elements and terms; `terms` contains
//! reference physics terms exercising the interface.
pub mod global;
pub mod local;
pub mod terms;
