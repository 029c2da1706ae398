#![warn(missing_docs)]

//! Light weight helpers shared by the passkey crates. They carry no
//! dependencies of their own so that every other crate in the workspace can
//! use them without widening its dependency graph.

mod sync;
pub use sync::*;

mod dispatch;
pub use dispatch::*;
