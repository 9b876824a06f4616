//! invertop: matrix-free invertible operators over a PETSc-style KSP engine
//!
//! This crate turns a linear operator given only as a function on distributed structured-grid
//! fields into something that can be inverted. The operator is wrapped in a shell matrix whose
//! multiply marshals fields to flat vectors and back, and a Krylov solver (GMRES, CG or BiCGStab,
//! chosen through an options database) inverts it.
//!
//! Start from [`invertible::ShellInverter`] or the [`invertible::invertible_operator`] factory.

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod field;
pub mod invertible;
pub mod matrix;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use self::core::*;
pub use error::*;
pub use field::*;
pub use invertible::*;
pub use matrix::*;
pub use solver::*;
pub use utils::*;
