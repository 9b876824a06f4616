//! Solver handles.
//!
//! - [`ksp_context`]: the `Ksp` handle that binds a shell operator to a Krylov method chosen from
//!   an options database.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

pub mod ksp_context;
pub use ksp_context::{Ksp, SolverKind};
