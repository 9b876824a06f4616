//! Operator types: matrix-free shell operators.

pub mod shell;
pub use shell::{MultFn, ShellMat};
