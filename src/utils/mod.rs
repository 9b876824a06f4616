//! Convergence bookkeeping and timing helpers.

pub mod convergence;
pub mod timing;

pub use convergence::{ConvergedReason, Convergence, SolveStats};
pub use timing::{Phase, Stopwatch, Timings};
