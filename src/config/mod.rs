//! Solver configuration sources.

pub mod options;

pub use options::{KspOptions, OPTIONS_ENV_VAR, OptionsDatabase};
