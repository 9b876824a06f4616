//! Stand-in used when the crate is built without the `ksp` feature.

use super::Invertible;
use super::adapter::{OperatorAdapter, OperatorFn};
use crate::error::InvertError;
use crate::field::{Field, Mesh};
use crate::utils::timing::Timings;
use std::sync::Arc;

const REASON: &str = "inversion requires the `ksp` feature";

/// Applies its operator function but cannot invert it.
pub struct UnsupportedInverter<F: Field> {
    mesh: Arc<Mesh>,
    adapter: OperatorAdapter<F>,
}

impl<F: Field> UnsupportedInverter<F> {
    pub fn new(mesh: &Arc<Mesh>) -> Self {
        Self { mesh: Arc::clone(mesh), adapter: OperatorAdapter::identity() }
    }

    pub fn with_function(mut self, function: impl Fn(&F) -> F + 'static) -> Self {
        self.adapter.set_function(function);
        self
    }
}

impl<F: Field> Invertible<F> for UnsupportedInverter<F> {
    fn setup(&mut self) -> Result<usize, InvertError> {
        Err(InvertError::Unsupported(REASON))
    }

    fn invert(&mut self, _rhs: &F) -> Result<F, InvertError> {
        Err(InvertError::Unsupported(REASON))
    }

    fn verify(&mut self, _rhs: &F, _tolerance: f64) -> Result<bool, InvertError> {
        Err(InvertError::Unsupported(REASON))
    }

    fn apply(&self, input: &F) -> F {
        self.adapter.apply(input)
    }

    fn set_operator_function(&mut self, function: OperatorFn<F>) {
        self.adapter.set_function(function);
    }

    fn report_time(&mut self) -> Timings {
        Timings::default()
    }

    fn destroy(&mut self) {}

    fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }
}
