//! Holder for the user's operator function.

use crate::field::Field;

/// A linear operator expressed as a function from field to field.
pub type OperatorFn<F> = Box<dyn Fn(&F) -> F>;

/// Applies whichever operator function is currently installed.
pub struct OperatorAdapter<F> {
    function: OperatorFn<F>,
}

impl<F: Field> OperatorAdapter<F> {
    pub fn new(function: impl Fn(&F) -> F + 'static) -> Self {
        Self { function: Box::new(function) }
    }

    pub fn identity() -> Self {
        Self::new(|f: &F| f.clone())
    }

    pub fn apply(&self, input: &F) -> F {
        (self.function)(input)
    }

    /// Replace the operator. Later `apply` calls use the new function.
    pub fn set_function(&mut self, function: impl Fn(&F) -> F + 'static) {
        self.function = Box::new(function);
    }
}

impl<F: Field> Default for OperatorAdapter<F> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<F> std::fmt::Debug for OperatorAdapter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorAdapter").finish_non_exhaustive()
    }
}
