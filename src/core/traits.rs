//! Core linear-algebra traits for invertop.

use crate::error::KError;

/// Matrix–vector product: y ← A x.
///
/// Fallible because a shell matrix evaluates a user callback.
pub trait MatVec<V> {
    /// Compute y = A · x.
    fn matvec(&self, x: &V, y: &mut V) -> Result<(), KError>;
}

/// Inner products & norms.
pub trait InnerProduct<V> {
    /// Associated scalar type.
    type Scalar: Copy + PartialOrd + From<f64>;
    /// Compute dot(x, y).
    fn dot(&self, x: &V, y: &V) -> Self::Scalar;
    /// Compute ‖x‖₂.
    fn norm(&self, x: &V) -> Self::Scalar;
}

/// Uniform indexing into vectors and operators.
pub trait Indexing {
    /// Number of local rows (or local length for a vector).
    fn nrows(&self) -> usize;
}
