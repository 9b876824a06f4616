//! Inner products over local and distributed vectors.
//!
//! This module provides implementations of the [`InnerProduct`] trait used by the Krylov solvers:
//!
//! - `()` computes products over the local slice only, with optional Rayon parallelism.
//! - [`DistributedInnerProduct`] computes the local part the same way and then sums it across every
//!   process of a communicator, so each rank of a partitioned problem sees identical scalars.
//!
//! The solvers in [`crate::solver`] always use the distributed form; on a serial communicator the
//! reduction is the identity and the two agree exactly.

use crate::core::traits::{Indexing, InnerProduct};
use crate::parallel::Comm;
use num_traits::{Float, FromPrimitive, ToPrimitive};

fn local_dot<T: Float + Send + Sync>(x: &[T], y: &[T]) -> T {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        x.par_iter()
            .zip(y.par_iter())
            .map(|(xi, yi)| *xi * *yi)
            .reduce(|| T::zero(), |acc, v| acc + v)
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter()
            .zip(y.iter())
            .map(|(xi, yi)| *xi * *yi)
            .fold(T::zero(), |acc, v| acc + v)
    }
}

/// Local inner product and norm, with optional Rayon parallelism.
impl<T: Float + From<f64> + Send + Sync> InnerProduct<Vec<T>> for () {
    type Scalar = T;
    /// Computes the dot product of two vectors: `x^T y`.
    fn dot(&self, x: &Vec<T>, y: &Vec<T>) -> T {
        local_dot(x, y)
    }
    /// Computes the Euclidean norm of a vector: `||x||_2`.
    fn norm(&self, x: &Vec<T>) -> T {
        local_dot(x, x).sqrt()
    }
}

/// Partition-wide inner product and norm.
///
/// Wraps a communicator and provides collective dot product and norm operations. Every process
/// holding a slice of the vectors must call these in the same order.
pub struct DistributedInnerProduct<'a, C: Comm + ?Sized> {
    /// Reference to the communicator implementing the `Comm` trait.
    pub comm: &'a C,
}

impl<'a, C: Comm + ?Sized> DistributedInnerProduct<'a, C> {
    pub fn new(comm: &'a C) -> Self {
        Self { comm }
    }

    /// Computes the distributed dot product of two slices, reducing across all processes.
    pub fn dot_slices<T: Float + FromPrimitive + ToPrimitive + Send + Sync>(&self, x: &[T], y: &[T]) -> T {
        // Reduce in f64 so the communicator does not need to know T
        let local = local_dot(x, y).to_f64().unwrap_or(f64::NAN);
        let global = self.comm.all_reduce_sum(local);
        T::from_f64(global).unwrap_or_else(T::nan)
    }
}

impl<'a, C, T> InnerProduct<Vec<T>> for DistributedInnerProduct<'a, C>
where
    C: Comm + ?Sized,
    T: Float + From<f64> + FromPrimitive + ToPrimitive + Send + Sync,
{
    type Scalar = T;
    fn dot(&self, x: &Vec<T>, y: &Vec<T>) -> T {
        self.dot_slices(x, y)
    }
    fn norm(&self, x: &Vec<T>) -> T {
        self.dot_slices(x, x).sqrt()
    }
}

/// Implements the `Indexing` trait for `Vec<T>`, treating a vector as a column vector.
impl<T> Indexing for Vec<T> {
    /// Returns the number of rows (length) of the vector.
    fn nrows(&self) -> usize {
        self.len()
    }
}
