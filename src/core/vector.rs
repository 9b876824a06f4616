//! Flat solver vector owned by the engine.
//!
//! A `SolverVec` holds this process's slice of a distributed vector together with
//! the global length. Vectors are normally obtained from
//! [`ShellMat::create_vecs`](crate::matrix::ShellMat::create_vecs) so that their
//! layout matches the operator they are used with.

use crate::core::traits::Indexing;

#[derive(Clone, Debug, PartialEq)]
pub struct SolverVec<T> {
    local: Vec<T>,
    global_len: usize,
}

impl<T: num_traits::Float> SolverVec<T> {
    /// Zeroed vector of `local_len` local entries out of `global_len`.
    pub fn zeros(local_len: usize, global_len: usize) -> Self {
        Self { local: vec![T::zero(); local_len], global_len }
    }

    /// Fill every local entry with `value`.
    pub fn set(&mut self, value: T) {
        self.local.iter_mut().for_each(|v| *v = value);
    }
}

impl<T> SolverVec<T> {
    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    pub fn global_len(&self) -> usize {
        self.global_len
    }

    /// Read access to the local array.
    pub fn as_slice(&self) -> &[T] {
        &self.local
    }

    /// Write access to the local array.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.local
    }
}

impl<T> AsRef<[T]> for SolverVec<T> {
    fn as_ref(&self) -> &[T] {
        &self.local
    }
}

impl<T> AsMut<[T]> for SolverVec<T> {
    fn as_mut(&mut self) -> &mut [T] {
        &mut self.local
    }
}

impl<T> Indexing for SolverVec<T> {
    fn nrows(&self) -> usize {
        self.local.len()
    }
}
