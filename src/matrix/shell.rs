//! Matrix-free ("shell") operators.
//!
//! A `ShellMat` never stores entries. It records the local and global shape of the operator, an
//! opaque context object and a multiply callback. Applying the operator invokes the callback with
//! the matrix itself, from which the callback recovers its context via [`ShellMat::context`].
//!
//! The context is reference counted and owned by the matrix, so it lives exactly as long as the
//! handle does.

use crate::core::traits::{Indexing, MatVec};
use crate::core::vector::SolverVec;
use crate::error::KError;
use crate::parallel::{Comm, UniverseComm};
use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

/// Multiply callback: y ← A x on the local slices.
pub type MultFn<T> = fn(&ShellMat<T>, &[T], &mut [T]) -> Result<(), KError>;

pub struct ShellMat<T> {
    comm: Arc<UniverseComm>,
    local_rows: usize,
    local_cols: usize,
    global_rows: usize,
    global_cols: usize,
    ctx: Option<Rc<dyn Any>>,
    mult: Option<MultFn<T>>,
}

impl<T: num_traits::Float> ShellMat<T> {
    /// Create a shell operator of local shape `local_rows × local_cols`.
    ///
    /// `global` of `None` determines the global size by summing local sizes over the
    /// communicator; this is collective. A supplied global size must match that sum.
    pub fn create(
        comm: Arc<UniverseComm>,
        local_rows: usize,
        local_cols: usize,
        global: Option<usize>,
        ctx: Rc<dyn Any>,
    ) -> Result<Self, KError> {
        if local_rows != local_cols {
            return Err(KError::Unsupported("non-square shell operator"));
        }
        let summed = comm.all_reduce_sum(local_rows as f64) as usize;
        let global_rows = match global {
            Some(g) if g != summed => return Err(KError::SizeMismatch { expected: summed, found: g }),
            Some(g) => g,
            None => summed,
        };
        Ok(Self {
            comm,
            local_rows,
            local_cols,
            global_rows,
            global_cols: global_rows,
            ctx: Some(ctx),
            mult: None,
        })
    }

    /// Vectors laid out like this operator: `(right, left)`, i.e. compatible with `x` and with
    /// `y = A x` respectively.
    pub fn create_vecs(&self) -> Result<(SolverVec<T>, SolverVec<T>), KError> {
        Ok((
            SolverVec::zeros(self.local_cols, self.global_cols),
            SolverVec::zeros(self.local_rows, self.global_rows),
        ))
    }
}

impl<T> ShellMat<T> {
    /// Register the multiply operation.
    pub fn set_mult(&mut self, mult: MultFn<T>) -> Result<(), KError> {
        self.mult = Some(mult);
        Ok(())
    }

    pub fn has_mult(&self) -> bool {
        self.mult.is_some()
    }

    /// Recover the context passed at creation, as the concrete type `C`.
    pub fn context<C: Any>(&self) -> Result<&C, KError> {
        let ctx = self.ctx.as_ref().ok_or(KError::NullArgument("shell context"))?;
        ctx.downcast_ref::<C>()
            .ok_or_else(|| KError::InvalidArgument(format!("shell context is not a {}", std::any::type_name::<C>())))
    }

    pub fn comm(&self) -> &Arc<UniverseComm> {
        &self.comm
    }

    /// `(local_rows, local_cols)`
    pub fn local_size(&self) -> (usize, usize) {
        (self.local_rows, self.local_cols)
    }

    /// `(global_rows, global_cols)`
    pub fn global_size(&self) -> (usize, usize) {
        (self.global_rows, self.global_cols)
    }
}

impl<T> std::fmt::Debug for ShellMat<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellMat")
            .field("local", &(self.local_rows, self.local_cols))
            .field("global", &(self.global_rows, self.global_cols))
            .field("has_context", &self.ctx.is_some())
            .field("has_mult", &self.mult.is_some())
            .finish()
    }
}

impl<T> MatVec<Vec<T>> for ShellMat<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        if x.len() != self.local_cols {
            return Err(KError::SizeMismatch { expected: self.local_cols, found: x.len() });
        }
        if y.len() != self.local_rows {
            return Err(KError::SizeMismatch { expected: self.local_rows, found: y.len() });
        }
        let mult = self.mult.ok_or(KError::WrongState("shell operator has no multiply registered"))?;
        mult(self, x, y)
    }
}

impl<T> Indexing for ShellMat<T> {
    fn nrows(&self) -> usize {
        self.local_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scale(f64);

    fn scale_mult(mat: &ShellMat<f64>, x: &[f64], y: &mut [f64]) -> Result<(), KError> {
        let s = mat.context::<Scale>()?;
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi = s.0 * xi;
        }
        Ok(())
    }

    fn comm() -> Arc<UniverseComm> {
        Arc::new(UniverseComm::serial())
    }

    #[test]
    fn multiply_goes_through_context() {
        let mut mat = ShellMat::<f64>::create(comm(), 3, 3, None, Rc::new(Scale(2.0))).unwrap();
        mat.set_mult(scale_mult).unwrap();
        let mut y = vec![0.0; 3];
        mat.matvec(&vec![1.0, 2.0, 3.0], &mut y).unwrap();
        assert_eq!(y, vec![2.0, 4.0, 6.0]);
        assert_eq!(mat.global_size(), (3, 3));
    }

    #[test]
    fn missing_mult_is_wrong_state() {
        let mat = ShellMat::<f64>::create(comm(), 2, 2, None, Rc::new(Scale(1.0))).unwrap();
        let mut y = vec![0.0; 2];
        let err = mat.matvec(&vec![1.0, 1.0], &mut y).unwrap_err();
        assert!(matches!(err, KError::WrongState(_)));
    }

    #[test]
    fn wrong_context_type_is_rejected() {
        let mat = ShellMat::<f64>::create(comm(), 2, 2, None, Rc::new(5_u32)).unwrap();
        assert!(mat.context::<Scale>().is_err());
        assert_eq!(*mat.context::<u32>().unwrap(), 5);
    }

    #[test]
    fn global_size_must_match_local_sum() {
        let err = ShellMat::<f64>::create(comm(), 4, 4, Some(5), Rc::new(())).unwrap_err();
        assert!(matches!(err, KError::SizeMismatch { expected: 4, found: 5 }));
        assert!(ShellMat::<f64>::create(comm(), 4, 3, None, Rc::new(())).is_err());
    }

    #[test]
    fn vectors_match_layout() {
        let mat = ShellMat::<f64>::create(comm(), 5, 5, Some(5), Rc::new(())).unwrap();
        let (right, left) = mat.create_vecs().unwrap();
        assert_eq!(right.local_len(), 5);
        assert_eq!(left.global_len(), 5);
    }
}
