//! Krylov solver interfaces.

use crate::core::traits::InnerProduct;
use crate::error::KError;
use crate::utils::convergence::SolveStats;

/// Common interface for the iterative solvers driven by [`Ksp`](crate::context::Ksp).
pub trait LinearSolver<M, V> {
    type Scalar: Copy + PartialOrd + From<f64>;
    /// Solve A·x = b, writing result into `x`. On entry `x` holds the initial guess.
    ///
    /// Returns iteration stats; a solve that stops without converging is reported through
    /// `SolveStats::reason`, not as an `Err`. `Err` is reserved for operator failures.
    fn solve<IP>(&mut self, a: &M, ip: &IP, b: &V, x: &mut V) -> Result<SolveStats<Self::Scalar>, KError>
    where
        IP: InnerProduct<V, Scalar = Self::Scalar>;
}

/// Log a residual norm, in the format of PETSc's `-ksp_monitor`.
pub(crate) fn monitor<T: num_traits::ToPrimitive>(enabled: bool, iteration: usize, res_norm: T) {
    if enabled {
        log::info!("{:4} KSP Residual norm {:.12e}", iteration, res_norm.to_f64().unwrap_or(f64::NAN));
    }
}

/// r = b - A x
pub(crate) fn residual<M, V, T>(a: &M, b: &V, x: &[T]) -> Result<V, KError>
where
    M: crate::core::traits::MatVec<V>,
    V: AsRef<[T]> + From<Vec<T>>,
    T: num_traits::Float,
{
    let n = b.as_ref().len();
    let mut ax = V::from(vec![T::zero(); n]);
    a.matvec(&V::from(x.to_vec()), &mut ax)?;
    let r = ax.as_ref().iter().zip(b.as_ref()).map(|(&axi, &bi)| bi - axi).collect::<Vec<_>>();
    Ok(V::from(r))
}

pub mod cg;
pub use cg::CgSolver;

pub mod gmres;
pub use gmres::GmresSolver;

pub mod bicgstab;
pub use bicgstab::BiCgStabSolver;
