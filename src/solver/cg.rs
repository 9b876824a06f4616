//! Conjugate Gradient (unpreconditioned) per Saad §6.1.

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::solver::{LinearSolver, monitor, residual};
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats};

pub struct CgSolver<T> {
    pub conv: Convergence<T>,
    pub monitor: bool,
}

impl<T: Copy + num_traits::Float> CgSolver<T> {
    pub fn new(conv: Convergence<T>) -> Self {
        Self { conv, monitor: false }
    }

    pub fn with_monitor(mut self, monitor: bool) -> Self {
        self.monitor = monitor;
        self
    }
}

impl<M, V, T> LinearSolver<M, V> for CgSolver<T>
where
    M: MatVec<V>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float + From<f64>,
{
    type Scalar = T;

    fn solve<IP>(&mut self, a: &M, ip: &IP, b: &V, x: &mut V) -> Result<SolveStats<T>, KError>
    where
        IP: InnerProduct<V, Scalar = T>,
    {
        let n = b.as_ref().len();
        let mut x_vec = x.as_ref().to_vec();
        let mut r = residual(a, b, &x_vec)?;
        let mut p = r.clone();
        let mut rsq = ip.dot(&r, &r);
        let res0 = rsq.sqrt();
        monitor(self.monitor, 0, res0);
        let mut stats = self.conv.stats(res0, res0, 0);

        let mut i = 0;
        while stats.reason == ConvergedReason::Iterating {
            i += 1;
            let mut ap = V::from(vec![T::zero(); n]);
            a.matvec(&p, &mut ap)?;
            let pap = ip.dot(&p, &ap);
            if !pap.is_finite() {
                stats.reason = ConvergedReason::DivergedNanOrInf;
                break;
            }
            if pap <= T::zero() {
                // p^T A p <= 0: A is not positive definite (or singular on p)
                stats.reason = if pap == T::zero() {
                    ConvergedReason::DivergedBreakdown
                } else {
                    ConvergedReason::DivergedIndefiniteMat
                };
                break;
            }
            let alpha = rsq / pap;
            for (xj, pj) in x_vec.iter_mut().zip(p.as_ref()) {
                *xj = *xj + alpha * *pj;
            }
            for (rj, apj) in r.as_mut().iter_mut().zip(ap.as_ref()) {
                *rj = *rj - alpha * *apj;
            }
            let rsq_new = ip.dot(&r, &r);
            let res_norm = rsq_new.sqrt();
            monitor(self.monitor, i, res_norm);
            stats = self.conv.stats(res_norm, res0, i);
            let beta = rsq_new / rsq;
            for (pj, rj) in p.as_mut().iter_mut().zip(r.as_ref()) {
                *pj = *rj + beta * *pj;
            }
            rsq = rsq_new;
        }
        *x = V::from(x_vec);
        Ok(stats)
    }
}
