//! BiCGStab solver (Saad §7.1)

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::solver::{LinearSolver, monitor, residual};
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats};

pub struct BiCgStabSolver<T> {
    pub conv: Convergence<T>,
    pub monitor: bool,
}

impl<T: num_traits::Float> BiCgStabSolver<T> {
    pub fn new(conv: Convergence<T>) -> Self {
        Self { conv, monitor: false }
    }

    pub fn with_monitor(mut self, monitor: bool) -> Self {
        self.monitor = monitor;
        self
    }
}

impl<M, V, T> LinearSolver<M, V> for BiCgStabSolver<T>
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
        let mut xk = x.as_ref().to_vec();
        // r0 = b - A x0
        let mut r = residual(a, b, &xk)?;
        let r_hat = r.clone(); // shadow residual
        let mut rho_prev = T::one();
        let mut alpha = T::one();
        let mut omega_prev = T::one();
        let mut v = V::from(vec![T::zero(); n]);
        let mut p = V::from(vec![T::zero(); n]);
        let res0 = ip.norm(&r);
        monitor(self.monitor, 0, res0);
        let mut stats = self.conv.stats(res0, res0, 0);
        let tiny = T::min_positive_value();

        let mut i = 0;
        while stats.reason == ConvergedReason::Iterating {
            i += 1;
            let rho = ip.dot(&r_hat, &r);
            if rho.abs() < tiny {
                stats.reason = ConvergedReason::DivergedBreakdownBicg;
                break;
            }
            let beta = if i == 1 { T::zero() } else { (rho / rho_prev) * (alpha / omega_prev) };
            // p = r + beta * (p - omega_prev * v)
            for ((p_j, r_j), v_j) in p.as_mut().iter_mut().zip(r.as_ref()).zip(v.as_ref()) {
                *p_j = *r_j + beta * (*p_j - omega_prev * *v_j);
            }
            // v = A p
            a.matvec(&p, &mut v)?;
            let alpha_den = ip.dot(&r_hat, &v);
            if alpha_den.abs() < tiny || !alpha_den.is_finite() {
                stats.reason = ConvergedReason::DivergedBreakdownBicg;
                break;
            }
            alpha = rho / alpha_den;
            // s = r - alpha * v
            let s = V::from(r.as_ref().iter().zip(v.as_ref()).map(|(&rj, &vj)| rj - alpha * vj).collect::<Vec<_>>());
            let s_norm = ip.norm(&s);
            if self.conv.check(s_norm, res0, i).is_converged() {
                for (xj, pj) in xk.iter_mut().zip(p.as_ref()) {
                    *xj = *xj + alpha * *pj;
                }
                monitor(self.monitor, i, s_norm);
                stats = self.conv.stats(s_norm, res0, i);
                break;
            }
            // t = A s
            let mut t = V::from(vec![T::zero(); n]);
            a.matvec(&s, &mut t)?;
            let omega_den = ip.dot(&t, &t);
            if omega_den.abs() < tiny {
                stats.reason = ConvergedReason::DivergedBreakdownBicg;
                break;
            }
            let omega = ip.dot(&t, &s) / omega_den;
            // x = x + alpha * p + omega * s
            for ((xj, pj), sj) in xk.iter_mut().zip(p.as_ref()).zip(s.as_ref()) {
                *xj = *xj + alpha * *pj + omega * *sj;
            }
            // r = s - omega * t
            r = V::from(s.as_ref().iter().zip(t.as_ref()).map(|(&sj, &tj)| sj - omega * tj).collect::<Vec<_>>());
            let r_norm = ip.norm(&r);
            monitor(self.monitor, i, r_norm);
            stats = self.conv.stats(r_norm, res0, i);
            if stats.reason == ConvergedReason::Iterating && omega.abs() < tiny {
                stats.reason = ConvergedReason::DivergedBreakdownBicg;
            }
            rho_prev = rho;
            omega_prev = omega;
        }
        *x = V::from(xk);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct DenseMat {
        data: Vec<Vec<f64>>,
    }
    impl MatVec<Vec<f64>> for DenseMat {
        fn matvec(&self, x: &Vec<f64>, y: &mut Vec<f64>) -> Result<(), KError> {
            for (i, row) in self.data.iter().enumerate() {
                y[i] = row.iter().zip(x.iter()).map(|(a, b)| a * b).sum();
            }
            Ok(())
        }
    }

    // Helper: well-conditioned non-symmetric 3x3 matrix
    fn nonsym_3x3() -> (DenseMat, Vec<f64>) {
        let data: Vec<Vec<f64>> = (0..3)
            .map(|i| (0..3).map(|j| if i == j { 4.0 } else { (i + 2 * j) as f64 * 0.25 }).collect())
            .collect();
        let a = DenseMat { data };
        let x_true = vec![1.0, 2.0, 3.0];
        let mut b = vec![0.0; 3];
        a.matvec(&x_true, &mut b).unwrap();
        (a, b)
    }

    #[test]
    fn bicgstab_solves_well_conditioned_nonsym() {
        let (a, b) = nonsym_3x3();
        let mut x = vec![0.0; 3];
        let conv = Convergence { rtol: 1e-12, atol: 1e-50, dtol: 1e5, max_iters: 100 };
        let stats = BiCgStabSolver::new(conv).solve(&a, &(), &b, &mut x).unwrap();
        for (xi, ei) in x.iter().zip([1.0, 2.0, 3.0]) {
            assert_abs_diff_eq!(*xi, ei, epsilon = 1e-8);
        }
        assert!(stats.converged(), "BiCGStab did not converge: stats = {:?}", stats);
    }

    #[test]
    fn zero_operator_is_bicg_breakdown() {
        let a = DenseMat { data: vec![vec![0.0; 2]; 2] };
        let mut x = vec![0.0; 2];
        let conv = Convergence { rtol: 1e-8, atol: 1e-50, dtol: 1e5, max_iters: 100 };
        let stats = BiCgStabSolver::new(conv).solve(&a, &(), &vec![1.0, 1.0], &mut x).unwrap();
        assert_eq!(stats.reason, ConvergedReason::DivergedBreakdownBicg);
    }
}
