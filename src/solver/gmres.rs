#![allow(unused_assignments)]
//! Generalized Minimal Residual (GMRES) solver with fixed restart (Saad §6.4)
//!
//! This module implements the restarted GMRES algorithm for solving large, possibly nonsymmetric
//! linear systems Ax = b given only the action of A. GMRES minimizes the residual over a Krylov
//! subspace and is the default method of [`Ksp`](crate::context::Ksp).
//!
//! # Features
//! - Double (iterative) Gram-Schmidt orthogonalization for numerical stability
//! - Happy breakdown detection for early termination
//! - Givens rotations for least-squares update
//! - Robust back-substitution with zero-pivot protection
//! - A breakdown that leaves the true residual above tolerance is reported as
//!   [`ConvergedReason::DivergedBreakdown`], so singular operators fail loudly
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.4
//! - https://en.wikipedia.org/wiki/Generalized_minimal_residual_method

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::solver::{LinearSolver, monitor, residual};
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats};
use num_traits::Float;

/// GMRES solver struct with restart option.
///
/// # Type Parameters
/// * `T` - Scalar type (e.g., f32, f64)
pub struct GmresSolver<T> {
    /// Number of Arnoldi vectors before restart
    pub restart: usize,
    /// Convergence criteria
    pub conv: Convergence<T>,
    /// Log the residual estimate every iteration
    pub monitor: bool,
}

impl<T: Copy + Float> GmresSolver<T> {
    /// Create a new GMRES solver with restart and stopping criteria.
    pub fn new(restart: usize, conv: Convergence<T>) -> Self {
        Self { restart: restart.max(1), conv, monitor: false }
    }

    pub fn with_monitor(mut self, monitor: bool) -> Self {
        self.monitor = monitor;
        self
    }

    // --- Arnoldi process with double orthogonalization and happy breakdown ---
    /// Perform one step of the Arnoldi process.
    /// Returns true if happy breakdown is detected.
    fn arnoldi<M, V, IP>(
        a: &M,
        ip: &IP,
        v_basis: &mut Vec<V>,
        h: &mut [Vec<T>],
        j: usize,
        epsilon: T,
    ) -> Result<bool, KError>
    where
        M: MatVec<V>,
        IP: InnerProduct<V, Scalar = T>,
        V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    {
        let n = v_basis[0].as_ref().len();
        let mut w = V::from(vec![T::zero(); n]);
        a.matvec(&v_basis[j], &mut w)?;
        let w_norm = ip.norm(&w);
        // Modified Gram-Schmidt orthogonalization
        for i in 0..=j {
            h[i][j] = ip.dot(&w, &v_basis[i]);
            for (wk, vik) in w.as_mut().iter_mut().zip(v_basis[i].as_ref()) {
                *wk = *wk - h[i][j] * *vik;
            }
        }
        // Iterative refinement (second orthogonalization)
        for i in 0..=j {
            let tmp = ip.dot(&w, &v_basis[i]);
            h[i][j] = h[i][j] + tmp;
            for (wk, vik) in w.as_mut().iter_mut().zip(v_basis[i].as_ref()) {
                *wk = *wk - tmp * *vik;
            }
        }
        h[j + 1][j] = ip.norm(&w);
        // Happy breakdown: the new direction is negligible next to A v_j
        if h[j + 1][j].abs() <= epsilon * w_norm {
            return Ok(true);
        }
        let vj1 = V::from(w.as_ref().iter().map(|&wi| wi / h[j + 1][j]).collect::<Vec<_>>());
        v_basis.push(vj1);
        Ok(false)
    }

    // --- Apply Givens rotation and update g together ---
    /// Apply Givens rotations to Hessenberg matrix and update g vector.
    fn apply_givens_and_update_g(h: &mut [Vec<T>], g: &mut [T], cs: &mut [T], sn: &mut [T], j: usize, epsilon: T) {
        for i in 0..j {
            let temp = cs[i] * h[i][j] + sn[i] * h[i + 1][j];
            h[i + 1][j] = -sn[i] * h[i][j] + cs[i] * h[i + 1][j];
            h[i][j] = temp;
        }
        let h_kk = h[j][j];
        let h_k1k = h[j + 1][j];
        let r = (h_kk * h_kk + h_k1k * h_k1k).sqrt();
        if r.abs() < epsilon {
            cs[j] = T::one();
            sn[j] = T::zero();
        } else {
            cs[j] = h_kk / r;
            sn[j] = h_k1k / r;
        }
        h[j][j] = cs[j] * h_kk + sn[j] * h_k1k;
        h[j + 1][j] = T::zero();
        // Update g
        let temp = cs[j] * g[j] + sn[j] * g[j + 1];
        g[j + 1] = -sn[j] * g[j] + cs[j] * g[j + 1];
        g[j] = temp;
    }

    // --- Back-substitution for least squares with zero-pivot protection ---
    /// Solve upper-triangular system Hy = g for y, with zero-pivot protection.
    fn back_substitution(h: &[Vec<T>], g: &[T], y: &mut [T], m: usize, epsilon: T) {
        for i in (0..m).rev() {
            y[i] = g[i];
            for j in (i + 1)..m {
                y[i] = y[i] - h[i][j] * y[j];
            }
            if h[i][i].abs() > epsilon {
                y[i] = y[i] / h[i][i];
            } else {
                y[i] = T::zero();
            }
        }
    }
}

impl<M, V, T> LinearSolver<M, V> for GmresSolver<T>
where
    M: MatVec<V>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: Float + From<f64>,
{
    type Scalar = T;

    /// Solve the linear system Ax = b using restarted GMRES.
    ///
    /// # Arguments
    /// * `a` - Operator implementing `MatVec`
    /// * `ip` - Inner product (partition-wide for distributed vectors)
    /// * `b` - Right-hand side vector
    /// * `x` - On input: initial guess; on output: last iterate
    fn solve<IP>(&mut self, a: &M, ip: &IP, b: &V, x: &mut V) -> Result<SolveStats<T>, KError>
    where
        IP: InnerProduct<V, Scalar = T>,
    {
        let mut xk = x.as_ref().to_vec();
        let mut r0 = residual(a, b, &xk)?;
        let mut beta = ip.norm(&r0);
        let res0 = beta;
        let epsilon: T = From::from(1e-14);
        monitor(self.monitor, 0, beta);
        let mut stats = self.conv.stats(beta, res0, 0);
        if stats.reason != ConvergedReason::Iterating {
            return Ok(stats);
        }

        let mut iteration = 0;
        loop {
            // Krylov basis
            let mut v_basis: Vec<V> = Vec::with_capacity(self.restart + 1);
            v_basis.push(V::from(r0.as_ref().iter().map(|&ri| ri / beta).collect::<Vec<_>>()));
            // Hessenberg matrix and Givens rotation storage
            let mut h = vec![vec![T::zero(); self.restart]; self.restart + 1];
            let mut g = vec![T::zero(); self.restart + 1];
            g[0] = beta;
            let mut cs = vec![T::zero(); self.restart];
            let mut sn = vec![T::zero(); self.restart];
            let mut m = 0;
            let mut happy_breakdown = false;
            for j in 0..self.restart {
                iteration += 1;
                happy_breakdown = Self::arnoldi(a, ip, &mut v_basis, &mut h, j, epsilon)?;
                Self::apply_givens_and_update_g(&mut h, &mut g, &mut cs, &mut sn, j, epsilon);
                m = j + 1;
                let res_norm = g[j + 1].abs();
                monitor(self.monitor, iteration, res_norm);
                if happy_breakdown || self.conv.check(res_norm, res0, iteration) != ConvergedReason::Iterating {
                    break;
                }
            }
            // Solve least-squares problem for y and update xk
            let mut y = vec![T::zero(); m];
            Self::back_substitution(&h, &g[..m], &mut y, m, epsilon);
            for (j, yj) in y.iter().enumerate() {
                for (xk_i, vj_i) in xk.iter_mut().zip(v_basis[j].as_ref()) {
                    *xk_i = *xk_i + *yj * *vj_i;
                }
            }
            // True residual decides
            r0 = residual(a, b, &xk)?;
            beta = ip.norm(&r0);
            stats = self.conv.stats(beta, res0, iteration);
            if stats.reason.is_converged() || stats.reason.is_diverged() {
                break;
            }
            if happy_breakdown {
                // Invariant subspace found but the residual did not go away: A is singular
                // on the Krylov space of b.
                stats.reason = ConvergedReason::DivergedBreakdown;
                break;
            }
        }
        *x = V::from(xk);
        Ok(stats)
    }
}
