//! Krylov Subspace solver handle (KSP).
//!
//! This module provides the `Ksp` struct, the solver handle that the invertible-operator layer drives. A
//! `Ksp` is bound to one shell operator, configured from an [`OptionsDatabase`] under its option prefix,
//! set up once, and then solves `A x = b` any number of times.
//!
//! # Usage
//!
//! 1. `Ksp::create` on the communicator of the operator.
//! 2. `set_operators`, `set_options_prefix`, `set_from_options`, `set_up`.
//! 3. `solve` returns the [`ConvergedReason`]; a non-positive reason means the solve failed.
//!
//! # Supported Solvers
//! - GMRES (default), CG, BiCGStab
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

use crate::config::options::{KspOptions, OptionsDatabase};
use crate::core::traits::Indexing;
use crate::core::vector::SolverVec;
use crate::core::wrappers::DistributedInnerProduct;
use crate::error::KError;
use crate::matrix::ShellMat;
use crate::parallel::{Comm, UniverseComm};
use crate::solver::{BiCgStabSolver, CgSolver, GmresSolver, LinearSolver};
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats};
use num_traits::{Float, FromPrimitive, ToPrimitive};
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

/// Enum representing the available Krylov solver types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Restarted GMRES (general nonsymmetric operators)
    Gmres,
    /// Conjugate Gradient (symmetric positive definite operators)
    Cg,
    /// BiConjugate Gradient Stabilized (BiCGStab)
    Bicgstab,
}

impl SolverKind {
    /// Name accepted by `-<prefix>ksp_type`.
    pub fn name(&self) -> &'static str {
        match self {
            SolverKind::Gmres => "gmres",
            SolverKind::Cg => "cg",
            SolverKind::Bicgstab => "bcgs",
        }
    }
}

impl FromStr for SolverKind {
    type Err = KError;
    fn from_str(s: &str) -> Result<Self, KError> {
        match s.to_ascii_lowercase().as_str() {
            "gmres" => Ok(SolverKind::Gmres),
            "cg" => Ok(SolverKind::Cg),
            "bcgs" | "bicgstab" => Ok(SolverKind::Bicgstab),
            other => Err(KError::InvalidArgument(format!("unknown KSP type {other:?}"))),
        }
    }
}

/// Solver handle bound to a shell operator.
pub struct Ksp<T> {
    comm: Arc<UniverseComm>,
    operator: Option<Rc<ShellMat<T>>>,
    prefix: String,
    options: KspOptions,
    is_set_up: bool,
    last: Option<SolveStats<T>>,
}

impl<T> Ksp<T>
where
    T: Float + From<f64> + FromPrimitive + ToPrimitive + Send + Sync,
{
    pub fn create(comm: Arc<UniverseComm>) -> Result<Self, KError> {
        Ok(Self {
            comm,
            operator: None,
            prefix: String::new(),
            options: KspOptions::default(),
            is_set_up: false,
            last: None,
        })
    }

    /// Bind the operator to invert. Rebinding invalidates a previous `set_up`.
    pub fn set_operators(&mut self, operator: Rc<ShellMat<T>>) -> Result<(), KError> {
        self.operator = Some(operator);
        self.is_set_up = false;
        Ok(())
    }

    /// Prefix prepended to every option key this solver looks up.
    pub fn set_options_prefix(&mut self, prefix: &str) -> Result<(), KError> {
        if prefix.starts_with('-') || prefix.chars().any(char::is_whitespace) {
            return Err(KError::InvalidArgument(format!("invalid options prefix {prefix:?}")));
        }
        self.prefix = prefix.to_string();
        Ok(())
    }

    pub fn options_prefix(&self) -> &str {
        &self.prefix
    }

    /// Apply every `<prefix>ksp_*` entry of `db`.
    pub fn set_from_options(&mut self, db: &OptionsDatabase) -> Result<(), KError> {
        let mut options = self.options.clone();
        options.apply_database(db, &self.prefix)?;
        self.options = options;
        self.is_set_up = false;
        Ok(())
    }

    pub fn options(&self) -> &KspOptions {
        &self.options
    }

    pub fn set_type(&mut self, kind: SolverKind) {
        self.options.kind = kind;
        self.is_set_up = false;
    }

    pub fn set_tolerances(&mut self, rtol: f64, atol: f64, divtol: f64, max_it: usize) {
        self.options.rtol = rtol;
        self.options.atol = atol;
        self.options.divtol = divtol;
        self.options.max_it = max_it;
        self.is_set_up = false;
    }

    /// Validate the configuration so `solve` can proceed.
    pub fn set_up(&mut self) -> Result<(), KError> {
        let op = self.operator.as_ref().ok_or(KError::WrongState("KSP has no operator; call set_operators"))?;
        if !op.has_mult() {
            return Err(KError::WrongState("shell operator has no multiply registered"));
        }
        self.options.validate()?;
        self.is_set_up = true;
        log::debug!(
            "KSP {}: set up {} on local size {:?}, global size {:?}",
            self.prefix,
            self.options.kind.name(),
            op.local_size(),
            op.global_size()
        );
        Ok(())
    }

    pub fn is_set_up(&self) -> bool {
        self.is_set_up
    }

    /// Solve A x = b. Collective over the operator's communicator.
    ///
    /// Starts from zero unless `ksp_initial_guess_nonzero` is set. The returned reason is
    /// positive on convergence; `Err` means the operator itself failed.
    pub fn solve(&mut self, b: &SolverVec<T>, x: &mut SolverVec<T>) -> Result<ConvergedReason, KError> {
        if !self.is_set_up {
            self.set_up()?;
        }
        let op = Rc::clone(self.operator.as_ref().ok_or(KError::WrongState("KSP has no operator"))?);
        let (rows, cols) = (op.nrows(), op.local_size().1);
        if b.nrows() != rows {
            return Err(KError::SizeMismatch { expected: rows, found: b.nrows() });
        }
        if x.local_len() != cols {
            return Err(KError::SizeMismatch { expected: cols, found: x.local_len() });
        }
        if !self.options.initial_guess_nonzero {
            x.set(T::zero());
        }

        let conv = Convergence {
            rtol: <T as From<f64>>::from(self.options.rtol),
            atol: <T as From<f64>>::from(self.options.atol),
            dtol: <T as From<f64>>::from(self.options.divtol),
            max_iters: self.options.max_it,
        };
        let ip = DistributedInnerProduct::new(self.comm.as_ref());
        let bv = b.as_slice().to_vec();
        let mut xv = x.as_slice().to_vec();
        let monitor = self.options.monitor;
        let stats = match self.options.kind {
            SolverKind::Gmres => GmresSolver::new(self.options.restart, conv).with_monitor(monitor).solve(&*op, &ip, &bv, &mut xv)?,
            SolverKind::Cg => CgSolver::new(conv).with_monitor(monitor).solve(&*op, &ip, &bv, &mut xv)?,
            SolverKind::Bicgstab => BiCgStabSolver::new(conv).with_monitor(monitor).solve(&*op, &ip, &bv, &mut xv)?,
        };
        x.as_mut_slice().copy_from_slice(&xv);

        let reason = stats.reason;
        log::debug!(
            "KSP {}: {} finished with converged reason {} after {} iterations (residual {:e})",
            self.prefix,
            self.options.kind.name(),
            reason,
            stats.iterations,
            stats.final_residual.to_f64().unwrap_or(f64::NAN)
        );
        self.last = Some(stats);
        Ok(reason)
    }

    /// Reason of the most recent solve; `Iterating` before any solve.
    pub fn converged_reason(&self) -> ConvergedReason {
        self.last.as_ref().map_or(ConvergedReason::Iterating, |s| s.reason)
    }

    /// Iterations taken by the most recent solve.
    pub fn iterations(&self) -> usize {
        self.last.as_ref().map_or(0, |s| s.iterations)
    }

    pub fn last_solve(&self) -> Option<&SolveStats<T>> {
        self.last.as_ref()
    }

    /// Human-readable summary in the spirit of `KSPView`.
    pub fn view(&self) -> String {
        let o = &self.options;
        let mut out = format!(
            "KSP Object: ({}) {} process(es)\n  type: {}\n",
            self.prefix,
            self.comm.size(),
            o.kind.name()
        );
        if o.kind == SolverKind::Gmres {
            out.push_str(&format!("    restart={}\n", o.restart));
        }
        out.push_str(&format!("  maximum iterations={}, initial guess is {}\n", o.max_it, if o.initial_guess_nonzero { "nonzero" } else { "zero" }));
        out.push_str(&format!("  tolerances: relative={:e}, absolute={:e}, divergence={:e}\n", o.rtol, o.atol, o.divtol));
        if let Some(op) = &self.operator {
            out.push_str(&format!("  operator: {:?}\n", op));
        }
        if let Some(last) = &self.last {
            out.push_str(&format!("  last solve: {} in {} iterations\n", last.reason, last.iterations));
        }
        out
    }
}

impl<T> std::fmt::Debug for Ksp<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ksp")
            .field("prefix", &self.prefix)
            .field("options", &self.options)
            .field("is_set_up", &self.is_set_up)
            .finish()
    }
}
