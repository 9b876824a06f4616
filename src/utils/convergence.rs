//! Convergence tracking & tolerance checks for iterative solvers.

use num_traits::Float;

/// Why a solve stopped. Codes follow PETSc's `KSPConvergedReason`: positive means converged,
/// zero means still iterating, negative enumerates a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ConvergedReason {
    ConvergedRtol = 2,
    ConvergedAtol = 3,
    ConvergedHappyBreakdown = 5,
    Iterating = 0,
    DivergedNull = -2,
    DivergedIts = -3,
    DivergedDtol = -4,
    DivergedBreakdown = -5,
    DivergedBreakdownBicg = -6,
    DivergedNanOrInf = -9,
    DivergedIndefiniteMat = -10,
}

impl ConvergedReason {
    /// Raw signed code.
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_converged(self) -> bool {
        self.code() > 0
    }

    pub fn is_diverged(self) -> bool {
        self.code() < 0
    }
}

impl std::fmt::Display for ConvergedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConvergedReason::ConvergedRtol => "CONVERGED_RTOL",
            ConvergedReason::ConvergedAtol => "CONVERGED_ATOL",
            ConvergedReason::ConvergedHappyBreakdown => "CONVERGED_HAPPY_BREAKDOWN",
            ConvergedReason::Iterating => "CONVERGED_ITERATING",
            ConvergedReason::DivergedNull => "DIVERGED_NULL",
            ConvergedReason::DivergedIts => "DIVERGED_ITS",
            ConvergedReason::DivergedDtol => "DIVERGED_DTOL",
            ConvergedReason::DivergedBreakdown => "DIVERGED_BREAKDOWN",
            ConvergedReason::DivergedBreakdownBicg => "DIVERGED_BREAKDOWN_BICG",
            ConvergedReason::DivergedNanOrInf => "DIVERGED_NANORINF",
            ConvergedReason::DivergedIndefiniteMat => "DIVERGED_INDEFINITE_MAT",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// Stopping criteria.
#[derive(Clone, Debug)]
pub struct Convergence<T> {
    pub rtol: T,
    pub atol: T,
    pub dtol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub reason: ConvergedReason,
}

impl<T: Copy> SolveStats<T> {
    pub fn converged(&self) -> bool {
        self.reason.is_converged()
    }
}

impl<T: Copy + Float> Convergence<T> {
    /// Classify residual norm `res_norm` at iteration `i`, relative to the initial `res0_norm`.
    pub fn check(&self, res_norm: T, res0_norm: T, i: usize) -> ConvergedReason {
        if !res_norm.is_finite() {
            return ConvergedReason::DivergedNanOrInf;
        }
        if res_norm <= self.rtol * res0_norm {
            return ConvergedReason::ConvergedRtol;
        }
        if res_norm <= self.atol {
            return ConvergedReason::ConvergedAtol;
        }
        if res0_norm > T::zero() && res_norm >= self.dtol * res0_norm {
            return ConvergedReason::DivergedDtol;
        }
        if i >= self.max_iters {
            return ConvergedReason::DivergedIts;
        }
        ConvergedReason::Iterating
    }

    /// `check` packaged with the iteration count.
    pub fn stats(&self, res_norm: T, res0_norm: T, i: usize) -> SolveStats<T> {
        SolveStats { iterations: i, final_residual: res_norm, reason: self.check(res_norm, res0_norm, i) }
    }
}
