//! Solver-backed invertible operator.
//!
//! A [`ShellInverter`] owns one shell operator, one KSP handle and the two solver vectors. The
//! shell operator's context is the inverter's `ShellContext`, so every multiply issued by the
//! Krylov solver lands in `shell_mult`, which unpacks the vector into a field, applies the
//! current operator function and packs the result back.
//!
//! `setup`, `invert` and `verify` are collective over the mesh's communicator.

use super::adapter::{OperatorAdapter, OperatorFn};
use super::marshal::{field_to_vector, local_size, vector_to_field};
use super::Invertible;
use crate::config::OptionsDatabase;
use crate::context::Ksp;
use crate::core::vector::SolverVec;
use crate::error::{InvertError, KError};
use crate::field::{Field, Mesh, same_mesh};
use crate::matrix::ShellMat;
use crate::parallel::Comm;
use crate::utils::convergence::SolveStats;
use crate::utils::timing::{Phase, Stopwatch, Timings};
use num_traits::{Float, ToPrimitive};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Option prefix used unless [`ShellInverter::with_prefix`] overrides it.
pub const DEFAULT_PREFIX: &str = "invert_";

/// Tolerance conventionally passed to `verify`.
pub const DEFAULT_VERIFY_TOLERANCE: f64 = 1e-5;

/// Lifecycle of an inverter. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    SetUp,
    Destroyed,
}

/// State shared between the inverter and its shell operator.
pub(crate) struct ShellContext<F: Field> {
    mesh: Arc<Mesh>,
    adapter: RefCell<OperatorAdapter<F>>,
    timings: RefCell<Timings>,
}

impl<F: Field> ShellContext<F> {
    /// y = A x on the local slices.
    fn mult(&self, x: &[F::Scalar], y: &mut [F::Scalar]) -> Result<(), InvertError> {
        let watch = Stopwatch::start(Phase::Packing);
        let mut input = F::new(&self.mesh);
        vector_to_field(x, &mut input)?;
        watch.stop(&mut self.timings.borrow_mut());

        let output = self.adapter.borrow().apply(&input);
        if !same_mesh(output.mesh(), &self.mesh) {
            return Err(InvertError::ForeignOperatorResult);
        }

        let watch = Stopwatch::start(Phase::Packing);
        field_to_vector(&output, y)?;
        watch.stop(&mut self.timings.borrow_mut());
        Ok(())
    }
}

/// Multiply callback registered on the shell operator.
fn shell_mult<F: Field>(mat: &ShellMat<F::Scalar>, x: &[F::Scalar], y: &mut [F::Scalar]) -> Result<(), KError> {
    let ctx = mat.context::<ShellContext<F>>()?;
    ctx.mult(x, y).map_err(|e| KError::Callback(Box::new(e)))
}

/// Recover an error raised inside `shell_mult`; anything else is a failure of the solve call.
fn from_solve_error(err: KError) -> InvertError {
    match err {
        KError::Callback(inner) => match inner.downcast::<InvertError>() {
            Ok(err) => *err,
            Err(other) => InvertError::engine("KSPSolve", KError::Callback(other)),
        },
        other => InvertError::engine("KSPSolve", other),
    }
}

/// Invertible operator backed by the in-crate Krylov engine.
pub struct ShellInverter<F: Field> {
    mesh: Arc<Mesh>,
    shared: Rc<ShellContext<F>>,
    prefix: String,
    options: OptionsDatabase,
    state: SessionState,
    local_size: Option<usize>,
    shell: Option<Rc<ShellMat<F::Scalar>>>,
    ksp: Option<Ksp<F::Scalar>>,
    rhs: Option<SolverVec<F::Scalar>>,
    solution: Option<SolverVec<F::Scalar>>,
}

impl<F: Field> ShellInverter<F> {
    /// Identity operator on `mesh`, configured from `INVERTOP_OPTIONS` under the `invert_` prefix.
    pub fn new(mesh: &Arc<Mesh>) -> Self {
        Self {
            mesh: Arc::clone(mesh),
            shared: Rc::new(ShellContext {
                mesh: Arc::clone(mesh),
                adapter: RefCell::new(OperatorAdapter::identity()),
                timings: RefCell::new(Timings::default()),
            }),
            prefix: DEFAULT_PREFIX.to_string(),
            options: OptionsDatabase::from_env(),
            state: SessionState::Uninitialized,
            local_size: None,
            shell: None,
            ksp: None,
            rhs: None,
            solution: None,
        }
    }

    pub fn with_function(mut self, function: impl Fn(&F) -> F + 'static) -> Self {
        self.set_operator_function(function);
        self
    }

    /// Option prefix for this instance, e.g. `"lap_"` selects `-lap_ksp_type`.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Options read by `setup` in place of the environment.
    pub fn with_options(mut self, options: OptionsDatabase) -> Self {
        self.options = options;
        self
    }

    /// Build the shell operator and solver. Returns the local problem size.
    ///
    /// Fails with `SetupReentry` if already set up. An engine failure leaves the inverter
    /// uninitialized.
    pub fn setup(&mut self) -> Result<usize, InvertError> {
        match self.state {
            SessionState::SetUp => return Err(InvertError::SetupReentry),
            SessionState::Destroyed => return Err(InvertError::UseAfterDestroy),
            SessionState::Uninitialized => {}
        }
        let watch = Stopwatch::start(Phase::Setup);

        let n = local_size::<F>(&self.mesh);
        let comm = Arc::clone(self.mesh.comm());
        let ctx: Rc<dyn Any> = Rc::clone(&self.shared) as Rc<dyn Any>;

        let mut shell = ShellMat::create(Arc::clone(&comm), n, n, None, ctx)
            .map_err(|e| InvertError::engine("MatCreateShell", e))?;
        let (solution, rhs) = shell.create_vecs().map_err(|e| InvertError::engine("MatCreateVecs", e))?;
        shell
            .set_mult(shell_mult::<F>)
            .map_err(|e| InvertError::engine("MatShellSetOperation", e))?;
        let shell = Rc::new(shell);

        let mut ksp = Ksp::create(comm).map_err(|e| InvertError::engine("KSPCreate", e))?;
        ksp.set_operators(Rc::clone(&shell))
            .map_err(|e| InvertError::engine("KSPSetOperators", e))?;
        ksp.set_options_prefix(&self.prefix)
            .map_err(|e| InvertError::engine("KSPSetOptionsPrefix", e))?;
        ksp.set_from_options(&self.options)
            .map_err(|e| InvertError::engine("KSPSetFromOptions", e))?;
        ksp.set_up().map_err(|e| InvertError::engine("KSPSetUp", e))?;

        log::debug!(
            "invertible operator {}: set up {} local / {} global entries, KSP type {}",
            self.prefix,
            n,
            shell.global_size().0,
            ksp.options().kind.name()
        );
        self.shell = Some(shell);
        self.ksp = Some(ksp);
        self.rhs = Some(rhs);
        self.solution = Some(solution);
        self.local_size = Some(n);
        self.state = SessionState::SetUp;
        watch.stop(&mut self.shared.timings.borrow_mut());
        Ok(n)
    }

    fn ensure_ready(&self, field: &F) -> Result<(), InvertError> {
        match self.state {
            SessionState::Uninitialized => return Err(InvertError::UseBeforeSetup),
            SessionState::Destroyed => return Err(InvertError::UseAfterDestroy),
            SessionState::SetUp => {}
        }
        if !same_mesh(field.mesh(), &self.mesh) {
            return Err(InvertError::MeshMismatch);
        }
        Ok(())
    }

    /// Solve `A x = rhs` and return `x` as a new field on this inverter's mesh.
    ///
    /// A non-positive converged reason is returned as `ConvergenceFailure`; there is no retry.
    pub fn invert(&mut self, rhs: &F) -> Result<F, InvertError> {
        self.ensure_ready(rhs)?;
        let watch = Stopwatch::start(Phase::Invert);
        let result = self.solve(rhs);
        watch.stop(&mut self.shared.timings.borrow_mut());
        result
    }

    fn solve(&mut self, rhs: &F) -> Result<F, InvertError> {
        let (Some(ksp), Some(b), Some(x)) = (self.ksp.as_mut(), self.rhs.as_mut(), self.solution.as_mut()) else {
            return Err(InvertError::UseBeforeSetup);
        };

        let watch = Stopwatch::start(Phase::Packing);
        field_to_vector(rhs, b.as_mut_slice())?;
        watch.stop(&mut self.shared.timings.borrow_mut());

        let reason = ksp.solve(b, x).map_err(from_solve_error)?;
        if !reason.is_converged() {
            return Err(InvertError::ConvergenceFailure { reason: reason.code() });
        }

        let watch = Stopwatch::start(Phase::Packing);
        let mut out = F::new(&self.mesh);
        vector_to_field(x.as_slice(), &mut out)?;
        watch.stop(&mut self.shared.timings.borrow_mut());
        Ok(out)
    }

    /// Invert `rhs`, apply the operator to the result and check that it reproduces `rhs`.
    ///
    /// The comparison is the maximum absolute difference over the whole partition. Only
    /// `A(A⁻¹ rhs) ≈ rhs` is checked.
    pub fn verify(&mut self, rhs: &F, tolerance: f64) -> Result<bool, InvertError> {
        let result = self.invert(rhs)?;
        let applied = self.apply(&result);
        if !same_mesh(applied.mesh(), &self.mesh) {
            return Err(InvertError::ForeignOperatorResult);
        }
        if !applied.is_allocated() {
            return Err(InvertError::Unallocated);
        }
        let comm = self.mesh.comm();
        let diff = comm.all_reduce_max(max_abs(&applied, Some(rhs)));
        let passed = diff < tolerance;
        if !passed {
            log::warn!(
                "invertible operator {}: verify failed, max |A(x) - b| = {:e} (tolerance {:e}); \
                 max |b| = {:e}, max |A(x)| = {:e}, max |x| = {:e}",
                self.prefix,
                diff,
                tolerance,
                comm.all_reduce_max(max_abs(rhs, None)),
                comm.all_reduce_max(max_abs(&applied, None)),
                comm.all_reduce_max(max_abs(&result, None)),
            );
        }
        Ok(passed)
    }

    /// Apply the current operator function.
    pub fn apply(&self, input: &F) -> F {
        self.shared.adapter.borrow().apply(input)
    }

    /// Replace the operator function. A set-up shell operator calls the new function on its
    /// next multiply.
    pub fn set_operator_function(&mut self, function: impl Fn(&F) -> F + 'static) {
        self.shared.adapter.borrow_mut().set_function(function);
    }

    /// Accumulated times since the last call; the counters are reset.
    pub fn report_time(&mut self) -> Timings {
        let timings = self.shared.timings.borrow_mut().take();
        log::info!("invertible operator {}: {}", self.prefix, timings);
        timings
    }

    /// Release the solver, shell operator and vectors. Safe to call in any state, and repeatedly.
    pub fn destroy(&mut self) {
        if self.state == SessionState::Destroyed {
            return;
        }
        if let Some(ksp) = self.ksp.take() {
            log::debug!("invertible operator {}: releasing\n{}", self.prefix, ksp.view());
        }
        self.shell = None;
        self.rhs = None;
        self.solution = None;
        self.state = SessionState::Destroyed;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn options_prefix(&self) -> &str {
        &self.prefix
    }

    /// Local problem size fixed by `setup`.
    pub fn local_size(&self) -> Option<usize> {
        self.local_size
    }

    /// Statistics of the most recent solve.
    pub fn last_solve(&self) -> Option<&SolveStats<F::Scalar>> {
        self.ksp.as_ref().and_then(Ksp::last_solve)
    }
}

impl<F: Field> Drop for ShellInverter<F> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<F: Field> std::fmt::Debug for ShellInverter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellInverter")
            .field("prefix", &self.prefix)
            .field("state", &self.state)
            .field("local_size", &self.local_size)
            .field("shell", &self.shell)
            .finish_non_exhaustive()
    }
}

/// Local max of `|a|`, or of `|a - b|` when `b` is given. NaN if any entry is NaN.
fn max_abs<F: Field>(a: &F, b: Option<&F>) -> f64 {
    a.indices()
        .map(|idx| {
            let v = match b {
                Some(b) => a.get(idx) - b.get(idx),
                None => a.get(idx),
            };
            v.abs().to_f64().unwrap_or(f64::NAN)
        })
        .fold(0.0, |acc: f64, v| if acc.is_nan() || v.is_nan() { f64::NAN } else { acc.max(v) })
}

impl<F: Field> Invertible<F> for ShellInverter<F> {
    fn setup(&mut self) -> Result<usize, InvertError> {
        ShellInverter::setup(self)
    }

    fn invert(&mut self, rhs: &F) -> Result<F, InvertError> {
        ShellInverter::invert(self, rhs)
    }

    fn verify(&mut self, rhs: &F, tolerance: f64) -> Result<bool, InvertError> {
        ShellInverter::verify(self, rhs, tolerance)
    }

    fn apply(&self, input: &F) -> F {
        ShellInverter::apply(self, input)
    }

    fn set_operator_function(&mut self, function: OperatorFn<F>) {
        ShellInverter::set_operator_function(self, function)
    }

    fn report_time(&mut self) -> Timings {
        ShellInverter::report_time(self)
    }

    fn destroy(&mut self) {
        ShellInverter::destroy(self)
    }

    fn mesh(&self) -> &Arc<Mesh> {
        ShellInverter::mesh(self)
    }
}
