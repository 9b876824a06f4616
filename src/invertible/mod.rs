//! Matrix-free invertible operators.
//!
//! An operator is any function `Fn(&F) -> F` on a [`Field`] kind. Wrapping it in an
//! [`Invertible`] lets callers solve `A x = b` for `x` without ever forming `A`: the Krylov
//! engine sees a shell matrix whose multiply packs and unpacks fields around the function.
//!
//! ```ignore
//! let mesh = Mesh::serial(8, 1, 1);
//! let mut op = invertible_operator::<Field3D>(&mesh, Box::new(laplacian), OptionsDatabase::from_env());
//! op.setup()?;
//! let x = op.invert(&b)?;
//! ```
//!
//! Builds without the `ksp` feature get [`UnsupportedInverter`] from [`invertible_operator`];
//! branch on [`supports_inversion`] rather than on the concrete type.

pub mod adapter;
pub mod marshal;
#[cfg(feature = "ksp")]
pub mod session;
pub mod unsupported;

pub use adapter::{OperatorAdapter, OperatorFn};
pub use marshal::{field_to_vector, local_size, vector_to_field};
#[cfg(feature = "ksp")]
pub use session::{DEFAULT_PREFIX, DEFAULT_VERIFY_TOLERANCE, SessionState, ShellInverter};
pub use unsupported::UnsupportedInverter;

use crate::config::OptionsDatabase;
use crate::error::InvertError;
use crate::field::{Field, Mesh};
use crate::utils::timing::Timings;
use std::sync::Arc;

/// A linear operator that can be applied and, once set up, inverted.
pub trait Invertible<F: Field> {
    /// Prepare the solver. Returns the local problem size.
    fn setup(&mut self) -> Result<usize, InvertError>;
    /// Solve `A x = rhs`.
    fn invert(&mut self, rhs: &F) -> Result<F, InvertError>;
    /// Whether `A(A⁻¹ rhs)` reproduces `rhs` to within `tolerance` everywhere.
    fn verify(&mut self, rhs: &F, tolerance: f64) -> Result<bool, InvertError>;
    fn apply(&self, input: &F) -> F;
    fn set_operator_function(&mut self, function: OperatorFn<F>);
    /// Accumulated timings since the last call, then reset.
    fn report_time(&mut self) -> Timings;
    fn destroy(&mut self);
    fn mesh(&self) -> &Arc<Mesh>;
}

/// True when this build can invert operators.
pub const fn supports_inversion() -> bool {
    cfg!(feature = "ksp")
}

/// Invertible wrapper around `function` on `mesh`, solver-backed when the build supports it.
pub fn invertible_operator<F: Field>(
    mesh: &Arc<Mesh>,
    function: OperatorFn<F>,
    options: OptionsDatabase,
) -> Box<dyn Invertible<F>> {
    #[cfg(feature = "ksp")]
    {
        Box::new(ShellInverter::new(mesh).with_function(function).with_options(options))
    }
    #[cfg(not(feature = "ksp"))]
    {
        let _ = options;
        Box::new(UnsupportedInverter::new(mesh).with_function(function))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field3D;

    #[test]
    fn factory_matches_capability() {
        let mesh = Mesh::serial(3, 1, 1);
        let mut op = invertible_operator::<Field3D<f64>>(&mesh, Box::new(|f: &Field3D<f64>| f.clone()), OptionsDatabase::new());
        let b = Field3D::<f64>::from_fn(&mesh, |(x, _, _)| x as f64 + 1.0);
        if supports_inversion() {
            assert_eq!(op.setup().unwrap(), 3);
            let x = op.invert(&b).unwrap();
            for idx in b.indices() {
                assert!((x.get(idx) - b.get(idx)).abs() < 1e-10);
            }
        } else {
            assert!(matches!(op.setup(), Err(InvertError::Unsupported(_))));
        }
        assert!(Arc::ptr_eq(op.mesh(), &mesh));
    }
}
