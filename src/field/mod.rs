//! Distributed structured-grid fields.
//!
//! The invertible-operator layer only needs a field to be bound to a [`Mesh`], to be allocatable,
//! and to enumerate its local entries in a fixed order. [`Field`] captures exactly that, so any
//! field kind implementing it can be inverted. `Field3D`, `Field2D` and `FieldPerp` are the
//! provided kinds; all iterate x-major (x outermost, then y, then z). Values are `f64` (see [`Real`]).
//!
//! Guard cells and halo exchange are not modelled here. An operator function that needs
//! neighbouring values from other processes must exchange them itself.

pub mod field2d;
pub mod field3d;
pub mod field_perp;
pub mod mesh;

pub use field2d::Field2D;
pub use field3d::Field3D;
pub use field_perp::FieldPerp;
pub use mesh::{Mesh, same_mesh};

use num_traits::{Float, FromPrimitive, ToPrimitive};
use std::fmt::Debug;
use std::sync::Arc;

/// Scalar types a field can hold and the Krylov engine can solve for.
///
/// The engine converts its `f64` tolerances with `From<f64>`, which `f32` does not implement.
/// In practice the scalar is `f64`.
pub trait Real: Float + FromPrimitive + ToPrimitive + From<f64> + Send + Sync + Debug + 'static {}

impl<T> Real for T where T: Float + FromPrimitive + ToPrimitive + From<f64> + Send + Sync + Debug + 'static {}

/// Capability required of a field kind by the invertible-operator layer.
pub trait Field: Clone + 'static {
    type Scalar: Real;
    /// Position of one local entry.
    type Index: Copy + Debug;

    /// Unallocated field bound to `mesh`.
    fn new(mesh: &Arc<Mesh>) -> Self;

    /// Allocate zeroed storage. Does nothing if already allocated.
    fn allocate(&mut self);

    fn is_allocated(&self) -> bool;

    /// The partition this field is bound to.
    fn mesh(&self) -> &Arc<Mesh>;

    /// Every local index, in the same order on every call.
    fn indices(&self) -> impl Iterator<Item = Self::Index> + '_;

    /// # Panics
    /// If the field is unallocated or `index` is outside the local extents.
    fn get(&self, index: Self::Index) -> Self::Scalar;

    /// # Panics
    /// If the field is unallocated or `index` is outside the local extents.
    fn set(&mut self, index: Self::Index, value: Self::Scalar);

    /// Allocated field with every entry set to `f(index)`.
    fn from_fn(mesh: &Arc<Mesh>, mut f: impl FnMut(Self::Index) -> Self::Scalar) -> Self {
        let mut field = Self::new(mesh);
        field.allocate();
        let indices: Vec<Self::Index> = field.indices().collect();
        for index in indices {
            field.set(index, f(index));
        }
        field
    }

    /// Number of local entries.
    fn local_count(&self) -> usize {
        self.indices().count()
    }
}
