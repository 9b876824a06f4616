//! Field on an x-z plane at a single y index.

use super::{Field, Mesh, Real};
use std::sync::Arc;

/// Values on the local (x, z) points of the plane `y = y_index`.
#[derive(Clone, Debug)]
pub struct FieldPerp<T = f64> {
    mesh: Arc<Mesh>,
    y_index: usize,
    data: Option<Vec<T>>,
}

impl<T: Real> FieldPerp<T> {
    /// Move the plane to `y_index`. The values are kept.
    pub fn with_y_index(mut self, y_index: usize) -> Self {
        self.y_index = y_index;
        self
    }

    pub fn y_index(&self) -> usize {
        self.y_index
    }

    fn offset(&self, (x, z): (usize, usize)) -> usize {
        let (nx, nz) = (self.mesh.nx(), self.mesh.nz());
        assert!(x < nx && z < nz, "index ({x}, {z}) outside local extents ({nx}, {nz})");
        x * nz + z
    }
}

impl<T: Real> Field for FieldPerp<T> {
    type Scalar = T;
    type Index = (usize, usize);

    fn new(mesh: &Arc<Mesh>) -> Self {
        Self { mesh: Arc::clone(mesh), y_index: 0, data: None }
    }

    fn allocate(&mut self) {
        if self.data.is_none() {
            self.data = Some(vec![T::zero(); self.mesh.nx() * self.mesh.nz()]);
        }
    }

    fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    fn indices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (nx, nz) = (self.mesh.nx(), self.mesh.nz());
        (0..nx).flat_map(move |x| (0..nz).map(move |z| (x, z)))
    }

    fn get(&self, index: (usize, usize)) -> T {
        let i = self.offset(index);
        match &self.data {
            Some(data) => data[i],
            None => panic!("FieldPerp read before allocation"),
        }
    }

    fn set(&mut self, index: (usize, usize), value: T) {
        let i = self.offset(index);
        match &mut self.data {
            Some(data) => data[i] = value,
            None => panic!("FieldPerp written before allocation"),
        }
    }
}
