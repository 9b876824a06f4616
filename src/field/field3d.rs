//! Three-dimensional field.

use super::{Field, Mesh, Real};
use std::sync::Arc;

/// Values on every local (x, y, z) point of a mesh.
#[derive(Clone, Debug)]
pub struct Field3D<T = f64> {
    mesh: Arc<Mesh>,
    data: Option<Vec<T>>,
}

impl<T: Real> Field3D<T> {
    fn offset(&self, (x, y, z): (usize, usize, usize)) -> usize {
        let (nx, ny, nz) = (self.mesh.nx(), self.mesh.ny(), self.mesh.nz());
        assert!(x < nx && y < ny && z < nz, "index ({x}, {y}, {z}) outside local extents ({nx}, {ny}, {nz})");
        (x * ny + y) * nz + z
    }

    /// Local values in iteration order; `None` if unallocated.
    pub fn as_slice(&self) -> Option<&[T]> {
        self.data.as_deref()
    }

    /// Allocate if needed and set every entry to `value`.
    pub fn fill(&mut self, value: T) {
        self.allocate();
        if let Some(data) = self.data.as_mut() {
            data.iter_mut().for_each(|v| *v = value);
        }
    }
}

impl<T: Real> Field for Field3D<T> {
    type Scalar = T;
    type Index = (usize, usize, usize);

    fn new(mesh: &Arc<Mesh>) -> Self {
        Self { mesh: Arc::clone(mesh), data: None }
    }

    fn allocate(&mut self) {
        if self.data.is_none() {
            let n = self.mesh.nx() * self.mesh.ny() * self.mesh.nz();
            self.data = Some(vec![T::zero(); n]);
        }
    }

    fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    fn indices(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        let (nx, ny, nz) = (self.mesh.nx(), self.mesh.ny(), self.mesh.nz());
        (0..nx).flat_map(move |x| (0..ny).flat_map(move |y| (0..nz).map(move |z| (x, y, z))))
    }

    fn get(&self, index: (usize, usize, usize)) -> T {
        let i = self.offset(index);
        match &self.data {
            Some(data) => data[i],
            None => panic!("Field3D read before allocation"),
        }
    }

    fn set(&mut self, index: (usize, usize, usize), value: T) {
        let i = self.offset(index);
        match &mut self.data {
            Some(data) => data[i] = value,
            None => panic!("Field3D written before allocation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_is_x_major() {
        let mesh = Mesh::serial(2, 2, 2);
        let f = Field3D::<f64>::new(&mesh);
        let order: Vec<_> = f.indices().collect();
        assert_eq!(order[0], (0, 0, 0));
        assert_eq!(order[1], (0, 0, 1));
        assert_eq!(order[2], (0, 1, 0));
        assert_eq!(order[4], (1, 0, 0));
        assert_eq!(f.local_count(), 8);
    }

    #[test]
    fn storage_follows_iteration_order() {
        let mesh = Mesh::serial(3, 2, 2);
        let f = Field3D::<f64>::from_fn(&mesh, |(x, y, z)| (100 * x + 10 * y + z) as f64);
        let flat = f.as_slice().unwrap();
        for (k, idx) in f.indices().enumerate() {
            assert_eq!(flat[k], f.get(idx));
        }
    }

    #[test]
    fn new_field_is_unallocated() {
        let mesh = Mesh::serial(2, 1, 1);
        let mut f = Field3D::<f64>::new(&mesh);
        assert!(!f.is_allocated());
        f.fill(1.5);
        assert!(f.is_allocated());
        assert_eq!(f.get((1, 0, 0)), 1.5);
    }
}
