//! Two-dimensional (x, y) field, constant in z.

use super::{Field, Mesh, Real};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Field2D<T = f64> {
    mesh: Arc<Mesh>,
    data: Option<Vec<T>>,
}

impl<T: Real> Field2D<T> {
    fn offset(&self, (x, y): (usize, usize)) -> usize {
        let (nx, ny) = (self.mesh.nx(), self.mesh.ny());
        assert!(x < nx && y < ny, "index ({x}, {y}) outside local extents ({nx}, {ny})");
        x * ny + y
    }

    pub fn as_slice(&self) -> Option<&[T]> {
        self.data.as_deref()
    }
}

impl<T: Real> Field for Field2D<T> {
    type Scalar = T;
    type Index = (usize, usize);

    fn new(mesh: &Arc<Mesh>) -> Self {
        Self { mesh: Arc::clone(mesh), data: None }
    }

    fn allocate(&mut self) {
        if self.data.is_none() {
            self.data = Some(vec![T::zero(); self.mesh.nx() * self.mesh.ny()]);
        }
    }

    fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    fn indices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (nx, ny) = (self.mesh.nx(), self.mesh.ny());
        (0..nx).flat_map(move |x| (0..ny).map(move |y| (x, y)))
    }

    fn get(&self, index: (usize, usize)) -> T {
        let i = self.offset(index);
        match &self.data {
            Some(data) => data[i],
            None => panic!("Field2D read before allocation"),
        }
    }

    fn set(&mut self, index: (usize, usize), value: T) {
        let i = self.offset(index);
        match &mut self.data {
            Some(data) => data[i] = value,
            None => panic!("Field2D written before allocation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_z_extent() {
        let mesh = Mesh::serial(3, 4, 16);
        let f = Field2D::<f64>::from_fn(&mesh, |(x, y)| (x + y) as f64);
        assert_eq!(f.local_count(), 12);
        assert_eq!(f.get((2, 3)), 5.0);
        assert_eq!(f.indices().nth(4), Some((1, 0)));
    }
}
