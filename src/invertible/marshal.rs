//! Field ⇄ flat vector conversion.
//!
//! Both directions walk [`Field::indices`], so entry `k` of the vector is always the `k`-th index
//! of the field's iteration. The mapping is a relabelling only and is exact.

use crate::error::InvertError;
use crate::field::{Field, Mesh};
use std::sync::Arc;

/// Number of local entries of an `F` on `mesh`, counted on a freshly allocated field.
pub fn local_size<F: Field>(mesh: &Arc<Mesh>) -> usize {
    let mut probe = F::new(mesh);
    probe.allocate();
    probe.local_count()
}

/// Copy the local entries of `field` into `buffer`.
pub fn field_to_vector<F: Field>(field: &F, buffer: &mut [F::Scalar]) -> Result<(), InvertError> {
    if !field.is_allocated() {
        return Err(InvertError::Unallocated);
    }
    let count = field.local_count();
    if count != buffer.len() {
        return Err(InvertError::LocalSizeMismatch { expected: buffer.len(), found: count });
    }
    for (slot, index) in buffer.iter_mut().zip(field.indices()) {
        *slot = field.get(index);
    }
    Ok(())
}

/// Copy `buffer` into the local entries of `field`, allocating it if needed.
pub fn vector_to_field<F: Field>(buffer: &[F::Scalar], field: &mut F) -> Result<(), InvertError> {
    let indices: Vec<F::Index> = field.indices().collect();
    if indices.len() != buffer.len() {
        return Err(InvertError::LocalSizeMismatch { expected: buffer.len(), found: indices.len() });
    }
    field.allocate();
    for (index, &value) in indices.into_iter().zip(buffer) {
        field.set(index, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field2D, Field3D};

    #[test]
    fn size_counts_local_entries() {
        let mesh = Mesh::serial(4, 3, 2);
        assert_eq!(local_size::<Field3D>(&mesh), 24);
        assert_eq!(local_size::<Field2D>(&mesh), 12);
    }

    #[test]
    fn vector_order_is_iteration_order() {
        let mesh = Mesh::serial(2, 2, 1);
        let f = Field3D::<f64>::from_fn(&mesh, |(x, y, _)| (10 * x + y) as f64);
        let mut buf = vec![0.0; 4];
        field_to_vector(&f, &mut buf).unwrap();
        assert_eq!(buf, vec![0.0, 1.0, 10.0, 11.0]);
    }

    #[test]
    fn length_and_allocation_are_checked() {
        let mesh = Mesh::serial(2, 2, 1);
        let unallocated = Field3D::<f64>::new(&mesh);
        assert!(matches!(field_to_vector(&unallocated, &mut [0.0; 4]), Err(InvertError::Unallocated)));

        let f = Field3D::<f64>::from_fn(&mesh, |_| 1.0);
        assert!(matches!(
            field_to_vector(&f, &mut [0.0; 3]),
            Err(InvertError::LocalSizeMismatch { expected: 3, found: 4 })
        ));
        let mut g = Field3D::<f64>::new(&mesh);
        assert!(vector_to_field(&[1.0; 5], &mut g).is_err());
        assert!(!g.is_allocated());
    }
}
