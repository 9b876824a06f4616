//! Partition of a structured grid onto processes.

use crate::error::KError;
use crate::parallel::{Comm, UniverseComm};
use std::sync::Arc;

/// Local slice of a structured grid, decomposed in x only.
///
/// Fields compare partitions by pointer identity of the `Arc<Mesh>` they were created on, so two
/// meshes with equal extents are still different partitions.
#[derive(Debug)]
pub struct Mesh {
    nx: usize,
    ny: usize,
    nz: usize,
    global_nx: usize,
    x_offset: usize,
    comm: Arc<UniverseComm>,
}

impl Mesh {
    /// Whole grid on a single process.
    pub fn serial(nx: usize, ny: usize, nz: usize) -> Arc<Mesh> {
        Arc::new(Mesh { nx, ny, nz, global_nx: nx, x_offset: 0, comm: Arc::new(UniverseComm::serial()) })
    }

    /// Local slice `x_offset .. x_offset + nx` of a grid `global_nx` points wide in x.
    ///
    /// Collective: checks that the local x extents sum to `global_nx` over `comm`.
    pub fn partitioned(
        comm: Arc<UniverseComm>,
        nx: usize,
        ny: usize,
        nz: usize,
        x_offset: usize,
        global_nx: usize,
    ) -> Result<Arc<Mesh>, KError> {
        if x_offset + nx > global_nx {
            return Err(KError::InvalidArgument(format!(
                "local x range {x_offset}..{} exceeds global nx {global_nx}",
                x_offset + nx
            )));
        }
        let summed = comm.all_reduce_sum(nx as f64) as usize;
        if summed != global_nx {
            return Err(KError::SizeMismatch { expected: global_nx, found: summed });
        }
        Ok(Arc::new(Mesh { nx, ny, nz, global_nx, x_offset, comm }))
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn nz(&self) -> usize {
        self.nz
    }

    pub fn global_nx(&self) -> usize {
        self.global_nx
    }

    /// Global x index of local x = 0.
    pub fn x_offset(&self) -> usize {
        self.x_offset
    }

    pub fn comm(&self) -> &Arc<UniverseComm> {
        &self.comm
    }
}

/// True when `a` and `b` are the same partition.
pub fn same_mesh(a: &Arc<Mesh>, b: &Arc<Mesh>) -> bool {
    Arc::ptr_eq(a, b)
}
