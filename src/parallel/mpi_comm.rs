//! MPI-based parallel communication module.
//!
//! This module provides an implementation of the `Comm` trait using the MPI (Message Passing Interface)
//! backend for distributed-memory parallelism. It is only available when the `mpi` feature is enabled.
//!
//! # Usage
//!
//! - The caller initializes MPI and keeps the returned `Universe` alive for the whole run.
//! - `MpiComm` wraps the world communicator and is placed inside
//!   [`UniverseComm::Mpi`](super::UniverseComm) when building a mesh.
//!
//! # Example
//! ```ignore
//! #[cfg(feature = "mpi")]
//! {
//!     let universe = mpi::initialize().unwrap();
//!     let comm = invertop::parallel::MpiComm::new(universe.world());
//!     comm.barrier();
//! }
//! ```

use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

/// MPI communicator wrapper for distributed parallelism.
pub struct MpiComm {
    /// The MPI communicator shared by all processes of the partition.
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
}

impl MpiComm {
    /// Wraps an already-initialized communicator.
    pub fn new(world: SimpleCommunicator) -> Self {
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        MpiComm { world, rank, size }
    }
}

impl super::Comm for MpiComm {
    fn rank(&self) -> usize { self.rank }
    fn size(&self) -> usize { self.size }
    fn barrier(&self) { self.world.barrier(); }

    fn all_reduce_sum(&self, x: f64) -> f64 {
        use mpi::collective::SystemOperation;
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::sum());
        y
    }

    fn all_reduce_max(&self, x: f64) -> f64 {
        use mpi::collective::SystemOperation;
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::max());
        y
    }
}
