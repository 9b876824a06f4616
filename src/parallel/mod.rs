//! Process-level communication.
//!
//! One process owns one slice of a partitioned problem. Every reduction here is a collective
//! operation: all processes of the communicator must call it, in the same order.

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);
    /// Sum of `x` over all processes.
    fn all_reduce_sum(&self, x: f64) -> f64;
    /// Maximum of `x` over all processes.
    fn all_reduce_max(&self, x: f64) -> f64;
}

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

/// The communicator a mesh and its solvers run on.
pub enum UniverseComm {
    /// A single process; every reduction is the identity.
    Serial,
    #[cfg(feature = "mpi")]
    Mpi(MpiComm),
}

impl UniverseComm {
    pub fn serial() -> Self {
        UniverseComm::Serial
    }
}

impl std::fmt::Debug for UniverseComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniverseComm::Serial => write!(f, "Serial"),
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => write!(f, "Mpi(rank {} of {})", comm.rank, comm.size),
        }
    }
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            UniverseComm::Serial => 0,
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
        }
    }
    fn size(&self) -> usize {
        match self {
            UniverseComm::Serial => 1,
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
        }
    }
    fn barrier(&self) {
        match self {
            UniverseComm::Serial => {}
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.barrier(),
        }
    }
    fn all_reduce_sum(&self, x: f64) -> f64 {
        match self {
            UniverseComm::Serial => x,
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_sum(x),
        }
    }
    fn all_reduce_max(&self, x: f64) -> f64 {
        match self {
            UniverseComm::Serial => x,
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_max(x),
        }
    }
}
