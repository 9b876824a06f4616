//! Core traits, vector handle and inner-product wrappers.

pub mod traits;
pub mod vector;
pub mod wrappers;

pub use traits::{Indexing, InnerProduct, MatVec};
pub use vector::SolverVec;
pub use wrappers::DistributedInnerProduct;
