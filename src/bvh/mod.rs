//! Linear BVH: Morton-sorted radix-tree construction and parallel traversal

pub mod node;
pub mod builder;
pub mod traverse;

pub use node::{Bvh, InternalNode, LeafNode, NO_PARENT};
pub use traverse::{PointResult, RayResult};
