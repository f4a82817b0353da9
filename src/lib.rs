//! Tribvh - batched BVH spatial queries and tetrahedral ray marching
//!
//! Builds a linear BVH per triangle mesh (Morton-sorted radix tree) and runs
//! nearest-surface-point and ray-nearest-hit queries over it in parallel, one
//! worker per query. A separate walker marches rays through tetrahedral
//! meshes via face adjacency, emitting uniform-step samples.

pub mod core;
pub mod math;
pub mod mesh;
pub mod bvh;
pub mod query;
pub mod march;
