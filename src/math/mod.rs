//! Mathematical primitives for spatial queries

pub mod aabb;
pub mod ray;
pub mod morton;
pub mod triangle;
pub mod tetra;

pub use aabb::Aabb;
pub use ray::Ray;
pub use triangle::{Triangle, SurfacePoint, TriangleHit};
pub use tetra::Tetrahedron;
